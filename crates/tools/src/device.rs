//! Tools that act on the user's device through a [`DeviceBridge`].

use std::sync::Arc;

use {
    async_trait::async_trait,
    serde::Serialize,
    serde_json::{Value, json},
    tracing::info,
};

use crate::{
    approval::InteractionBroker,
    error::{Error, Result},
    params::{optional_str, required_str},
    registry::{AgentTool, ParamKind, ParamSpec, ToolGroup},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Calendar,
    Share,
    Notifications,
}

impl Capability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Share => "share",
            Self::Notifications => "notifications",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Host integration for calendar, share sheet and notifications.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Whether the host has granted access to `capability`.
    fn permitted(&self, capability: Capability) -> bool;

    /// Returns the id the host assigned to the new event.
    async fn add_calendar_event(&self, event: &CalendarEvent) -> tollgate_common::Result<String>;

    async fn share_text(&self, text: &str) -> tollgate_common::Result<()>;

    async fn notify(&self, title: &str, body: &str) -> tollgate_common::Result<()>;
}

/// Bridge for hosts without a device: every capability is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessBridge;

#[async_trait]
impl DeviceBridge for HeadlessBridge {
    fn permitted(&self, _capability: Capability) -> bool {
        false
    }

    async fn add_calendar_event(&self, _event: &CalendarEvent) -> tollgate_common::Result<String> {
        Err(tollgate_common::Error::Unavailable("calendar"))
    }

    async fn share_text(&self, _text: &str) -> tollgate_common::Result<()> {
        Err(tollgate_common::Error::Unavailable("share sheet"))
    }

    async fn notify(&self, _title: &str, _body: &str) -> tollgate_common::Result<()> {
        Err(tollgate_common::Error::Unavailable("notifications"))
    }
}

fn require(bridge: &dyn DeviceBridge, capability: Capability) -> Result<()> {
    if bridge.permitted(capability) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "{} access has not been granted",
            capability.as_str()
        )))
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
        && (b.len() == 10 || b[10] == b'T' || b[10] == b' ')
}

pub struct CalendarAddEventTool {
    bridge: Arc<dyn DeviceBridge>,
    broker: Arc<InteractionBroker>,
}

impl CalendarAddEventTool {
    pub fn new(bridge: Arc<dyn DeviceBridge>, broker: Arc<InteractionBroker>) -> Self {
        Self { bridge, broker }
    }
}

#[async_trait]
impl AgentTool for CalendarAddEventTool {
    fn name(&self) -> &str {
        "calendar_add_event"
    }

    fn description(&self) -> &str {
        "Add an event to the user's calendar after they confirm it."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Calendar
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("title", ParamKind::String, "Event title"),
            ParamSpec::required("start", ParamKind::String, "Start time, ISO 8601"),
            ParamSpec::optional("end", ParamKind::String, "End time, ISO 8601"),
        ]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let title = required_str(&params, "title")?.trim().to_string();
        let start = required_str(&params, "start")?.trim().to_string();
        let end = optional_str(&params, "end")?.map(|s| s.trim().to_string());
        if !is_iso_date(&start) {
            return Err(Error::invalid_arguments("'start' must be an ISO 8601 date or time"));
        }
        if let Some(end) = &end {
            if !is_iso_date(end) {
                return Err(Error::invalid_arguments("'end' must be an ISO 8601 date or time"));
            }
            if end.as_str() < start.as_str() {
                return Err(Error::invalid_arguments("'end' is before 'start'"));
            }
        }

        require(self.bridge.as_ref(), Capability::Calendar)?;
        let summary = format!("Add \"{title}\" to your calendar at {start}");
        if !self
            .broker
            .request_approval(self.name(), &summary)
            .await
            .is_approved()
        {
            return Err(Error::UserDenied(format!("adding event \"{title}\"")));
        }

        let event = CalendarEvent { title, start, end };
        let id = self.bridge.add_calendar_event(&event).await?;
        info!(event_id = %id, "calendar event added");
        Ok(json!({ "event_id": id, "event": event }))
    }
}

pub struct ShareTextTool {
    bridge: Arc<dyn DeviceBridge>,
    broker: Arc<InteractionBroker>,
}

impl ShareTextTool {
    pub fn new(bridge: Arc<dyn DeviceBridge>, broker: Arc<InteractionBroker>) -> Self {
        Self { bridge, broker }
    }
}

#[async_trait]
impl AgentTool for ShareTextTool {
    fn name(&self) -> &str {
        "share_text"
    }

    fn description(&self) -> &str {
        "Open the share sheet with the given text after the user confirms."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Notifications
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("text", ParamKind::String, "Text to share")]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let text = required_str(&params, "text")?;
        require(self.bridge.as_ref(), Capability::Share)?;
        let preview: String = text.chars().take(80).collect();
        if !self
            .broker
            .request_approval(self.name(), &format!("Share: {preview}"))
            .await
            .is_approved()
        {
            return Err(Error::UserDenied("sharing text".into()));
        }
        self.bridge.share_text(text).await?;
        Ok(json!({ "shared": true, "chars": text.chars().count() }))
    }
}

pub struct NotifyTool {
    bridge: Arc<dyn DeviceBridge>,
    enabled: bool,
}

impl NotifyTool {
    pub fn new(bridge: Arc<dyn DeviceBridge>, enabled: bool) -> Self {
        Self { bridge, enabled }
    }
}

#[async_trait]
impl AgentTool for NotifyTool {
    fn name(&self) -> &str {
        "notify"
    }

    fn description(&self) -> &str {
        "Show a local notification to the user."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Notifications
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("title", ParamKind::String, "Notification title"),
            ParamSpec::required("body", ParamKind::String, "Notification text"),
        ]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        if !self.enabled {
            return Err(Error::Disabled("notifications are turned off".into()));
        }
        let title = required_str(&params, "title")?;
        let body = required_str(&params, "body")?;
        require(self.bridge.as_ref(), Capability::Notifications)?;
        self.bridge.notify(title, body).await?;
        Ok(json!({ "delivered": true }))
    }
}
