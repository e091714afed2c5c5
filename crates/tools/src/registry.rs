use std::sync::Arc;

use {
    async_trait::async_trait,
    serde::Serialize,
    serde_json::{Map, Value, json},
};

use crate::error::Result;

/// Presentation grouping for the catalog. Has no effect on dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroup {
    Memory,
    Session,
    Browsing,
    PublicData,
    Calendar,
    Notifications,
    Device,
    Mcp,
}

impl ToolGroup {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Session => "session",
            Self::Browsing => "browsing",
            Self::PublicData => "public_data",
            Self::Calendar => "calendar",
            Self::Notifications => "notifications",
            Self::Device => "device",
            Self::Mcp => "mcp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub description: &'static str,
    #[serde(skip)]
    pub required: bool,
}

impl ParamSpec {
    #[must_use]
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }
}

/// Catalog entry describing one tool to the model and the self-check.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub group: ToolGroup,
    pub parameters: Vec<ParamSpec>,
    pub required: Vec<String>,
}

impl ToolDefinition {
    /// JSON-schema rendering of the parameters, in declaration order.
    #[must_use]
    pub fn parameters_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": p.kind, "description": p.description }),
                )
            })
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}

/// Agent-callable tool.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn group(&self) -> ToolGroup;
    fn parameters(&self) -> Vec<ParamSpec>;
    async fn execute(&self, params: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        let parameters = self.parameters();
        let required = parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.to_string())
            .collect();
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            group: self.group(),
            parameters,
            required,
        }
    }
}

/// Ordered registry of tools. Registration order is catalog order.
///
/// Tools are stored as `Arc<dyn AgentTool>` so a dispatcher can move a
/// handle into the task that runs the invocation.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Box<dyn AgentTool>) {
        let tool: Arc<dyn AgentTool> = Arc::from(tool);
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.tools.len();
        self.tools.retain(|t| t.name() != name);
        self.tools.len() != before
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Definitions built fresh from the registered tools on every call.
    #[must_use]
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn list_schemas(&self) -> Vec<Value> {
        self.catalog()
            .into_iter()
            .map(|d| {
                json!({
                    "name": d.name,
                    "description": d.description,
                    "parameters": d.parameters_schema(),
                })
            })
            .collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
