//! Tool catalog, dispatcher and the tools themselves.
//!
//! Tools: memory, session state, guarded web fetch, public-data endpoints,
//! calendar/share/notify through a [`device::DeviceBridge`], user-picked
//! file reads and remote MCP calls.
//!
//! Consent: approval-gated and file-pick-gated tools block on the shared
//! [`approval::InteractionBroker`] until the host answers or the wait times
//! out.

pub mod approval;
pub mod catalog;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod mcp;
pub mod memory;
pub mod params;
pub mod public_data;
pub mod read_file;
pub mod registry;
mod remote;
pub mod session_state;
pub mod web_fetch;

pub use {
    approval::{ApprovalDecision, FilePick, InteractionBroker, PendingApproval, PendingFilePick},
    catalog::{build_dispatcher, build_registry},
    device::{DeviceBridge, HeadlessBridge},
    dispatcher::{Dispatcher, ErrorBody, ToolResponse},
    error::{Error, Result},
    registry::{AgentTool, ParamKind, ParamSpec, ToolDefinition, ToolGroup, ToolRegistry},
};
