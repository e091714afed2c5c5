//! Metric name and label definitions.
//!
//! Centralizing these keeps names consistent between the fetch pipeline,
//! the resilience primitives and the tool dispatcher.

/// Remote fetch metrics
pub mod fetch {
    /// Total number of orchestrated fetches, labelled by outcome code
    pub const REQUESTS_TOTAL: &str = "tollgate_fetch_requests_total";
    /// Duration of network attempts in seconds
    pub const DURATION_SECONDS: &str = "tollgate_fetch_duration_seconds";
    /// Total bytes downloaded (after truncation)
    pub const BYTES_TOTAL: &str = "tollgate_fetch_bytes_total";
    /// Responses cut off at the endpoint byte cap
    pub const TRUNCATED_TOTAL: &str = "tollgate_fetch_truncated_total";
}

/// Resilience primitive metrics
pub mod resilience {
    /// Number of times a breaker moved to open
    pub const BREAKER_TRIPS_TOTAL: &str = "tollgate_breaker_trips_total";
    /// Calls rejected by the rate limiter
    pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "tollgate_rate_limit_rejections_total";
    /// Fresh cache hits served without network
    pub const CACHE_HITS_TOTAL: &str = "tollgate_cache_hits_total";
}

/// Tool execution metrics
pub mod tools {
    /// Total number of tool executions
    pub const EXECUTIONS_TOTAL: &str = "tollgate_tool_executions_total";
    /// Tool execution duration in seconds
    pub const EXECUTION_DURATION_SECONDS: &str = "tollgate_tool_execution_duration_seconds";
    /// Tool execution errors
    pub const EXECUTION_ERRORS_TOTAL: &str = "tollgate_tool_execution_errors_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const TOOL: &str = "tool";
    pub const CODE: &str = "code";
    pub const SUCCESS: &str = "success";
}
