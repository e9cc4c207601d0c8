//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Deployment identifiers
pub const FIELD_GROUP: &str = "group";
pub const FIELD_TABLE: &str = "table";
pub const FIELD_STEP: &str = "step";
pub const FIELD_DEPLOYMENT_ID: &str = "deployment_id";

// Counts
pub const FIELD_ROW_COUNT: &str = "row_count";
pub const FIELD_TABLE_COUNT: &str = "table_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
