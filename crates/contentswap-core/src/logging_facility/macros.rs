//! Canonical logging macros
//!
//! Every engine operation is bracketed by a `start` event and exactly one of
//! `end` / `end_error`, all carrying `component`, `op` and the caller's
//! fields (typically `group`).

/// Log the start of an operation
///
/// ```
/// # use contentswap_core::log_op_start;
/// log_op_start!("validate_staging");
/// log_op_start!("validate_staging", group = "rules");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = contentswap_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = contentswap_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use contentswap_core::log_op_end;
/// log_op_end!("swap", duration_ms = 42);
/// log_op_end!("swap", duration_ms = 42, group = "tour");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = contentswap_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = contentswap_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// ```
/// # use contentswap_core::log_op_error;
/// # use contentswap_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::StagingEmpty);
/// log_op_error!("validate_staging", &err, duration_ms = 3, group = "rules");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: &$crate::errors::ExError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = contentswap_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err_message = %ex_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: &$crate::errors::ExError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = contentswap_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err_message = %ex_err,
            $($field)*
        );
    }};
}

/// Log one step of the swap sequence at debug level
///
/// ```
/// # use contentswap_core::log_swap_step;
/// log_swap_step!("rename_tables", group = "tour", table = "tour_steps");
/// ```
#[macro_export]
macro_rules! log_swap_step {
    ($step:expr, $($field:tt)*) => {
        tracing::debug!(
            component = module_path!(),
            step = $step,
            $($field)*
        );
    };
}
