//! Canonical logging macros
//!
//! Field names come from `arbor_core_types::schema`.

/// Log the start of an operation
///
/// ```
/// # use arbor_core::log_op_start;
/// log_op_start!("read-resource");
/// log_op_start!("read-resource", address = "/content");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use arbor_core::log_op_end;
/// log_op_end!("read-resource", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation failure with its kind and stable code
///
/// ```
/// # use arbor_core::{log_op_error, errors::ArborError};
/// # use arbor_core::address::PathAddress;
/// let err = ArborError::ResourceNotFound { address: PathAddress::parse("/nowhere") };
/// log_op_error!("read-resource", &err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let failure: $crate::errors::FailureDescription = ($err).into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?failure.kind(),
            err.code = failure.code(),
            error = %failure.message(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let failure: $crate::errors::FailureDescription = ($err).into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?failure.kind(),
            err.code = failure.code(),
            error = %failure.message(),
            $($field)*
        );
    }};
}
