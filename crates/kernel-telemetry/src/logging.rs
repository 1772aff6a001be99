//! Structured logging helpers.
//!
//! Module and driver log lines carry a `component` field plus the subject's
//! id, so JSON output can be filtered without parsing messages.

/// Log a module-related event with standard fields.
#[macro_export]
macro_rules! log_module_event {
    ($level:ident, $component:expr, $msg:expr, $module_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            module_id = %$module_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a driver-related event with standard fields.
#[macro_export]
macro_rules! log_driver_event {
    ($level:ident, $component:expr, $msg:expr, $driver_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            driver_id = %$driver_id,
            $($($field)*,)?
            $msg
        )
    };
}
