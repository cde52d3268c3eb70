//! Structured, coded logging shared by the engine crates
//!
//! A process-wide [`LoggingService`] is installed once with
//! [`init_global_logging`] or [`init_global_logging_with_service`]. Until then
//! every macro is a silent no-op, so library code can log unconditionally.
//!
//! While a node is being evaluated the engine sets a thread-local target
//! context; events emitted in that window carry the node's target path.

pub mod codes;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{ConsoleLogger, FacadeLogger, Logger, LoggingService, MemoryLogger};

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

thread_local! {
    static TARGET_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Install a console service built from the current preferences
pub fn init_global_logging() -> Result<(), String> {
    config::validate_config().map_err(|e| format!("Invalid logging configuration: {}", e))?;

    let unregistered: Vec<&str> = [
        codes::system::INTERNAL_ERROR,
        codes::evaluation::NON_CONVERGENCE,
        codes::targets::INVALID_TARGET,
    ]
    .iter()
    .filter(|code| code.metadata().is_none())
    .map(|code| code.as_str())
    .collect();
    if !unregistered.is_empty() {
        return Err(format!("Unregistered codes: {}", unregistered.join(", ")));
    }

    init_global_logging_with_service(Arc::new(LoggingService::from_preferences()))?;
    dispatch(LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging initialized",
    ));
    Ok(())
}

/// Install a caller-built service; only the first installation wins
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| "Global logger already initialized".to_string())
}

pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(Arc::as_ref)
}

pub fn get_current_target_context() -> Option<String> {
    TARGET_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Run `f` with `target` as the current target context
///
/// Contexts nest: the enclosing target is restored when `f` returns.
pub fn with_target_context<F, R>(target: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = TARGET_CONTEXT.with(|ctx| ctx.replace(Some(target.to_string())));
    let result = f();
    TARGET_CONTEXT.with(|ctx| *ctx.borrow_mut() = previous);
    result
}

pub fn debug_enabled() -> bool {
    try_get_global_logger().is_some_and(|logger| logger.should_log(LogLevel::Debug))
}

/// Send an event to the global service, if one is installed
///
/// Events without an explicit target pick up the current target context.
/// Messages longer than the compile-time limit are truncated.
pub fn dispatch(mut event: LogEvent) {
    let Some(logger) = try_get_global_logger() else {
        return;
    };

    if event.target.is_none() {
        event.target = get_current_target_context();
    }
    let clamped = config::clamp_message(&event.message).len();
    event.message.truncate(clamped);

    logger.log_event(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_context_nesting() {
        assert_eq!(get_current_target_context(), None);

        with_target_context("data.total", || {
            assert_eq!(get_current_target_context().as_deref(), Some("data.total"));
            with_target_context("data.rows.r1.name", || {
                assert_eq!(
                    get_current_target_context().as_deref(),
                    Some("data.rows.r1.name")
                );
            });
            assert_eq!(get_current_target_context().as_deref(), Some("data.total"));
        });

        assert_eq!(get_current_target_context(), None);
    }

    #[test]
    fn test_global_logger_installs_once() {
        let _ = init_global_logging();
        assert!(try_get_global_logger().is_some());

        let second = LoggingService::new(Arc::new(MemoryLogger::new()), LogLevel::Debug);
        assert!(init_global_logging_with_service(Arc::new(second)).is_err());
    }

    #[test]
    fn test_macros_are_noops_without_global_logger() {
        // Must not panic whether or not another test installed a logger
        crate::log_info!("no logger", "key" => 1);
        crate::log_debug!("debug", "key" => "value");
        crate::log_warning!("warning");
        crate::log_error!(codes::system::INTERNAL_ERROR, "error", "detail" => "x");
        crate::log_success!(codes::success::GENERATION_COMMITTED, "done");
    }
}
