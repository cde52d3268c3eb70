//! Logging service and sinks

use super::codes::Code;
use super::config;
use super::events::{LogEvent, LogLevel};
use std::sync::{Arc, Mutex, MutexGuard};

/// Sink receiving events that passed the service's level filter
pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    /// Console service honoring the installed logging preferences
    pub fn from_preferences() -> Self {
        let logger = if config::use_structured_logging() {
            ConsoleLogger::json()
        } else {
            ConsoleLogger::plain()
        };
        Self::new(Arc::new(logger), config::get_min_log_level())
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.logger.log(&event);
        }
    }
}

/// Writes errors to stderr and everything else to stdout
pub struct ConsoleLogger {
    json: bool,
}

impl ConsoleLogger {
    pub fn plain() -> Self {
        Self { json: false }
    }

    pub fn json() -> Self {
        Self { json: true }
    }

    fn render(&self, event: &LogEvent) -> String {
        if self.json {
            // Fall back to the plain line rather than dropping the event
            if let Ok(line) = event.format_json() {
                return line;
            }
        }
        event.to_string()
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        let line = self.render(event);
        if event.is_error() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Forwards events to the `log` facade so binaries can pick their backend
pub struct FacadeLogger;

impl Logger for FacadeLogger {
    fn log(&self, event: &LogEvent) {
        let level = match event.level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        };
        log::log!(target: "ur_engine", level, "{}", event);
    }
}

/// Keeps every event in memory for assertions in tests
#[derive(Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().clone()
    }

    pub fn events_with_code(&self, code: Code) -> Vec<LogEvent> {
        self.lock().iter().filter(|e| e.code == code).cloned().collect()
    }

    pub fn has_error_with_code(&self, code: Code) -> bool {
        self.lock().iter().any(|e| e.is_error() && e.code == code)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        self.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_memory_logger_captures_events() {
        let memory = Arc::new(MemoryLogger::new());
        let service = LoggingService::new(memory.clone(), LogLevel::Debug);

        service.log_event(LogEvent::error(codes::evaluation::NON_CONVERGENCE, "did not converge"));
        service.log_event(LogEvent::info("generation started"));

        assert_eq!(memory.len(), 2);
        assert!(memory.has_error_with_code(codes::evaluation::NON_CONVERGENCE));
        assert!(!memory.has_error_with_code(codes::evaluation::WRITE_REJECTED));
        assert_eq!(memory.events_with_code(codes::evaluation::NON_CONVERGENCE).len(), 1);

        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_min_level_filters_events() {
        let memory = Arc::new(MemoryLogger::new());
        let service = LoggingService::new(memory.clone(), LogLevel::Warning);

        service.log_event(LogEvent::debug("noise"));
        service.log_event(LogEvent::info("still noise"));
        service.log_event(LogEvent::warning("kept"));

        assert_eq!(memory.len(), 1);
        assert!(memory.events()[0].is_warning());
        assert!(!service.should_log(LogLevel::Info));
    }

    #[test]
    fn test_json_console_renders_json() {
        let event = LogEvent::warning_with_code(codes::evaluation::WRITE_REJECTED, "rejected");
        assert!(ConsoleLogger::json().render(&event).starts_with('{'));
        assert!(ConsoleLogger::plain().render(&event).starts_with("[WARN] E401"));
    }
}
