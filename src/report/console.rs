// Console output routing

use super::context::ReportContext;
use crate::model::{ConsoleLog, LogEntry, LogLevel, StreamKind};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ERROR_LOG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(ERROR_LOG_PATTERN).expect("invalid error log regex"));

const ERROR_LOG_PATTERN: &str =
    r"(?i)\b(error|exception|fatal|panic(ked)?|traceback|uncaught|assert(ion)?\s*failed)\b";

/// Whether stderr text looks like an error rather than a warning
pub fn is_error_log(content: &str) -> bool {
    ERROR_LOG_REGEX.is_match(content)
}

pub fn console_level(log: &ConsoleLog) -> LogLevel {
    match log.stream {
        StreamKind::Stdout => LogLevel::Info,
        StreamKind::Stderr if is_error_log(&log.content) => LogLevel::Error,
        StreamKind::Stderr => LogLevel::Warn,
    }
}

impl ReportContext<'_> {
    /// Send console output to the originating entity, else the bound entity, else the launch
    pub fn route_console_log(&mut self, log: ConsoleLog) {
        if log.content.is_empty() {
            return;
        }

        let level = console_level(&log);
        let target = log
            .task_id
            .as_deref()
            .and_then(|id| self.registry.remote_id(id))
            .map(str::to_string)
            .or_else(|| {
                self.bridge
                    .current()
                    .and_then(|id| self.registry.remote_id(&id).map(str::to_string))
            })
            .or_else(|| self.launch.launch_id().map(str::to_string));

        let Some(target) = target else {
            debug!("Console output before launch start dropped");
            return;
        };

        self.send_log(
            &target,
            LogEntry {
                message: log.content,
                level,
                time: log.time,
                file: None,
            },
        );
    }
}
