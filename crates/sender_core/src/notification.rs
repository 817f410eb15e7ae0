use serde::{Deserialize, Serialize};

use crate::{BatchResult, ProgressSnapshot, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Fire-and-forget event for whoever drains the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Log { message: String, level: LogLevel },
    Progress(ProgressSnapshot),
    RunStarted { run_id: RunId },
    RunPaused { paused: bool },
    RunStopped,
    RunComplete(BatchResult),
    /// Synchronous rejection of a command; the active run is untouched.
    Error { message: String },
}

impl Notification {
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            level,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
