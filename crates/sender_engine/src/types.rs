use std::sync::mpsc;

use sender_core::{BatchResult, LogLevel, Notification, RunId};
use sender_logging::{sender_error, sender_info, sender_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Notify(Notification),
    /// Last event of a run; emitted exactly once.
    Finished { run_id: RunId, result: BatchResult },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);

    /// Emits a notification and mirrors log lines to the process log.
    fn notify(&self, notification: Notification) {
        if let Notification::Log { message, level } = &notification {
            match level {
                LogLevel::Info | LogLevel::Success => sender_info!("{}", message),
                LogLevel::Warning => sender_warn!("{}", message),
                LogLevel::Error => sender_error!("{}", message),
            }
        }
        self.emit(EngineEvent::Notify(notification));
    }
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        // Fire-and-forget: a vanished receiver must not stall the worker.
        let _ = self.tx.send(event);
    }
}
