use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use sender_core::{BatchResult, Effect, Notification};
use sender_engine::{
    AtomicFileWriter, ChannelEventSink, DeliveryFactory, DeliverySettings, EngineEvent, EventSink,
    RunHandle, RunRequest,
};
use sender_logging::{sender_error, sender_info, sender_warn};
use tokio::sync::broadcast;

use super::persistence::save_last_result;

/// Executes core effects against the engine, the notification bus and the disk.
pub struct EffectRunner {
    settings: DeliverySettings,
    factory: DeliveryFactory,
    events_tx: mpsc::Sender<EngineEvent>,
    notifications: broadcast::Sender<Notification>,
    store: AtomicFileWriter,
    current: Mutex<Option<RunHandle>>,
}

impl EffectRunner {
    pub fn new(
        settings: DeliverySettings,
        factory: DeliveryFactory,
        events_tx: mpsc::Sender<EngineEvent>,
        notifications: broadcast::Sender<Notification>,
        store: AtomicFileWriter,
    ) -> Self {
        Self {
            settings,
            factory,
            events_tx,
            notifications,
            store,
            current: Mutex::new(None),
        }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartWorker {
                    run_id,
                    source,
                    country_code,
                } => {
                    sender_info!(
                        "StartWorker run_id={} source={:?} country_code={}",
                        run_id,
                        source,
                        country_code
                    );
                    self.start_worker(RunRequest {
                        run_id,
                        source,
                        country_code,
                    });
                }
                Effect::SetPaused(paused) => {
                    if let Some(handle) = self.current().as_ref() {
                        handle.set_paused(paused);
                    }
                }
                Effect::RequestStop => {
                    if let Some(handle) = self.current().as_ref() {
                        handle.request_stop();
                    }
                }
                Effect::Notify(notification) => self.notify(notification),
                Effect::PersistResult(result) => save_last_result(&self.store, &result),
            }
        }
    }

    fn start_worker(&self, request: RunRequest) {
        let run_id = request.run_id;
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(self.events_tx.clone()));
        match RunHandle::spawn(request, self.settings.clone(), self.factory.clone(), sink) {
            Ok(handle) => {
                let previous = self.current().replace(handle);
                // The previous run already reported Finished; its thread is exiting.
                if let Some(previous) = previous {
                    previous.join();
                }
            }
            Err(err) => {
                sender_error!("Failed to spawn worker for run {}: {}", run_id, err);
                let result = BatchResult::failed(err.to_string());
                self.notify(Notification::RunComplete(result.clone()));
                let _ = self.events_tx.send(EngineEvent::Finished { run_id, result });
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if let Notification::Error { message } = &notification {
            sender_warn!("Command rejected: {}", message);
        }
        // No subscriber simply means no browser is connected.
        let _ = self.notifications.send(notification);
    }

    fn current(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
