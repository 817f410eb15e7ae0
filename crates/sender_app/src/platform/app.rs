use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use anyhow::Context;
use clap::Parser;
use sender_core::{
    normalize_country_code, update, ControlState, ControlView, Msg, Notification,
    DEFAULT_COUNTRY_CODE,
};
use sender_engine::{
    ensure_output_dir, AtomicFileWriter, Delivery, DeliveryFactory, DeliverySettings,
    DesktopAutomation, EngineEvent, KeystrokeDelivery,
};
use sender_logging::sender_info;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use super::cli::Cli;
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::persistence::load_last_result;
use super::{logging, server};

const NOTIFICATION_BUFFER: usize = 1024;

pub fn run_app() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(&cli)?;
    logging::initialize(config.log);

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    ensure_output_dir(&config.upload_dir)
        .with_context(|| format!("preparing upload dir {}", config.upload_dir.display()))?;

    let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
    let controller = start_controller(&config, desktop_factory(), notifications.clone());
    let context = Arc::new(server::AppContext {
        controller,
        notifications,
        uploads: AtomicFileWriter::new(config.upload_dir.clone()),
        max_upload_bytes: config.max_upload_bytes,
    });

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    sender_info!("Server running at http://{}", addr);
    println!("Server running at: http://localhost:{}", config.port);
    println!("Open this URL in your browser to access the interface");

    axum::serve(listener, server::router(context)).await?;
    Ok(())
}

fn desktop_factory() -> DeliveryFactory {
    Arc::new(|settings: &DeliverySettings| -> Box<dyn Delivery> {
        Box::new(KeystrokeDelivery::new(
            DesktopAutomation::new(),
            settings.clone(),
        ))
    })
}

/// Owner of the control state; every command and worker report goes through `dispatch`.
pub struct Controller {
    state: Mutex<ControlState>,
    effects: EffectRunner,
}

impl Controller {
    fn new(state: ControlState, effects: EffectRunner) -> Self {
        Self {
            state: Mutex::new(state),
            effects,
        }
    }

    /// Effects run before the lock is released, so a stop or pause always
    /// finds the worker spawned by the start that preceded it.
    pub fn dispatch(&self, msg: Msg) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = std::mem::take(&mut *guard);
        let (state, effects) = update(state, msg);
        *guard = state;
        self.effects.run(effects);
    }

    pub fn view(&self) -> ControlView {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .view()
    }
}

pub(crate) fn start_controller(
    config: &AppConfig,
    factory: DeliveryFactory,
    notifications: broadcast::Sender<Notification>,
) -> Arc<Controller> {
    let (events_tx, events_rx) = mpsc::channel();
    let effects = EffectRunner::new(
        config.delays.to_settings(),
        factory,
        events_tx,
        notifications.clone(),
        AtomicFileWriter::new(config.upload_dir.clone()),
    );
    let country_code = normalize_country_code(&config.default_country_code)
        .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());
    let controller = Arc::new(Controller::new(ControlState::new(country_code), effects));

    if let Some(result) = load_last_result(&config.upload_dir) {
        controller.dispatch(Msg::RestoreLastResult(result));
    }
    spawn_event_loop(controller.clone(), events_rx, notifications);
    controller
}

fn spawn_event_loop(
    controller: Arc<Controller>,
    events_rx: mpsc::Receiver<EngineEvent>,
    notifications: broadcast::Sender<Notification>,
) {
    thread::spawn(move || {
        while let Ok(event) = events_rx.recv() {
            match event {
                EngineEvent::Notify(notification) => {
                    let _ = notifications.send(notification);
                }
                EngineEvent::Finished { run_id, result } => {
                    controller.dispatch(Msg::RunFinished { run_id, result });
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use sender_core::{RunOutcome, SessionState};
    use sender_engine::{DeliveryError, EventSink};
    use tempfile::TempDir;

    use super::*;

    struct AlwaysSends;

    impl Delivery for AlwaysSends {
        fn deliver(&mut self, _: &str, _: &str, _: &dyn EventSink) -> Result<(), DeliveryError> {
            Ok(())
        }

        fn attach(&mut self, _: &str, _: &str, _: &dyn EventSink) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    /// Counts deliveries, taking a few milliseconds per message.
    struct SlowSends(Arc<AtomicUsize>);

    impl Delivery for SlowSends {
        fn deliver(&mut self, _: &str, _: &str, _: &dyn EventSink) -> Result<(), DeliveryError> {
            thread::sleep(Duration::from_millis(5));
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn attach(&mut self, _: &str, _: &str, _: &dyn EventSink) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn test_config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig {
            upload_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        config.delays.countdown = 0;
        config.delays.open = 0.0;
        config.delays.send = 0.0;
        config
    }

    fn wait_for_complete(rx: &mut broadcast::Receiver<Notification>) -> sender_core::BatchResult {
        loop {
            match rx.blocking_recv() {
                Ok(Notification::RunComplete(result)) => return result,
                Ok(_) => continue,
                Err(err) => panic!("notification bus closed: {err}"),
            }
        }
    }

    fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("timed out waiting for {what}");
    }

    fn wait_for_idle(controller: &Controller) {
        wait_until("idle", || controller.view().session == SessionState::Idle);
    }

    #[test]
    fn run_flows_from_start_to_persisted_summary() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("contacts.csv");
        fs::write(&source, "Number,Message\n111,hi\n222,there\n").unwrap();
        let config = test_config(&dir);
        let (notifications, mut rx) = broadcast::channel(NOTIFICATION_BUFFER);
        let factory: DeliveryFactory =
            Arc::new(|_: &DeliverySettings| -> Box<dyn Delivery> { Box::new(AlwaysSends) });
        let controller = start_controller(&config, factory, notifications);

        controller.dispatch(Msg::StartRequested {
            source: source.clone(),
            country_code: Some("1".to_string()),
            source_found: true,
        });
        let result = wait_for_complete(&mut rx);
        wait_for_idle(&controller);

        assert_eq!(result.outcome, RunOutcome::Completed);
        assert_eq!(result.success, 2);
        assert_eq!(controller.view().last_result, Some(result.clone()));
        wait_until("persisted summary", || load_last_result(dir.path()).is_some());
        assert_eq!(load_last_result(dir.path()), Some(result));

        let restarted = start_controller(
            &config,
            Arc::new(|_: &DeliverySettings| -> Box<dyn Delivery> { Box::new(AlwaysSends) }),
            broadcast::channel(4).0,
        );
        assert!(restarted.view().last_result.is_some());
    }

    #[test]
    fn fatal_input_returns_controller_to_idle() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("contacts.csv");
        fs::write(&source, "Phone\n111\n").unwrap();
        let (notifications, mut rx) = broadcast::channel(NOTIFICATION_BUFFER);
        let controller = start_controller(
            &test_config(&dir),
            Arc::new(|_: &DeliverySettings| -> Box<dyn Delivery> { Box::new(AlwaysSends) }),
            notifications,
        );

        controller.dispatch(Msg::StartRequested {
            source,
            country_code: None,
            source_found: true,
        });
        let result = wait_for_complete(&mut rx);
        wait_for_idle(&controller);

        assert!(matches!(result.outcome, RunOutcome::Failed { .. }));
        assert_eq!(result.total, 0);
    }

    #[test]
    fn stop_right_after_start_always_reaches_the_worker() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("contacts.csv");
        let mut rows = String::from("Number,Message\n");
        for i in 0..20 {
            rows.push_str(&format!("{i},hi\n"));
        }
        fs::write(&source, rows).unwrap();
        let sent = Arc::new(AtomicUsize::new(0));
        let counter = sent.clone();
        let factory: DeliveryFactory = Arc::new(move |_: &DeliverySettings| -> Box<dyn Delivery> {
            Box::new(SlowSends(counter.clone()))
        });
        let (notifications, mut rx) = broadcast::channel(NOTIFICATION_BUFFER);
        let controller = start_controller(&test_config(&dir), factory, notifications);

        for _ in 0..50 {
            sent.store(0, Ordering::SeqCst);
            let starter = {
                let controller = controller.clone();
                let source = source.clone();
                thread::spawn(move || {
                    controller.dispatch(Msg::StartRequested {
                        source,
                        country_code: None,
                        source_found: true,
                    })
                })
            };
            wait_until("run to begin", || {
                controller.view().session != SessionState::Idle
            });
            controller.dispatch(Msg::StopRequested);
            starter.join().unwrap();

            let result = wait_for_complete(&mut rx);
            wait_for_idle(&controller);
            assert_eq!(result.outcome, RunOutcome::Stopped);
            assert!(sent.load(Ordering::SeqCst) < 20);
        }
    }
}
