use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sender_core::{Batch, BatchResult, FormattedJob, Job, Notification, RunId, RunOutcome, Tally};
use sender_logging::{enter_row, sender_info};

use crate::{load_sheet, Delivery, DeliveryError, DeliverySettings, EngineEvent, EventSink};

/// Builds the delivery backend on the worker thread, so it never has to cross threads.
pub type DeliveryFactory = Arc<dyn Fn(&DeliverySettings) -> Box<dyn Delivery> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: RunId,
    pub source: PathBuf,
    pub country_code: String,
}

/// Flags written by the control surface and polled by the worker between steps.
#[derive(Debug)]
pub struct RunSignals {
    running: AtomicBool,
    paused: AtomicBool,
}

impl Default for RunSignals {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        }
    }
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        !self.running.load(Ordering::Relaxed)
    }
}

/// Handle to the single background worker of a run.
pub struct RunHandle {
    run_id: RunId,
    signals: Arc<RunSignals>,
    worker: Option<JoinHandle<()>>,
}

impl RunHandle {
    pub fn spawn(
        request: RunRequest,
        settings: DeliverySettings,
        factory: DeliveryFactory,
        sink: Arc<dyn EventSink>,
    ) -> io::Result<Self> {
        let run_id = request.run_id;
        let signals = Arc::new(RunSignals::new());
        let worker_signals = signals.clone();

        let worker = thread::Builder::new()
            .name(format!("bulk-sender-run-{run_id}"))
            .spawn(move || {
                // Lives outside the unwind boundary so a crash still reports what was sent.
                let mut tally = Tally::default();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut delivery = factory(&settings);
                    execute_batch(
                        &request,
                        &settings,
                        delivery.as_mut(),
                        &worker_signals,
                        sink.as_ref(),
                        &mut tally,
                    )
                }))
                .unwrap_or_else(|payload| {
                    let reason = panic_message(payload.as_ref());
                    sink.notify(Notification::error(format!("❌ Fatal error: {reason}")));
                    RunOutcome::Failed { reason }
                });
                let result = tally.finish(outcome);
                worker_signals.request_stop();
                sink.emit(EngineEvent::Notify(Notification::RunComplete(
                    result.clone(),
                )));
                sink.emit(EngineEvent::Finished { run_id, result });
            })?;

        Ok(Self {
            run_id,
            signals,
            worker: Some(worker),
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn set_paused(&self, paused: bool) {
        self.signals.set_paused(paused);
    }

    pub fn request_stop(&self) {
        self.signals.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Blocks until the worker exits.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Runs one batch to completion, stop, or fatal input error on the calling thread.
pub fn run_batch(
    request: &RunRequest,
    settings: &DeliverySettings,
    delivery: &mut dyn Delivery,
    signals: &RunSignals,
    sink: &dyn EventSink,
) -> BatchResult {
    let mut tally = Tally::default();
    let outcome = execute_batch(request, settings, delivery, signals, sink, &mut tally);
    tally.finish(outcome)
}

/// Drives the job loop, recording every attempt into `tally` as it happens.
fn execute_batch(
    request: &RunRequest,
    settings: &DeliverySettings,
    delivery: &mut dyn Delivery,
    signals: &RunSignals,
    sink: &dyn EventSink,
    tally: &mut Tally,
) -> RunOutcome {
    sink.notify(Notification::info("🚀 Starting WhatsApp Bulk Sender..."));

    let jobs = match load_sheet(&request.source).and_then(|sheet| sheet.jobs()) {
        Ok(jobs) => jobs,
        Err(err) => {
            sink.notify(Notification::error(format!("❌ {err}")));
            return RunOutcome::Failed {
                reason: err.to_string(),
            };
        }
    };

    let total = jobs.len();
    let mut batch = Batch::new(jobs);
    *tally = Tally::new(total);
    sink.notify(Notification::info(format!(
        "📊 Found {total} messages to send"
    )));
    sender_info!(
        "run {} using country code {}, ~{}s per message",
        request.run_id,
        request.country_code,
        settings.job_budget(0).as_secs()
    );
    sink.notify(Notification::warning(
        "⚠️ Do NOT use keyboard/mouse during execution!",
    ));

    let outcome = if countdown(settings, signals, sink) {
        loop {
            if signals.stop_requested() || !wait_while_paused(signals, settings.pause_poll) {
                sink.notify(Notification::warning("⏹️ Process stopped by user"));
                break RunOutcome::Stopped;
            }
            let Some((index, job)) = batch.next_job() else {
                break RunOutcome::Completed;
            };

            let _row = enter_row(index + 1);
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                send_job(index, total, job, &request.country_code, delivery, sink)
            }));
            match attempt {
                Ok(Ok(())) => tally.record_success(),
                Ok(Err(number)) => tally.record_failure(number),
                Err(payload) => {
                    sink.notify(Notification::error(format!(
                        "❌ Error processing row {}: {}",
                        index + 1,
                        panic_message(payload.as_ref())
                    )));
                    tally.record_failure(job.raw_number.trim());
                }
            }
            sink.notify(Notification::Progress(tally.progress()));
        }
    } else {
        sink.notify(Notification::warning("⏹️ Process stopped by user"));
        RunOutcome::Stopped
    };

    emit_summary(tally, sink);
    outcome
}

/// Sends one job; on failure returns the formatted number to record.
fn send_job(
    index: usize,
    total: usize,
    job: &Job,
    country_code: &str,
    delivery: &mut dyn Delivery,
    sink: &dyn EventSink,
) -> Result<(), String> {
    let formatted = FormattedJob::from_job(job, country_code);
    let number = formatted.number;
    sink.notify(Notification::info(format!(
        "📱 [{}/{}] Processing {}...",
        index + 1,
        total,
        number
    )));

    if let Err(err) = delivery.deliver(&number, &formatted.message, sink) {
        sink.notify(Notification::error(format!(
            "❌ Failed to send to {number}: {err}"
        )));
        return Err(number);
    }
    sink.notify(Notification::success(format!("✅ Message sent to {number}")));

    // Image failures are reported but never downgrade the message's success.
    if let Some(image_path) = job.image_path.as_deref() {
        match delivery.attach(&number, image_path, sink) {
            Ok(()) => sink.notify(Notification::success(format!("✅ Image sent to {number}"))),
            Err(err @ DeliveryError::ImageMissing(_)) => {
                sink.notify(Notification::warning(format!("⚠️ {err}")))
            }
            Err(err) => sink.notify(Notification::error(format!(
                "❌ Failed to send image: {err}"
            ))),
        }
    }
    Ok(())
}

/// Returns false when a stop arrived during the countdown.
fn countdown(settings: &DeliverySettings, signals: &RunSignals, sink: &dyn EventSink) -> bool {
    for remaining in (1..=settings.start_countdown.as_secs()).rev() {
        if signals.stop_requested() {
            return false;
        }
        sink.notify(Notification::info(format!(
            "⏳ Starting in {remaining} seconds..."
        )));
        thread::sleep(Duration::from_secs(1));
    }
    !signals.stop_requested()
}

/// Blocks while paused; returns false if a stop arrived meanwhile.
fn wait_while_paused(signals: &RunSignals, poll: Duration) -> bool {
    while signals.is_paused() {
        if signals.stop_requested() {
            return false;
        }
        thread::sleep(poll);
    }
    !signals.stop_requested()
}

fn emit_summary(tally: &Tally, sink: &dyn EventSink) {
    let rule = "=".repeat(50);
    sink.notify(Notification::info(rule.clone()));
    sink.notify(Notification::info("📊 EXECUTION SUMMARY"));
    sink.notify(Notification::info(rule.clone()));
    sink.notify(Notification::info(format!("Total: {}", tally.processed())));
    sink.notify(Notification::success(format!(
        "✅ Successful: {}",
        tally.success()
    )));
    sink.notify(Notification::error(format!("❌ Failed: {}", tally.failure())));
    if !tally.failed_numbers().is_empty() {
        sink.notify(Notification::warning("⚠️ Failed Numbers:"));
        for number in tally.failed_numbers() {
            sink.notify(Notification::warning(format!("  • {number}")));
        }
    }
    sink.notify(Notification::info(rule));
    sink.notify(Notification::success("✅ Process completed!"));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
