#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sender_core::{LogLevel, Notification, ProgressSnapshot};
use sender_engine::{Delivery, DeliveryError, EngineEvent, EventSink, RunSignals};
use tempfile::TempDir;

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<ProgressSnapshot> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Notify(Notification::Progress(progress)) => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self, level: LogLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Notify(Notification::Log { message, level: l }) if l == level => {
                    Some(message)
                }
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Scripted stand-in for the keystroke automation.
#[derive(Default)]
pub struct StubDelivery {
    pub delivered: Arc<Mutex<Vec<String>>>,
    pub attached: Arc<Mutex<Vec<String>>>,
    pub failing_numbers: HashSet<String>,
    pub panicking_numbers: HashSet<String>,
    /// Stop the run while delivering the n-th message (one-based).
    pub stop_at: Option<(usize, Arc<RunSignals>)>,
    /// Pause the run while delivering the n-th message (one-based).
    pub pause_at: Option<(usize, Arc<RunSignals>)>,
}

impl Delivery for StubDelivery {
    fn deliver(
        &mut self,
        number: &str,
        _encoded_message: &str,
        _sink: &dyn EventSink,
    ) -> Result<(), DeliveryError> {
        if self.panicking_numbers.contains(number) {
            panic!("automation crashed for {number}");
        }
        let count = {
            let mut delivered = self.delivered.lock().unwrap();
            delivered.push(number.to_string());
            delivered.len()
        };
        if let Some((at, signals)) = &self.stop_at {
            if *at == count {
                signals.request_stop();
            }
        }
        if let Some((at, signals)) = &self.pause_at {
            if *at == count {
                signals.set_paused(true);
            }
        }
        if self.failing_numbers.contains(number) {
            return Err(DeliveryError::Keyboard("window focus stolen".into()));
        }
        Ok(())
    }

    fn attach(
        &mut self,
        _number: &str,
        image_path: &str,
        _sink: &dyn EventSink,
    ) -> Result<(), DeliveryError> {
        self.attached.lock().unwrap().push(image_path.to_string());
        if std::path::Path::new(image_path).exists() {
            Ok(())
        } else {
            Err(DeliveryError::ImageMissing(image_path.into()))
        }
    }
}

pub fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn numbered_csv(dir: &TempDir, rows: usize) -> PathBuf {
    let mut content = String::from("Number,Message\n");
    for i in 1..=rows {
        content.push_str(&format!("98765{i:05},Hello {i}\n"));
    }
    write_csv(dir, "contacts.csv", &content)
}
