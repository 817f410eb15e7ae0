use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use sender_core::Notification;
use thiserror::Error;
use url::Url;

use crate::{DeliverySettings, EventSink};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid deep link: {0}")]
    InvalidLink(String),
    #[error("could not open {uri}: {reason}")]
    Launch { uri: String, reason: String },
    #[error("keyboard automation failed: {0}")]
    Keyboard(String),
    #[error("keyboard automation is not available in this build")]
    AutomationUnavailable,
    #[error("image not found: {}", .0.display())]
    ImageMissing(PathBuf),
}

/// Builds the chat deep link for an already formatted number and escaped message.
pub fn deep_link(number: &str, encoded_message: &str) -> Result<Url, DeliveryError> {
    let raw = format!("whatsapp://send?phone={number}&text={encoded_message}");
    Url::parse(&raw).map_err(|err| DeliveryError::InvalidLink(err.to_string()))
}

/// OS-level primitives: open a URI and type into whatever window has focus.
pub trait Automation {
    fn open_uri(&mut self, uri: &str) -> Result<(), DeliveryError>;
    fn press_enter(&mut self) -> Result<(), DeliveryError>;
    /// The "open file" shortcut of the focused chat window.
    fn open_file_shortcut(&mut self) -> Result<(), DeliveryError>;
    fn type_char(&mut self, c: char) -> Result<(), DeliveryError>;

    /// Blocking settle wait; never interrupted by pause or stop.
    fn wait(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Narrow seam between the batch loop and the unreliable side effect.
pub trait Delivery {
    fn deliver(
        &mut self,
        number: &str,
        encoded_message: &str,
        sink: &dyn EventSink,
    ) -> Result<(), DeliveryError>;

    /// Sends the image at `image_path`; a blank path succeeds without doing anything.
    fn attach(
        &mut self,
        number: &str,
        image_path: &str,
        sink: &dyn EventSink,
    ) -> Result<(), DeliveryError>;
}

/// Blind keystroke delivery: success only means the sequence ran without a local error.
pub struct KeystrokeDelivery<A> {
    automation: A,
    settings: DeliverySettings,
}

impl<A: Automation> KeystrokeDelivery<A> {
    pub fn new(automation: A, settings: DeliverySettings) -> Self {
        Self {
            automation,
            settings,
        }
    }

    pub fn automation(&self) -> &A {
        &self.automation
    }
}

impl<A: Automation> Delivery for KeystrokeDelivery<A> {
    fn deliver(
        &mut self,
        number: &str,
        encoded_message: &str,
        sink: &dyn EventSink,
    ) -> Result<(), DeliveryError> {
        let link = deep_link(number, encoded_message)?;
        sink.notify(Notification::info(format!("Opening chat for {number}...")));
        self.automation.open_uri(link.as_str())?;
        self.automation.wait(self.settings.open_delay);
        self.automation.press_enter()?;
        self.automation.wait(self.settings.send_delay);
        Ok(())
    }

    fn attach(
        &mut self,
        number: &str,
        image_path: &str,
        sink: &dyn EventSink,
    ) -> Result<(), DeliveryError> {
        if image_path.trim().is_empty() {
            return Ok(());
        }
        let path = Path::new(image_path);
        if !path.exists() {
            return Err(DeliveryError::ImageMissing(path.to_path_buf()));
        }

        sink.notify(Notification::info(format!(
            "📎 Attaching image for {number}..."
        )));
        self.automation.wait(self.settings.pre_attach_delay);
        self.automation.open_file_shortcut()?;
        self.automation.wait(self.settings.image_delay);
        for c in image_path.chars() {
            self.automation.type_char(c)?;
            self.automation.wait(self.settings.typing_delay);
        }
        self.automation.wait(self.settings.image_delay);
        self.automation.press_enter()?;
        self.automation.wait(self.settings.image_delay);
        self.automation.press_enter()?;
        self.automation.wait(self.settings.send_delay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::EngineEvent;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Step {
        Open(String),
        Enter,
        Shortcut,
        Type(char),
        Wait(u64),
    }

    #[derive(Default)]
    struct Recorder {
        steps: Vec<Step>,
        fail_enter: bool,
    }

    impl Automation for Recorder {
        fn open_uri(&mut self, uri: &str) -> Result<(), DeliveryError> {
            self.steps.push(Step::Open(uri.to_string()));
            Ok(())
        }

        fn press_enter(&mut self) -> Result<(), DeliveryError> {
            if self.fail_enter {
                return Err(DeliveryError::Keyboard("focus lost".into()));
            }
            self.steps.push(Step::Enter);
            Ok(())
        }

        fn open_file_shortcut(&mut self) -> Result<(), DeliveryError> {
            self.steps.push(Step::Shortcut);
            Ok(())
        }

        fn type_char(&mut self, c: char) -> Result<(), DeliveryError> {
            self.steps.push(Step::Type(c));
            Ok(())
        }

        fn wait(&mut self, duration: Duration) {
            self.steps.push(Step::Wait(duration.as_millis() as u64));
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<EngineEvent>>);

    impl EventSink for Events {
        fn emit(&self, event: EngineEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn deep_link_keeps_escaped_text() {
        let link = deep_link("+919876543210", "Hi%0ABob%20%26co").unwrap();
        assert_eq!(
            link.as_str(),
            "whatsapp://send?phone=+919876543210&text=Hi%0ABob%20%26co"
        );
    }

    #[test]
    fn message_sequence_opens_waits_and_confirms() {
        let mut delivery = KeystrokeDelivery::new(Recorder::default(), DeliverySettings::default());
        let events = Events::default();

        delivery.deliver("+15550100", "Hi", &events).unwrap();

        assert_eq!(
            delivery.automation().steps,
            vec![
                Step::Open("whatsapp://send?phone=+15550100&text=Hi".into()),
                Step::Wait(10_000),
                Step::Enter,
                Step::Wait(5_000),
            ]
        );
        assert_eq!(events.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn keyboard_failure_surfaces_as_error() {
        let recorder = Recorder {
            fail_enter: true,
            ..Recorder::default()
        };
        let mut delivery = KeystrokeDelivery::new(recorder, DeliverySettings::immediate());
        let err = delivery.deliver("+1", "x", &Events::default()).unwrap_err();
        assert!(matches!(err, DeliveryError::Keyboard(_)));
    }

    #[test]
    fn missing_image_fails_without_keystrokes() {
        let mut delivery = KeystrokeDelivery::new(Recorder::default(), DeliverySettings::default());
        let err = delivery
            .attach("+1", "/definitely/not/here.png", &Events::default())
            .unwrap_err();
        assert!(matches!(err, DeliveryError::ImageMissing(_)));
        assert!(delivery.automation().steps.is_empty());
    }

    #[test]
    fn blank_image_path_is_a_silent_success() {
        let mut delivery = KeystrokeDelivery::new(Recorder::default(), DeliverySettings::default());
        let events = Events::default();

        delivery.attach("+1", "", &events).unwrap();
        delivery.attach("+1", "  \t", &events).unwrap();

        assert!(delivery.automation().steps.is_empty());
        assert!(events.0.lock().unwrap().is_empty());
    }

    #[test]
    fn image_sequence_types_path_and_confirms_twice() {
        let image = NamedTempFile::new().unwrap();
        let path = image.path().to_str().unwrap().to_string();
        let mut delivery = KeystrokeDelivery::new(Recorder::default(), DeliverySettings::default());

        delivery.attach("+1", &path, &Events::default()).unwrap();

        let steps = &delivery.automation().steps;
        assert_eq!(steps[0], Step::Wait(1_000));
        assert_eq!(steps[1], Step::Shortcut);
        assert_eq!(steps[2], Step::Wait(3_000));
        let typed: String = steps
            .iter()
            .filter_map(|step| match step {
                Step::Type(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(typed, path);
        let per_char_waits = steps
            .iter()
            .filter(|step| **step == Step::Wait(100))
            .count();
        assert_eq!(per_char_waits, path.chars().count());
        assert_eq!(
            &steps[steps.len() - 5..],
            &[
                Step::Wait(3_000),
                Step::Enter,
                Step::Wait(3_000),
                Step::Enter,
                Step::Wait(5_000),
            ]
        );
    }
}
