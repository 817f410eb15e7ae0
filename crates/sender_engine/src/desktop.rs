use std::process::{Command, Stdio};

use sender_logging::sender_debug;

use crate::{Automation, DeliveryError};

/// Real OS automation: the platform URI launcher plus injected keystrokes.
///
/// The keyboard connection is opened lazily on the worker thread on first use.
#[derive(Default)]
pub struct DesktopAutomation {
    #[cfg(feature = "desktop")]
    keyboard: Option<enigo::Enigo>,
}

impl DesktopAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "desktop")]
    fn keyboard(&mut self) -> Result<&mut enigo::Enigo, DeliveryError> {
        if self.keyboard.is_none() {
            let enigo = enigo::Enigo::new(&enigo::Settings::default())
                .map_err(|err| DeliveryError::Keyboard(err.to_string()))?;
            self.keyboard = Some(enigo);
        }
        self.keyboard
            .as_mut()
            .ok_or(DeliveryError::AutomationUnavailable)
    }

    #[cfg(feature = "desktop")]
    fn click(&mut self, key: enigo::Key) -> Result<(), DeliveryError> {
        use enigo::{Direction, Keyboard};
        self.keyboard()?
            .key(key, Direction::Click)
            .map_err(|err| DeliveryError::Keyboard(err.to_string()))
    }
}

#[cfg(feature = "desktop")]
fn shortcut_modifier() -> enigo::Key {
    if cfg!(target_os = "macos") {
        enigo::Key::Meta
    } else {
        enigo::Key::Control
    }
}

fn launcher(uri: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut command = Command::new("rundll32");
        command.args(["url.dll,FileProtocolHandler", uri]);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(uri);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(uri);
        command
    }
}

impl Automation for DesktopAutomation {
    fn open_uri(&mut self, uri: &str) -> Result<(), DeliveryError> {
        let mut command = launcher(uri);
        sender_debug!("launching {:?}", command);
        let status = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| DeliveryError::Launch {
                uri: uri.to_string(),
                reason: err.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(DeliveryError::Launch {
                uri: uri.to_string(),
                reason: format!("launcher exited with {status}"),
            })
        }
    }

    #[cfg(feature = "desktop")]
    fn press_enter(&mut self) -> Result<(), DeliveryError> {
        self.click(enigo::Key::Return)
    }

    #[cfg(feature = "desktop")]
    fn open_file_shortcut(&mut self) -> Result<(), DeliveryError> {
        use enigo::{Direction, Key, Keyboard};
        let keyboard = self.keyboard()?;
        let chord = keyboard
            .key(shortcut_modifier(), Direction::Press)
            .and_then(|()| keyboard.key(Key::Unicode('o'), Direction::Click));
        // Always release the modifier, even when the chord failed halfway.
        let release = keyboard.key(shortcut_modifier(), Direction::Release);
        chord
            .and(release)
            .map_err(|err| DeliveryError::Keyboard(err.to_string()))
    }

    #[cfg(feature = "desktop")]
    fn type_char(&mut self, c: char) -> Result<(), DeliveryError> {
        use enigo::Keyboard;
        self.keyboard()?
            .text(c.encode_utf8(&mut [0u8; 4]))
            .map_err(|err| DeliveryError::Keyboard(err.to_string()))
    }

    #[cfg(not(feature = "desktop"))]
    fn press_enter(&mut self) -> Result<(), DeliveryError> {
        Err(DeliveryError::AutomationUnavailable)
    }

    #[cfg(not(feature = "desktop"))]
    fn open_file_shortcut(&mut self) -> Result<(), DeliveryError> {
        Err(DeliveryError::AutomationUnavailable)
    }

    #[cfg(not(feature = "desktop"))]
    fn type_char(&mut self, _c: char) -> Result<(), DeliveryError> {
        Err(DeliveryError::AutomationUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::launcher;

    #[test]
    fn launcher_passes_uri_as_single_argument() {
        let uri = "whatsapp://send?phone=+1&text=a%20b";
        let command = launcher(uri);
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.last().and_then(|arg| arg.to_str()), Some(uri));
    }
}
