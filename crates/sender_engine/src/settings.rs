use std::time::Duration;

/// Fixed waits used by the keystroke automation and the worker loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    /// Wait after opening the deep link so the chat can load.
    pub open_delay: Duration,
    /// Wait after each confirming keypress that sends something.
    pub send_delay: Duration,
    /// Wait between the steps of the file dialog.
    pub image_delay: Duration,
    pub pre_attach_delay: Duration,
    /// Delay after each typed character of an image path.
    pub typing_delay: Duration,
    pub pause_poll: Duration,
    /// Countdown before the first job, one log line per whole second.
    pub start_countdown: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            open_delay: Duration::from_secs(10),
            send_delay: Duration::from_secs(5),
            image_delay: Duration::from_secs(3),
            pre_attach_delay: Duration::from_secs(1),
            typing_delay: Duration::from_millis(100),
            pause_poll: Duration::from_millis(500),
            start_countdown: Duration::from_secs(5),
        }
    }
}

impl DeliverySettings {
    /// No waits at all; for dry runs against stub automation.
    pub fn immediate() -> Self {
        Self {
            open_delay: Duration::ZERO,
            send_delay: Duration::ZERO,
            image_delay: Duration::ZERO,
            pre_attach_delay: Duration::ZERO,
            typing_delay: Duration::ZERO,
            pause_poll: Duration::from_millis(1),
            start_countdown: Duration::ZERO,
        }
    }

    /// Worst-case time a single job can take before a stop takes effect.
    pub fn job_budget(&self, image_path_len: usize) -> Duration {
        let message = self.open_delay + self.send_delay;
        if image_path_len == 0 {
            return message;
        }
        message
            + self.pre_attach_delay
            + self.image_delay * 3
            + self.typing_delay * image_path_len as u32
            + self.send_delay
    }
}
