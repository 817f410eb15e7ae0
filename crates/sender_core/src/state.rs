use crate::view_model::ControlView;
use crate::{BatchResult, DEFAULT_COUNTRY_CODE};

pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    /// Stop requested; the worker is finishing its in-flight job.
    Stopping,
}

impl SessionState {
    /// True while a worker exists, including a stopping one.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Stopping => "stopping",
        }
    }
}

/// Control-surface view of the single batch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    session: SessionState,
    active_run: Option<RunId>,
    last_run_id: RunId,
    default_country_code: String,
    last_result: Option<BatchResult>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_CODE)
    }
}

impl ControlState {
    pub fn new(default_country_code: impl Into<String>) -> Self {
        Self {
            session: SessionState::Idle,
            active_run: None,
            last_run_id: 0,
            default_country_code: default_country_code.into(),
            last_result: None,
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active_run
    }

    pub fn default_country_code(&self) -> &str {
        &self.default_country_code
    }

    pub fn last_result(&self) -> Option<&BatchResult> {
        self.last_result.as_ref()
    }

    pub fn view(&self) -> ControlView {
        ControlView {
            session: self.session,
            active_run: self.active_run,
            last_result: self.last_result.clone(),
        }
    }

    pub(crate) fn begin_run(&mut self) -> RunId {
        self.last_run_id += 1;
        self.active_run = Some(self.last_run_id);
        self.session = SessionState::Running;
        self.last_run_id
    }

    pub(crate) fn set_session(&mut self, session: SessionState) {
        self.session = session;
    }

    pub(crate) fn end_run(&mut self, result: BatchResult) {
        self.session = SessionState::Idle;
        self.active_run = None;
        self.last_result = Some(result);
    }

    pub(crate) fn restore_result(&mut self, result: BatchResult) {
        self.last_result = Some(result);
    }
}
