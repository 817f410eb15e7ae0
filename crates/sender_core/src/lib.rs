//! Bulk sender core: pure job formatting, run bookkeeping and the control state machine.
mod batch;
mod effect;
mod job;
mod msg;
mod notification;
mod state;
mod update;
mod view_model;

pub use batch::{Batch, BatchResult, ProgressSnapshot, RunOutcome, Tally};
pub use effect::Effect;
pub use job::{
    format_phone_number, normalize_country_code, prepare_message, FormattedJob, Job,
    DEFAULT_COUNTRY_CODE,
};
pub use msg::Msg;
pub use notification::{LogLevel, Notification};
pub use state::{ControlState, RunId, SessionState};
pub use update::update;
pub use view_model::ControlView;
