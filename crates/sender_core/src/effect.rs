use std::path::PathBuf;

use crate::{BatchResult, Notification, RunId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartWorker {
        run_id: RunId,
        source: PathBuf,
        country_code: String,
    },
    SetPaused(bool),
    RequestStop,
    Notify(Notification),
    PersistResult(BatchResult),
}
