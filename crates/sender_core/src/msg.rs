use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator asked to start sending from an uploaded spreadsheet.
    StartRequested {
        source: PathBuf,
        /// Raw country code from the operator; blank means the configured default.
        country_code: Option<String>,
        /// Whether the source file exists; checked by the caller so `update` stays pure.
        source_found: bool,
    },
    /// Operator toggled pause/resume.
    PauseToggled,
    /// Operator asked to stop after the in-flight job.
    StopRequested,
    /// The worker for `run_id` exited and produced its summary.
    RunFinished {
        run_id: crate::RunId,
        result: crate::BatchResult,
    },
    /// Restore the summary persisted by a previous process.
    RestoreLastResult(crate::BatchResult),
}
