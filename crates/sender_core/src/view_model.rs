use serde::Serialize;

use crate::{BatchResult, RunId, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlView {
    #[serde(serialize_with = "serialize_session")]
    pub session: SessionState,
    pub active_run: Option<RunId>,
    pub last_result: Option<BatchResult>,
}

fn serialize_session<S: serde::Serializer>(
    session: &SessionState,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(session.as_str())
}
