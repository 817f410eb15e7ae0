use crate::{normalize_country_code, ControlState, Effect, Msg, Notification, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ControlState, msg: Msg) -> (ControlState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested {
            source,
            country_code,
            source_found,
        } => {
            if state.session().is_active() {
                return (
                    state,
                    vec![Effect::Notify(Notification::rejected(
                        "A process is already running!",
                    ))],
                );
            }
            if !source_found {
                return (
                    state,
                    vec![Effect::Notify(Notification::rejected(
                        "Spreadsheet file not found!",
                    ))],
                );
            }

            let country_code = country_code
                .as_deref()
                .and_then(normalize_country_code)
                .unwrap_or_else(|| state.default_country_code().to_string());
            let run_id = state.begin_run();
            vec![
                Effect::StartWorker {
                    run_id,
                    source,
                    country_code,
                },
                Effect::Notify(Notification::RunStarted { run_id }),
            ]
        }
        Msg::PauseToggled => match state.session() {
            SessionState::Running => {
                state.set_session(SessionState::Paused);
                vec![
                    Effect::SetPaused(true),
                    Effect::Notify(Notification::RunPaused { paused: true }),
                ]
            }
            SessionState::Paused => {
                state.set_session(SessionState::Running);
                vec![
                    Effect::SetPaused(false),
                    Effect::Notify(Notification::RunPaused { paused: false }),
                ]
            }
            // Stopping run will not start another job; pausing it is meaningless.
            SessionState::Stopping => Vec::new(),
            SessionState::Idle => no_active_run(),
        },
        Msg::StopRequested => match state.session() {
            SessionState::Running | SessionState::Paused => {
                state.set_session(SessionState::Stopping);
                vec![
                    Effect::RequestStop,
                    Effect::Notify(Notification::RunStopped),
                ]
            }
            SessionState::Stopping => Vec::new(),
            SessionState::Idle => no_active_run(),
        },
        Msg::RunFinished { run_id, result } => {
            if state.active_run() != Some(run_id) {
                return (state, Vec::new());
            }
            state.end_run(result.clone());
            vec![Effect::PersistResult(result)]
        }
        Msg::RestoreLastResult(result) => {
            if state.last_result().is_none() {
                state.restore_result(result);
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn no_active_run() -> Vec<Effect> {
    vec![Effect::Notify(Notification::rejected("No process is running"))]
}
