use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Local;
use futures::{SinkExt, StreamExt};
use sender_core::{LogLevel, Msg, Notification, ProgressSnapshot, RunId, RunOutcome};
use sender_logging::{sender_debug, sender_info, sender_warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

use super::server::AppContext;

/// Commands a browser sends over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    StartSending {
        filepath: String,
        #[serde(default)]
        country_code: Option<String>,
    },
    PauseSending,
    StopSending,
    Ping,
}

impl ClientCommand {
    fn into_msg(self) -> Option<Msg> {
        match self {
            ClientCommand::StartSending {
                filepath,
                country_code,
            } => {
                let source = PathBuf::from(filepath);
                let source_found = source.is_file();
                Some(Msg::StartRequested {
                    source,
                    country_code,
                    source_found,
                })
            }
            ClientCommand::PauseSending => Some(Msg::PauseToggled),
            ClientCommand::StopSending => Some(Msg::StopRequested),
            ClientCommand::Ping => None,
        }
    }
}

/// Events pushed to the browser, serialized as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        message: String,
    },
    LogMessage {
        message: String,
        level: LogLevel,
        timestamp: String,
    },
    ProgressUpdate(ProgressSnapshot),
    ProcessStarted {
        message: String,
        run_id: RunId,
    },
    ProcessPaused {
        status: String,
    },
    ProcessStopped {
        message: String,
    },
    ProcessComplete {
        success: usize,
        failed: usize,
        failed_numbers: Vec<String>,
        total: usize,
        outcome: RunOutcome,
    },
    Error {
        message: String,
    },
    Pong,
}

impl ServerEvent {
    pub fn from_notification(notification: Notification) -> Self {
        match notification {
            Notification::Log { message, level } => ServerEvent::LogMessage {
                message,
                level,
                timestamp: Local::now().format("%H:%M:%S").to_string(),
            },
            Notification::Progress(progress) => ServerEvent::ProgressUpdate(progress),
            Notification::RunStarted { run_id } => ServerEvent::ProcessStarted {
                message: "Process started".to_string(),
                run_id,
            },
            Notification::RunPaused { paused } => ServerEvent::ProcessPaused {
                status: if paused { "paused" } else { "resumed" }.to_string(),
            },
            Notification::RunStopped => ServerEvent::ProcessStopped {
                message: "Stopping process...".to_string(),
            },
            Notification::RunComplete(result) => ServerEvent::ProcessComplete {
                success: result.success,
                failed: result.failed,
                failed_numbers: result.failed_numbers,
                total: result.total,
                outcome: result.outcome,
            },
            Notification::Error { message } => ServerEvent::Error { message },
        }
    }

    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json)),
            Err(err) => {
                sender_warn!("Could not serialize event {:?}: {}", self, err);
                None
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(context): State<Arc<AppContext>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, context))
}

async fn handle_socket(socket: WebSocket, context: Arc<AppContext>) {
    sender_info!("Client connected");
    let mut events = context.notifications.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let greeting = ServerEvent::Connected {
        message: "Connected to server".to_string(),
    };
    if let Some(message) = greeting.to_message() {
        if sender.send(message).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let notification = match event {
                    Ok(notification) => notification,
                    Err(RecvError::Lagged(skipped)) => {
                        sender_warn!("Client lagged, {} events dropped", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(message) = ServerEvent::from_notification(notification).to_message() else {
                    continue;
                };
                if sender.send(message).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };
                if let Some(reply) = handle_command(&context, &text).await {
                    if let Some(message) = reply.to_message() {
                        if sender.send(message).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
    sender_info!("Client disconnected");
}

/// Dispatches one client command; returns a direct reply for this client only.
async fn handle_command(context: &Arc<AppContext>, text: &str) -> Option<ServerEvent> {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(err) => {
            sender_debug!("Unrecognized client command {:?}: {}", text, err);
            return Some(ServerEvent::Error {
                message: format!("Invalid command: {err}"),
            });
        }
    };
    let Some(msg) = command.into_msg() else {
        return Some(ServerEvent::Pong);
    };

    let controller = context.controller.clone();
    match tokio::task::spawn_blocking(move || controller.dispatch(msg)).await {
        Ok(()) => None,
        Err(err) => Some(ServerEvent::Error {
            message: format!("Error: {err}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sender_core::BatchResult;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_start_with_and_without_country_code() {
        let with_code: ClientCommand = serde_json::from_str(
            r#"{"type":"start_sending","filepath":"uploads/a.csv","country_code":"+1"}"#,
        )
        .unwrap();
        assert_eq!(
            with_code,
            ClientCommand::StartSending {
                filepath: "uploads/a.csv".to_string(),
                country_code: Some("+1".to_string()),
            }
        );

        let without: ClientCommand =
            serde_json::from_str(r#"{"type":"start_sending","filepath":"a.csv"}"#).unwrap();
        assert!(matches!(
            without,
            ClientCommand::StartSending {
                country_code: None,
                ..
            }
        ));
    }

    #[test]
    fn missing_source_is_flagged_for_the_controller() {
        let msg = ClientCommand::StartSending {
            filepath: "/definitely/not/here.xlsx".to_string(),
            country_code: None,
        }
        .into_msg();
        assert!(matches!(
            msg,
            Some(Msg::StartRequested {
                source_found: false,
                ..
            })
        ));
        assert_eq!(ClientCommand::PauseSending.into_msg(), Some(Msg::PauseToggled));
        assert_eq!(ClientCommand::StopSending.into_msg(), Some(Msg::StopRequested));
    }

    #[test]
    fn progress_uses_event_envelope() {
        let event = ServerEvent::from_notification(Notification::Progress(ProgressSnapshot {
            current: 2,
            total: 4,
            percentage: 50,
            success: 1,
            failed: 1,
        }));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "progress_update",
                "data": { "current": 2, "total": 4, "percentage": 50, "success": 1, "failed": 1 }
            })
        );
    }

    #[test]
    fn log_message_carries_level_and_clock_time() {
        let event = ServerEvent::from_notification(Notification::success("✅ Message sent"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], json!("log_message"));
        assert_eq!(value["data"]["level"], json!("success"));
        let timestamp = value["data"]["timestamp"].as_str().unwrap();
        assert_eq!(timestamp.len(), 8);
        assert_eq!(timestamp.matches(':').count(), 2);
    }

    #[test]
    fn pause_and_completion_events() {
        let paused = ServerEvent::from_notification(Notification::RunPaused { paused: false });
        assert_eq!(
            serde_json::to_value(&paused).unwrap(),
            json!({ "event": "process_paused", "data": { "status": "resumed" } })
        );

        let complete = ServerEvent::from_notification(Notification::RunComplete(
            BatchResult::failed("no display"),
        ));
        let value = serde_json::to_value(&complete).unwrap();
        assert_eq!(value["event"], json!("process_complete"));
        assert_eq!(value["data"]["success"], json!(0));
        assert_eq!(
            value["data"]["outcome"],
            json!({ "failed": { "reason": "no display" } })
        );
    }
}
