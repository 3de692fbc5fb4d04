//! Push channel: a WebSocket on which the service announces focus changes.
//!
//! The client asks for the current state once after connecting; after
//! that the service only speaks when something changes.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{models::SessionState, timer::SessionEvent};

// Set to true to trace every frame on the push channel
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    GetFocusing,
}

/// Messages from the service, keyed by `type`. Anything we don't know is
/// decoded as [`ServerMessage::Other`] and ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Focusing(FocusInfo),
    #[serde(other)]
    Other,
}

/// Payload of a `focusing` message. All durations are whole seconds.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct FocusInfo {
    pub focusing: bool,
    #[serde(default)]
    pub since_last_change: i64,
    #[serde(default)]
    pub focus_time_left: i64,
    #[serde(default)]
    pub num_focuses: i64,
}

impl From<FocusInfo> for SessionState {
    fn from(info: FocusInfo) -> Self {
        let clamp = |value: i64| u64::try_from(value).unwrap_or(0);
        SessionState {
            focusing: info.focusing,
            remaining_seconds: clamp(info.focus_time_left),
            since_last_change_seconds: clamp(info.since_last_change),
            sessions_today: clamp(info.num_focuses),
        }
    }
}

#[derive(Debug, Error)]
pub enum PushDecodeError {
    #[error("malformed push message: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn decode_server_message(text: &str) -> Result<ServerMessage, PushDecodeError> {
    Ok(serde_json::from_str(text)?)
}

/// Runs one push connection until the service closes it or `cancel_token`
/// fires, forwarding every `focusing` message as an authoritative update.
pub async fn run_push_channel(
    url: Url,
    events: mpsc::Sender<SessionEvent>,
    cancel_token: CancellationToken,
) {
    let connected = tokio::select! {
        _ = cancel_token.cancelled() => return,
        result = connect_async(url.as_str()) => result,
    };

    let (ws_stream, _) = match connected {
        Ok(pair) => pair,
        Err(err) => {
            log_warn!("push channel connect to {} failed: {}", url, err);
            return;
        }
    };
    log_info!("push channel connected to {}", url);

    let (mut write, mut read) = ws_stream.split();

    match serde_json::to_string(&ClientMessage::GetFocusing) {
        Ok(json) => {
            if let Err(err) = write.send(Message::Text(json)).await {
                log_warn!("push channel request failed: {}", err);
                return;
            }
        }
        Err(err) => log_warn!("failed to encode get_focusing: {}", err),
    }

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                log_info!("push channel closed by client");
                break;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    log_debug!("push frame: {}", text);
                    match decode_server_message(&text) {
                        Ok(ServerMessage::Focusing(info)) => {
                            if events.send(SessionEvent::Authoritative(info.into())).await.is_err() {
                                break;
                            }
                        }
                        Ok(ServerMessage::Other) => {}
                        Err(err) => log_warn!("{}", err),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    log_info!("push channel closed by service");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    log_warn!("push channel error: {}", err);
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_focusing_wire_form() {
        let json = serde_json::to_string(&ClientMessage::GetFocusing).unwrap();
        assert_eq!(json, r#"{"type":"get_focusing"}"#);
    }

    #[test]
    fn decodes_focusing() {
        let msg = decode_server_message(
            r#"{"type":"focusing","focusing":true,"since_last_change":42,"focus_time_left":1500,"num_focuses":3}"#,
        )
        .unwrap();
        let info = match msg {
            ServerMessage::Focusing(info) => info,
            other => panic!("expected focusing, got {other:?}"),
        };
        let state = SessionState::from(info);
        assert!(state.focusing);
        assert_eq!(state.remaining_seconds, 1500);
        assert_eq!(state.since_last_change_seconds, 42);
        assert_eq!(state.sessions_today, 3);
    }

    #[test]
    fn unknown_types_are_other() {
        let msg = decode_server_message(r#"{"type":"hook_result","id":"r1","content":"hi"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Other);
    }

    #[test]
    fn untagged_or_broken_frames_are_errors() {
        assert!(decode_server_message(r#"{"event":"quote","quote":"x"}"#).is_err());
        assert!(decode_server_message("get_focusing").is_err());
        assert!(decode_server_message(r#"{"type":"focusing","focusing":"yes"}"#).is_err());
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        let info = FocusInfo {
            focusing: false,
            since_last_change: -3,
            focus_time_left: -120,
            num_focuses: 0,
        };
        let state = SessionState::from(info);
        assert_eq!(state.remaining_seconds, 0);
        assert_eq!(state.since_last_change_seconds, 0);
    }
}
