//! Board relay WebSocket endpoint
//!
//! GET /api/ws?user_id=<id>
//! The user id travels in the query string (browser WebSocket cannot set
//! custom headers).
//!
//! Protocol:
//! - Server → Client: RelayMessage (Ready, Joined, Left, Event, Error)
//! - Client → Server: RelayCommand (JoinBoard, LeaveBoard)

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::relay::{ObserverId, RelayCommand, RelayMessage};
use tokio::time::Duration;

use super::{Need, authorize};
use crate::db;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<AppState> {
    Router::new().route("/api/ws", get(handle_ws))
}

#[derive(Deserialize)]
pub struct WsQuery {
    #[serde(alias = "userId", deserialize_with = "shared::util::flexible_id::deserialize")]
    user_id: i64,
}

/// GET /api/ws?user_id=<id>
pub async fn handle_ws(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_session(socket, state, query.user_id))
}

async fn relay_session(socket: WebSocket, state: AppState, user_id: i64) {
    let (mut sink, mut stream) = socket.split();
    let (observer_id, mut relay_rx) = state.relay.register();

    tracing::info!(observer_id = %observer_id, user_id, "Relay session connected");

    let ready = RelayMessage::Ready {
        observer_id: observer_id.clone(),
    };
    if send_message(&mut sink, &ready).await.is_err() {
        state.relay.deregister(&observer_id);
        return;
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            relayed = relay_rx.recv() => {
                match relayed {
                    Some(msg) => {
                        if send_message(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    // Registry dropped us (pruned as closed)
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<RelayCommand>(&text) {
                            Ok(cmd) => handle_command(&state, &observer_id, user_id, cmd).await,
                            Err(e) => {
                                tracing::debug!(observer_id = %observer_id, error = %e, "Malformed relay command");
                                RelayMessage::Error {
                                    code: ErrorCode::InvalidRequest,
                                    message: format!("Malformed command: {e}"),
                                }
                            }
                        };
                        if send_message(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.relay.deregister(&observer_id);
    tracing::info!(observer_id = %observer_id, user_id, "Relay session disconnected");
}

async fn handle_command(
    state: &AppState,
    observer_id: &ObserverId,
    user_id: i64,
    cmd: RelayCommand,
) -> RelayMessage {
    match cmd {
        RelayCommand::JoinBoard { board_id } => match join_board(state, observer_id, user_id, board_id).await {
            Ok(version) => RelayMessage::Joined { board_id, version },
            Err(err) => RelayMessage::Error {
                code: err.code,
                message: err.message,
            },
        },
        RelayCommand::LeaveBoard { board_id } => {
            state.relay.unsubscribe(observer_id, board_id);
            RelayMessage::Left { board_id }
        }
    }
}

/// Subscribe after an access check; returns the board version at join time
///
/// The client loads the board detail after `joined`; events with a version at
/// or below the loaded one are then ignored by its `BoardView`.
async fn join_board(
    state: &AppState,
    observer_id: &ObserverId,
    user_id: i64,
    board_id: i64,
) -> Result<i64, AppError> {
    authorize(state, user_id, board_id, Need::View).await?;
    // Subscribe before reading the version so no commit falls in between
    if !state.relay.subscribe(observer_id, board_id) {
        return Err(AppError::internal("Relay session is gone"));
    }
    let board = match db::boards::find(&state.pool, board_id).await {
        Ok(Some(board)) => board,
        Ok(None) => {
            state.relay.unsubscribe(observer_id, board_id);
            return Err(AppError::board_not_found(board_id));
        }
        Err(e) => {
            state.relay.unsubscribe(observer_id, board_id);
            return Err(AppError::database(e.to_string()));
        }
    };
    tracing::debug!(observer_id = %observer_id, board_id, version = board.version, "Observer joined board");
    Ok(board.version)
}

async fn send_message<S>(sink: &mut S, msg: &RelayMessage) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
