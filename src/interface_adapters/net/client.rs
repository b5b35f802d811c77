use crate::domain::SimError;
use crate::interface_adapters::protocol::ServerMessage;
use crate::interface_adapters::router::{ParseError, dispatch, parse_client_message};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ClientId, LoopState, SessionHandle};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    SessionClosed,
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let client = ClientId::next();
    let span = info_span!("conn", conn_id = client.0);
    ws.on_upgrade(move |socket| {
        handle_socket(socket, client, state.session, state.frame_capacity).instrument(span)
    })
}

async fn handle_socket(
    mut socket: WebSocket,
    client: ClientId,
    session: SessionHandle,
    frame_capacity: usize,
) {
    let (frames_tx, frames_rx) = mpsc::channel(frame_capacity);
    let mut state_rx = session.subscribe_state();

    // The current state goes out before attaching so the client sees the auto-start transition.
    let initial = *state_rx.borrow_and_update();
    let initial_bytes = match send_message(&mut socket, &session_state(initial)).await {
        Ok(bytes) => bytes as u64,
        Err(e) => {
            debug!(error = ?e, "client gone before session state was sent");
            return;
        }
    };

    if session.attach(client, frames_tx).await.is_err() {
        warn!("session closed before attach");
        let _ = send_close_with_reason(&mut socket, close_code::AWAY, "server shutting down").await;
        return;
    }
    info!("client connected");

    let mut ctx = ConnCtx {
        client,
        session,
        frames_rx,
        state_rx,
        msgs_in: 0,
        msgs_out: 1,
        bytes_in: 0,
        bytes_out: initial_bytes,
        invalid_json: 0,
        rejected: 0,
        last_invalid_log: throttle_start(),
        close_frame: None,
    };

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    pub client: ClientId,
    pub session: SessionHandle,
    // Encoded snapshots pushed by the broadcaster. Closes when this client is pruned.
    pub frames_rx: mpsc::Receiver<Utf8Bytes>,
    // Loop state changes. Closes when the session shuts down.
    pub state_rx: watch::Receiver<LoopState>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,
    pub rejected: u32,

    pub last_invalid_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

fn session_state(state: LoopState) -> ServerMessage {
    ServerMessage::SessionState {
        state: state.as_str(),
    }
}

fn throttle_start() -> Instant {
    let now = Instant::now();
    now.checked_sub(LOG_THROTTLE).unwrap_or(now)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn shutdown_frame() -> CloseFrame {
    CloseFrame {
        code: close_code::AWAY,
        reason: "server shutting down".into(),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        client,
        session,
        frames_rx,
        state_rx,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        rejected,
        last_invalid_log,
        close_frame,
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    socket,
                    incoming,
                    session,
                    msgs_in,
                    msgs_out,
                    bytes_in,
                    bytes_out,
                    invalid_json,
                    rejected,
                    last_invalid_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            frame = frames_rx.recv() => {
                match frame {
                    Some(bytes) => match forward_frame(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        // The state channel closes first on shutdown; otherwise we were pruned.
                        if state_rx.has_changed().is_err() {
                            *close_frame = Some(shutdown_frame());
                        } else {
                            warn!("client pruned by broadcaster");
                            *close_frame = Some(CloseFrame {
                                code: close_code::AGAIN,
                                reason: "snapshot delivery failed".into(),
                            });
                        }
                        true
                    }
                }
            }

            changed = state_rx.changed() => {
                match changed {
                    Ok(()) => {
                        let state = *state_rx.borrow_and_update();
                        let message = session_state(state);
                        match forward_message(&message, socket, msgs_out, bytes_out).await {
                            LoopControl::Continue => false,
                            LoopControl::Disconnect => true,
                        }
                    }
                    Err(_) => {
                        info!("session closed; disconnecting");
                        *close_frame = Some(shutdown_frame());
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(
        *client,
        session,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
        *rejected,
    )
    .await;

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    session: &SessionHandle,
    msgs_in: &mut u64,
    msgs_out: &mut u64,
    bytes_in: &mut u64,
    bytes_out: &mut u64,
    invalid_json: &mut u32,
    rejected: &mut u32,
    last_invalid_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                let err = match parse_client_message(&text) {
                    Ok(message) => match dispatch(session, message).await {
                        Ok(Some(reply)) => {
                            return Ok(forward_message(&reply, socket, msgs_out, bytes_out).await);
                        }
                        Ok(None) => return Ok(LoopControl::Continue),
                        Err(SimError::SessionClosed) => {
                            *close_frame = Some(shutdown_frame());
                            return Err(NetError::SessionClosed);
                        }
                        Err(err) => err,
                    },
                    Err(ParseError::InvalidJson(reason)) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %reason,
                                "failed to parse client message"
                            );
                        }
                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }
                        SimError::invalid("message", reason)
                    }
                    Err(ParseError::Rejected(err)) => err,
                };

                *rejected += 1;
                if should_log(last_invalid_log) {
                    warn!(kind = err.kind(), error = %err, "client command rejected");
                }
                Ok(forward_message(&ServerMessage::error(&err), socket, msgs_out, bytes_out).await)
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_frame(
    frame: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = frame.len();
    match socket.send(Message::Text(frame)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send physics update");
            LoopControl::Disconnect
        }
    }
}

async fn forward_message(
    msg: &ServerMessage,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send server message");
            LoopControl::Disconnect
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn disconnect_cleanup(
    client: ClientId,
    session: &SessionHandle,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    rejected: u32,
) {
    // Already detached when pruned or after shutdown; both are fine.
    if session.detach(client).await.is_err() {
        debug!("session closed before detach");
    }

    debug!(
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        rejected,
        "connection stats"
    );
    info!("client disconnected");
}
