//! Room Connection driver (spec.md §4.2): the `Unauthenticated → Authenticated`
//! state machine for a camera site's persistent control socket.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use camrelay_hub::RoomHandle;
use camrelay_protocol::{
    OUTBOUND_QUEUE_CAPACITY, OneFrame, ServerCommandPayload, ToRoom, WRITE_TIMEOUT, parse_one_frame,
};
use camrelay_store::Room;
use futures::{SinkExt, StreamExt};
use tokio::sync::{Notify, mpsc};
use tracing::{info, warn};

use crate::state::AppState;

pub async fn room_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_room_socket(socket, state))
}

async fn handle_room_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ToRoom>(OUTBOUND_QUEUE_CAPACITY);
    let close = Arc::new(Notify::new());

    let write_close = Arc::clone(&close);
    let write_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = write_close.notified() => break,
                frame = outbound_rx.recv() => {
                    let Some(frame) = frame else { break };
                    let Ok(text) = serde_json::to_string(&frame) else { continue };
                    match tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Text(text.into()))).await {
                        Ok(Ok(())) => {},
                        _ => break,
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    let mut bound: Option<Room> = None;

    // Mirrors `RoomHandle::send`'s overflow-closes-connection discipline for
    // the pre-registration frames sent before a `RoomHandle` exists.
    let send_or_close = |tx: &mpsc::Sender<ToRoom>, close: &Notify, frame: ToRoom| {
        if tx.try_send(frame).is_err() {
            close.notify_one();
        }
    };

    'read: loop {
        tokio::select! {
            _ = close.notified() => break 'read,
            msg = stream.next() => {
                let Some(msg) = msg else { break 'read };
                let text = match msg {
                    Ok(Message::Text(t)) => t,
                    Ok(Message::Close(_)) => break 'read,
                    Ok(_) => continue,
                    Err(_) => break 'read,
                };

                let frame = match parse_one_frame(&text) {
                    Ok(frame) => frame,
                    Err(error) => {
                        warn!(%error, "room socket: malformed frame, dropping");
                        continue;
                    },
                };

                match (&bound, frame) {
                    (None, OneFrame::Login(token)) => {
                        match state.auth().verify_room_login(&token).await {
                            Ok(room) => {
                                let handle = RoomHandle::new(
                                    room.id,
                                    room.owner_id,
                                    outbound_tx.clone(),
                                    Arc::clone(&close),
                                );
                                if let Err(error) = state.hub().on_reg(handle).await {
                                    warn!(%error, room_id = room.id, "room socket: on_reg failed");
                                    break 'read;
                                }
                                info!(room_id = room.id, "room socket: login ok");
                                bound = Some(room);
                            },
                            Err(error) => {
                                warn!(%error, "room socket: bad login token");
                                send_or_close(&outbound_tx, &close, ToRoom::bad_room_token());
                            },
                        }
                    },
                    (None, OneFrame::RegRoom { reg_token, name }) => {
                        match state.auth().verify_registration_token(&reg_token) {
                            Ok(claims) => match state.store().create_room(claims.account_id, &name).await {
                                Ok(room) => match state.auth().mint_room_login_token(&room) {
                                    Ok(jwt) => {
                                        send_or_close(&outbound_tx, &close, ToRoom::set_room_token(jwt));
                                    },
                                    Err(error) => {
                                        warn!(%error, "room socket: mint_room_login_token failed");
                                        send_or_close(&outbound_tx, &close, ToRoom::reg_error());
                                    },
                                },
                                Err(error) => {
                                    warn!(%error, "room socket: create_room failed");
                                    send_or_close(&outbound_tx, &close, ToRoom::reg_error());
                                },
                            },
                            Err(error) => {
                                warn!(%error, "room socket: bad registration token");
                                send_or_close(&outbound_tx, &close, ToRoom::bad_reg_token());
                            },
                        }
                    },
                    (Some(room), OneFrame::Ipcams(value)) => {
                        if let Err(error) = state.hub().set_ipcams(room.id, value).await {
                            warn!(%error, room_id = room.id, "room socket: set_ipcams failed");
                        }
                    },
                    (Some(room), OneFrame::ResponseToMany { viewer_id, opaque }) => {
                        state
                            .hub()
                            .send_to_viewer_in_room(room.id, viewer_id as i64, opaque)
                            .await;
                    },
                    (Some(room), OneFrame::ServerCommand(ServerCommandPayload { name })) if name == "RemoveRoom" => {
                        let room_id = room.id;
                        if let Err(error) = state.store().delete_room(room_id).await {
                            warn!(%error, room_id, "room socket: delete_room failed");
                        }
                        state.hub().on_unreg(room_id).await;
                        bound = None;
                        send_or_close(&outbound_tx, &close, ToRoom::bad_room_token());
                    },
                    // Frame type valid but not accepted in the connection's current
                    // state (a second Login/RegRoom once bound, an authenticated-only
                    // frame before login, an unrecognized ServerCommand) — dropped
                    // per the hub's per-frame recovery discipline.
                    (_, _frame) => {},
                }
            },
        }
    }

    if let Some(room) = &bound {
        state.hub().on_unreg(room.id).await;
    }
    close.notify_one();
    let _ = write_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_server_command_name_is_dropped_not_matched() {
        let frame = OneFrame::ServerCommand(ServerCommandPayload {
            name: "Bogus".to_string(),
        });
        let room = Some(Room {
            id: 1,
            owner_id: 1,
            name: "x".into(),
            secret_address: "s".repeat(36),
            ipcams: None,
        });
        let matched = matches!(
            (&room, frame),
            (Some(_), OneFrame::ServerCommand(ServerCommandPayload { name })) if name == "RemoveRoom"
        );
        assert!(!matched);
    }
}
