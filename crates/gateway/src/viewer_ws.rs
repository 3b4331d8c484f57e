//! Viewer Connection driver (spec.md §4.3): accept-time bearer-token auth,
//! then the flat `Authenticated → Closed` command loop.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use camrelay_hub::ViewerHandle;
use camrelay_protocol::{
    ManyFrame, OUTBOUND_QUEUE_CAPACITY, ToRoom, ToViewer, VIEWER_PING_PERIOD, WRITE_TIMEOUT,
    parse_many_frame,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{Notify, mpsc};
use tracing::{info, warn};

use crate::state::AppState;

pub async fn viewer_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_viewer_socket(socket, state))
}

async fn handle_viewer_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let token = match stream.next().await {
        Some(Ok(Message::Text(t))) => t,
        _ => {
            let _ = sink.close().await;
            return;
        },
    };

    let claims = match state.auth().verify_viewer_token(&token) {
        Ok(claims) => claims,
        Err(error) => {
            warn!(%error, "viewer socket: auth token failed");
            let frame = ToViewer::info("Auth token failed");
            if let Ok(text) = serde_json::to_string(&frame) {
                let _ = sink.send(Message::Text(text.into())).await;
            }
            let _ = sink.close().await;
            return;
        },
    };

    let account = match state.store().account_by_id(claims.account_id).await {
        Ok(account) => account,
        Err(error) => {
            warn!(%error, account_id = claims.account_id, "viewer socket: auth failed, no account");
            let frame = ToViewer::info("Auth failed");
            if let Ok(text) = serde_json::to_string(&frame) {
                let _ = sink.send(Message::Text(text.into())).await;
            }
            let _ = sink.close().await;
            return;
        },
    };

    let account_id = account.id;
    let display_name = account.name;

    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let close = Arc::new(Notify::new());

    let write_close = Arc::clone(&close);
    let write_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(VIEWER_PING_PERIOD);
        ping.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = write_close.notified() => break,
                _ = ping.tick() => {
                    if tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Ping(Vec::new().into()))).await.is_err() {
                        break;
                    }
                }
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

    let handle = ViewerHandle::new(account_id, display_name.clone(), outbound_tx.clone(), Arc::clone(&close));
    handle.send(ToViewer::login_ok());
    if let Err(error) = state.hub().on_join(handle.clone()).await {
        warn!(%error, account_id, "viewer socket: on_join failed");
        close.notify_one();
        let _ = write_task.await;
        return;
    }
    info!(account_id, "viewer socket: login ok");

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

                let frame = match parse_many_frame(&text) {
                    Ok(frame) => frame,
                    Err(error) => {
                        warn!(%error, account_id, "viewer socket: malformed frame, dropping");
                        continue;
                    },
                };

                match frame {
                    ManyFrame::Chat(chat) => {
                        state
                            .hub()
                            .on_msg(chat.room as i64, ToViewer::chat(display_name.clone(), chat.content))
                            .await;
                    },
                    ManyFrame::Command(cmd) => {
                        let room_id = cmd.room as i64;
                        if state.store().find_room_if_owner(room_id, account_id).await.is_err() {
                            continue; // not the owner — drop (DESIGN.md resolution (c))
                        }

                        match cmd.name.as_str() {
                            "ManageSetRoomName" => {
                                let Some(name) = cmd.content.as_str() else { continue };
                                if let Err(error) = state.store().rename_room(room_id, name).await {
                                    warn!(%error, room_id, "viewer socket: rename_room failed");
                                    continue;
                                }
                                let reply = ToViewer::response(
                                    "ManageSetRoomName",
                                    serde_json::json!({"id": room_id, "name": name}),
                                );
                                handle.send(reply);
                            },
                            "ManageDelRoom" => {
                                if let Err(error) = state.store().delete_room(room_id).await {
                                    warn!(%error, room_id, "viewer socket: delete_room failed");
                                    continue;
                                }
                                if let Some(room_handle) = state.hub().get_room(room_id).await {
                                    room_handle.close();
                                }
                                let reply = ToViewer::response("ManageDelRoom", serde_json::json!(room_id));
                                handle.send(reply);
                            },
                            name @ ("ManageGetIpcam" | "ManageSetIpcam" | "ManageDelIpcam" | "ManageReconnectIpcam") => {
                                let static_name: &'static str = match name {
                                    "ManageGetIpcam" => "ManageGetIpcam",
                                    "ManageSetIpcam" => "ManageSetIpcam",
                                    "ManageDelIpcam" => "ManageDelIpcam",
                                    _ => "ManageReconnectIpcam",
                                };
                                match state.hub().get_room(room_id).await {
                                    Some(room_handle) => {
                                        room_handle.send(ToRoom::named_cmd(account_id as u64, static_name, cmd.content));
                                    },
                                    None => {
                                        handle.send(ToViewer::info("Room not online"));
                                    },
                                }
                            },
                            _ => {},
                        }
                    },
                    ManyFrame::GetManyData(name) => match name.as_str() {
                        "Userinfo" => {
                            handle.send(ToViewer::userinfo(display_name.clone()));
                        },
                        "CameraList" => match state.hub().camera_list(account_id).await {
                            Ok(rooms) => {
                                handle.send(ToViewer::camera_list(rooms));
                            },
                            Err(error) => warn!(%error, account_id, "viewer socket: camera_list failed"),
                        },
                        _ => {},
                    },
                }
            },
        }
    }

    state.hub().on_leave(account_id).await;
    close.notify_one();
    let _ = write_task.await;
}
