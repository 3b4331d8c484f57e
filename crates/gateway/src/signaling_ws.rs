//! Signaling Rendezvous endpoint (spec.md §4.5): a viewer dials in with its
//! bearer token then a `StartSignalingInfo` request; a room dials back with
//! just the nonce it was handed. Both sides share this one endpoint — see
//! `DESIGN.md` resolution (f) for how the first frame's shape tells them
//! apart.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use camrelay_protocol::{MIN_NONCE_ENTROPY_BYTES, SIGNALING_TTL, StartSignalingInfo, ToRoom, ToViewer};
use camrelay_store::ipcams_value;
use tracing::warn;

use crate::state::AppState;

pub async fn signaling_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_signaling_socket(socket, state))
}

async fn handle_signaling_socket(mut socket: WebSocket, state: AppState) {
    let first = match socket.recv().await {
        Some(Ok(Message::Text(t))) => t,
        _ => {
            let _ = socket.close().await;
            return;
        },
    };

    match state.auth().verify_viewer_token(&first) {
        Ok(claims) => handle_viewer_side(socket, state, claims.account_id).await,
        Err(_) => handle_room_dialback(socket, state, first.to_string()).await,
    }
}

async fn handle_viewer_side(mut socket: WebSocket, state: AppState, account_id: i64) {
    let second = match socket.recv().await {
        Some(Ok(Message::Text(t))) => t,
        _ => {
            let _ = socket.close().await;
            return;
        },
    };

    let info: StartSignalingInfo = match serde_json::from_str(&second) {
        Ok(info) => info,
        Err(error) => {
            warn!(%error, account_id, "signaling: malformed StartSignalingInfo");
            let _ = socket.close().await;
            return;
        },
    };

    if info.receiver.len() < MIN_NONCE_ENTROPY_BYTES {
        warn!(account_id, "signaling: nonce too short, rejecting");
        let _ = socket.close().await;
        return;
    }

    let rx = state.hub().rendezvous.register(info.receiver.clone()).await;

    let Some(room_handle) = state.hub().get_room(info.room as i64).await else {
        state.hub().rendezvous.evict(&info.receiver).await;
        send_json(&mut socket, &ToViewer::info("Room not online")).await;
        let _ = socket.close().await;
        return;
    };

    match state.store().can_view(account_id, info.room as i64).await {
        Ok(true) => {},
        Ok(false) => {
            warn!(account_id, room = info.room, "signaling: viewer has no viewership edge to room");
            state.hub().rendezvous.evict(&info.receiver).await;
            let _ = socket.close().await;
            return;
        },
        Err(error) => {
            warn!(%error, account_id, room = info.room, "signaling: can_view lookup failed");
            state.hub().rendezvous.evict(&info.receiver).await;
            let _ = socket.close().await;
            return;
        },
    }

    let room = match state.store().find_room(info.room as i64).await {
        Ok(Some(room)) => room,
        Ok(None) => {
            warn!(account_id, room = info.room, "signaling: room vanished from store after get_room");
            state.hub().rendezvous.evict(&info.receiver).await;
            let _ = socket.close().await;
            return;
        },
        Err(error) => {
            warn!(%error, account_id, room = info.room, "signaling: find_room failed");
            state.hub().rendezvous.evict(&info.receiver).await;
            let _ = socket.close().await;
            return;
        },
    };
    let cameras = ipcams_value(&room);
    if cameras.get(info.camera.as_str()).is_none() {
        warn!(account_id, room = info.room, camera = %info.camera, "signaling: unknown camera id");
        state.hub().rendezvous.evict(&info.receiver).await;
        let _ = socket.close().await;
        return;
    }

    room_handle.send(ToRoom::create_signaling_connection(info.room, &info.camera, &info.receiver));

    if !send_json(&mut socket, &ToViewer::accepted()).await {
        state.hub().rendezvous.evict(&info.receiver).await;
        return;
    }

    match tokio::time::timeout(SIGNALING_TTL, rx).await {
        Ok(Ok(room_socket)) => splice(socket, room_socket).await,
        Ok(Err(_)) | Err(_) => {
            state.hub().rendezvous.evict(&info.receiver).await;
            let _ = socket.close().await;
        },
    }
}

async fn handle_room_dialback(socket: WebSocket, state: AppState, nonce: String) {
    if let Err(socket) = state.hub().rendezvous.deliver(&nonce, socket).await {
        let _ = socket.close().await;
    }
}

/// Bidirectionally splice two signaling sockets, frame for frame, until
/// either side closes or errors.
async fn splice(mut a: WebSocket, mut b: WebSocket) {
    loop {
        tokio::select! {
            msg = a.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(msg)) => if b.send(msg).await.is_err() { break },
                    Some(Err(_)) => break,
                }
            },
            msg = b.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(msg)) => if a.send(msg).await.is_err() { break },
                    Some(Err(_)) => break,
                }
            },
        }
    }
    let _ = a.close().await;
    let _ = b.close().await;
}

async fn send_json(socket: &mut WebSocket, frame: &ToViewer) -> bool {
    match serde_json::to_string(frame) {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use camrelay_store::Room;

    use super::*;

    fn room_with_cameras(ipcams: Option<&str>) -> Room {
        Room {
            id: 1,
            owner_id: 1,
            name: "x".into(),
            secret_address: "s".repeat(36),
            ipcams: ipcams.map(str::to_string),
        }
    }

    #[test]
    fn known_camera_id_is_a_key_in_the_blob() {
        let room = room_with_cameras(Some(r#"{"front-door":{},"driveway":{}}"#));
        let cameras = ipcams_value(&room);
        assert!(cameras.get("front-door").is_some());
    }

    #[test]
    fn unknown_camera_id_is_rejected() {
        let room = room_with_cameras(Some(r#"{"front-door":{}}"#));
        let cameras = ipcams_value(&room);
        assert!(cameras.get("backyard").is_none());
    }

    #[test]
    fn room_with_no_ipcams_rejects_every_camera_id() {
        let room = room_with_cameras(None);
        let cameras = ipcams_value(&room);
        assert!(cameras.get("front-door").is_none());
    }
}
