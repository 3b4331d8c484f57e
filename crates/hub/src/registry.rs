use std::{collections::HashMap, sync::Arc};

use camrelay_protocol::{CameraRoom, ToViewer, ToViewerFrame};
use camrelay_store::Store;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    handle::{RoomHandle, ViewerHandle},
    rendezvous::Rendezvous,
};

/// Process-wide registry of live rooms and viewers, plus the signaling
/// rendezvous table. All mutation goes through the methods here so the room
/// index and each room's roster stay serialized as the concurrency model
/// requires; readers that fan out to sockets take a snapshot under the lock
/// and enqueue outside it.
pub struct Hub<T> {
    rooms: RwLock<HashMap<i64, RoomEntry>>,
    viewers: RwLock<HashMap<i64, ViewerHandle>>,
    store: Arc<dyn Store>,
    pub rendezvous: Rendezvous<T>,
}

struct RoomEntry {
    handle: RoomHandle,
    roster: RwLock<HashMap<i64, ViewerHandle>>,
}

impl<T> Hub<T> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            viewers: RwLock::new(HashMap::new()),
            store,
            rendezvous: Rendezvous::new(),
        }
    }

    /// Register a newly authenticated room. A collision on id evicts the
    /// prior connection — newest login wins.
    pub async fn on_reg(&self, room: RoomHandle) -> camrelay_store::Result<()> {
        let id = room.id;
        {
            let mut rooms = self.rooms.write().await;
            if let Some(prior) = rooms.remove(&id) {
                tracing::debug!(room_id = id, "hub: evicting prior room connection on re-register");
                prior.handle.close();
            }
            rooms.insert(
                id,
                RoomEntry {
                    handle: room.clone(),
                    roster: RwLock::new(HashMap::new()),
                },
            );
        }

        let viewer_ids = self.store.viewers_of_room(id).await?;
        let matched: Vec<ViewerHandle> = {
            let viewers = self.viewers.read().await;
            viewer_ids
                .iter()
                .filter_map(|account_id| viewers.get(account_id).cloned())
                .collect()
        };

        {
            let rooms = self.rooms.read().await;
            if let Some(entry) = rooms.get(&id) {
                let mut roster = entry.roster.write().await;
                for viewer in &matched {
                    roster.insert(viewer.account_id, viewer.clone());
                }
            }
        }

        let cameras = ipcams_snapshot(&self.store, id).await;
        for viewer in &matched {
            viewer.send(ToViewer::change_room_content(id as u64, &cameras));
        }
        Ok(())
    }

    /// Remove a room from the index and tell its former roster it went
    /// offline.
    pub async fn on_unreg(&self, room_id: i64) {
        let roster = {
            let mut rooms = self.rooms.write().await;
            match rooms.remove(&room_id) {
                Some(entry) => entry.roster.into_inner(),
                None => return,
            }
        };
        for viewer in roster.values() {
            viewer.send(ToViewer::room_offline(room_id as u64));
        }
    }

    /// Add a newly authenticated viewer to the roster of every room it's
    /// visible to that's currently online.
    pub async fn on_join(&self, viewer: ViewerHandle) -> camrelay_store::Result<()> {
        self.viewers
            .write()
            .await
            .insert(viewer.account_id, viewer.clone());

        let visible = self.store.rooms_visible_to(viewer.account_id).await?;
        let rooms = self.rooms.read().await;
        for room in visible {
            if let Some(entry) = rooms.get(&room.id) {
                entry
                    .roster
                    .write()
                    .await
                    .insert(viewer.account_id, viewer.clone());
            }
        }
        Ok(())
    }

    /// Remove a viewer from every room roster it was part of.
    pub async fn on_leave(&self, account_id: i64) {
        self.viewers.write().await.remove(&account_id);
        let rooms = self.rooms.read().await;
        for entry in rooms.values() {
            entry.roster.write().await.remove(&account_id);
        }
    }

    /// Fan a frame to every viewer in the addressed room's roster.
    pub async fn on_msg(&self, room_id: i64, frame: ToViewer) {
        let rooms = self.rooms.read().await;
        if let Some(entry) = rooms.get(&room_id) {
            let roster = entry.roster.read().await;
            for viewer in roster.values() {
                viewer.send(frame.clone());
            }
        }
    }

    /// Send a frame to one viewer in a room's roster, dropping it silently
    /// if the viewer isn't present (`ResponseToMany` routing).
    pub async fn send_to_viewer_in_room(
        &self,
        room_id: i64,
        account_id: i64,
        frame: impl Into<camrelay_protocol::ToViewerFrame>,
    ) {
        let rooms = self.rooms.read().await;
        if let Some(entry) = rooms.get(&room_id) {
            let roster = entry.roster.read().await;
            if let Some(viewer) = roster.get(&account_id) {
                viewer.send(frame);
            }
        }
    }

    pub async fn get_room(&self, id: i64) -> Option<RoomHandle> {
        self.rooms.read().await.get(&id).map(|e| e.handle.clone())
    }

    /// Update a room's camera-list blob, persist it, and push the change to
    /// its current roster.
    pub async fn set_ipcams(&self, room_id: i64, ipcams: Value) -> camrelay_store::Result<()> {
        self.store.save_ipcams(room_id, &ipcams).await?;
        let rooms = self.rooms.read().await;
        if let Some(entry) = rooms.get(&room_id) {
            let roster = entry.roster.read().await;
            for viewer in roster.values() {
                viewer.send(ToViewer::change_room_content(room_id as u64, &ipcams));
            }
        }
        Ok(())
    }

    /// Assemble a `CameraList` snapshot for a viewer: every room they can
    /// see, with the live ipcams blob for rooms currently online and an
    /// empty camera list for rooms that are offline.
    pub async fn camera_list(&self, account_id: i64) -> camrelay_store::Result<Vec<CameraRoom>> {
        let visible = self.store.rooms_visible_to(account_id).await?;
        let rooms = self.rooms.read().await;
        let mut out = Vec::with_capacity(visible.len());
        for room in visible {
            let cameras = if rooms.contains_key(&room.id) {
                ipcams_snapshot(&self.store, room.id).await
            } else {
                Value::Array(Vec::new())
            };
            out.push(CameraRoom {
                id: room.id as u64,
                name: room.name,
                is_owner: room.owner_id == account_id,
                cameras,
            });
        }
        Ok(out)
    }
}

async fn ipcams_snapshot(store: &Arc<dyn Store>, room_id: i64) -> Value {
    match store.find_room(room_id).await {
        Ok(Some(room)) => camrelay_store::ipcams_value(&room),
        _ => Value::Object(Default::default()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use camrelay_store::{Account, OauthCredential, OauthProvider, Room};
    use tokio::sync::{Notify, mpsc};

    use super::*;

    struct FakeStore {
        rooms: StdMutex<HashMap<i64, Room>>,
        viewership: StdMutex<HashMap<i64, Vec<i64>>>,
    }

    impl FakeStore {
        fn new(rooms: Vec<Room>, viewership: HashMap<i64, Vec<i64>>) -> Self {
            Self {
                rooms: StdMutex::new(rooms.into_iter().map(|r| (r.id, r)).collect()),
                viewership: StdMutex::new(viewership),
            }
        }
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn find_oauth_providers(&self) -> camrelay_store::Result<Vec<OauthProvider>> {
            Ok(vec![])
        }
        async fn on_oid(&self, _: &str, _: &str) -> camrelay_store::Result<OauthCredential> {
            unimplemented!()
        }
        async fn account_by_id(&self, _: i64) -> camrelay_store::Result<Account> {
            unimplemented!()
        }
        async fn logoff(&self, _: i64) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn rooms_visible_to(&self, account_id: i64) -> camrelay_store::Result<Vec<Room>> {
            let viewership = self.viewership.lock().unwrap();
            let rooms = self.rooms.lock().unwrap();
            Ok(viewership
                .iter()
                .filter(|(_, viewers)| viewers.contains(&account_id))
                .filter_map(|(room_id, _)| rooms.get(room_id).cloned())
                .collect())
        }
        async fn create_room(&self, _: i64, _: &str) -> camrelay_store::Result<Room> {
            unimplemented!()
        }
        async fn find_room_if_owner(&self, _: i64, _: i64) -> camrelay_store::Result<Room> {
            unimplemented!()
        }
        async fn find_room_for_login(&self, _: i64, _: i64) -> camrelay_store::Result<Option<Room>> {
            unimplemented!()
        }
        async fn find_room(&self, id: i64) -> camrelay_store::Result<Option<Room>> {
            Ok(self.rooms.lock().unwrap().get(&id).cloned())
        }
        async fn rename_room(&self, _: i64, _: &str) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn delete_room(&self, _: i64) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn save_ipcams(&self, id: i64, ipcams: &Value) -> camrelay_store::Result<()> {
            if let Some(room) = self.rooms.lock().unwrap().get_mut(&id) {
                room.ipcams = Some(ipcams.to_string());
            }
            Ok(())
        }
        async fn viewers_of_room(&self, room_id: i64) -> camrelay_store::Result<Vec<i64>> {
            Ok(self
                .viewership
                .lock()
                .unwrap()
                .get(&room_id)
                .cloned()
                .unwrap_or_default())
        }
        async fn can_view(&self, account_id: i64, room_id: i64) -> camrelay_store::Result<bool> {
            Ok(self
                .viewership
                .lock()
                .unwrap()
                .get(&room_id)
                .is_some_and(|v| v.contains(&account_id)))
        }
        async fn credentials_of_account(&self, _: i64) -> camrelay_store::Result<Vec<OauthCredential>> {
            unimplemented!()
        }
        async fn associate_credential(&self, _: i64, _: &str, _: &str) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn unassociate_credential(&self, _: i64, _: &str) -> camrelay_store::Result<()> {
            unimplemented!()
        }
    }

    fn room(id: i64, owner_id: i64) -> Room {
        Room {
            id,
            owner_id,
            name: format!("room-{id}"),
            secret_address: "x".repeat(36),
            ipcams: None,
        }
    }

    fn viewer_handle(account_id: i64) -> (ViewerHandle, mpsc::Receiver<ToViewerFrame>) {
        let (tx, rx) = mpsc::channel(8);
        (
            ViewerHandle::new(account_id, format!("viewer-{account_id}"), tx, Arc::new(Notify::new())),
            rx,
        )
    }

    fn room_handle(id: i64, owner_id: i64) -> (RoomHandle, mpsc::Receiver<camrelay_protocol::ToRoom>) {
        let (tx, rx) = mpsc::channel(8);
        (RoomHandle::new(id, owner_id, tx, Arc::new(Notify::new())), rx)
    }

    #[tokio::test]
    async fn on_join_adds_viewer_to_online_rooms_it_can_see() {
        let mut viewership = HashMap::new();
        viewership.insert(42, vec![7]);
        let store = Arc::new(FakeStore::new(vec![room(42, 7)], viewership));
        let hub: Hub<()> = Hub::new(store);

        let (room_h, _room_rx) = room_handle(42, 7);
        hub.on_reg(room_h).await.unwrap();

        let (viewer_h, mut viewer_rx) = viewer_handle(7);
        hub.on_join(viewer_h).await.unwrap();

        hub.on_msg(42, ToViewer::chat("Alice", "hi")).await;
        let received = viewer_rx.recv().await.unwrap();
        match received {
            ToViewerFrame::Typed(frame) => assert_eq!(frame.r#type, "Chat"),
            ToViewerFrame::Raw(_) => panic!("expected a typed frame"),
        }
    }

    #[tokio::test]
    async fn on_unreg_notifies_roster_and_clears_it() {
        let mut viewership = HashMap::new();
        viewership.insert(42, vec![7]);
        let store = Arc::new(FakeStore::new(vec![room(42, 7)], viewership));
        let hub: Hub<()> = Hub::new(store);

        let (room_h, _room_rx) = room_handle(42, 7);
        hub.on_reg(room_h).await.unwrap();
        let (viewer_h, mut viewer_rx) = viewer_handle(7);
        hub.on_join(viewer_h).await.unwrap();

        hub.on_unreg(42).await;
        let received = viewer_rx.recv().await.unwrap();
        match received {
            ToViewerFrame::Typed(frame) => assert_eq!(frame.r#type, "RoomOffline"),
            ToViewerFrame::Raw(_) => panic!("expected a typed frame"),
        }
        assert!(hub.get_room(42).await.is_none());
    }

    #[tokio::test]
    async fn on_leave_removes_viewer_from_every_roster() {
        let mut viewership = HashMap::new();
        viewership.insert(42, vec![7]);
        let store = Arc::new(FakeStore::new(vec![room(42, 7)], viewership));
        let hub: Hub<()> = Hub::new(store);

        let (room_h, _room_rx) = room_handle(42, 7);
        hub.on_reg(room_h).await.unwrap();
        let (viewer_h, _viewer_rx) = viewer_handle(7);
        hub.on_join(viewer_h).await.unwrap();
        hub.on_leave(7).await;

        // Chat to room 42 should now reach nobody; no panic, no delivery.
        hub.on_msg(42, ToViewer::chat("Alice", "hi")).await;
    }

    #[tokio::test]
    async fn newest_room_login_evicts_prior_connection() {
        let store = Arc::new(FakeStore::new(vec![room(42, 7)], HashMap::new()));
        let hub: Hub<()> = Hub::new(store);

        let (first, _first_rx) = room_handle(42, 7);
        hub.on_reg(first).await.unwrap();
        let (second, _second_rx) = room_handle(42, 7);
        hub.on_reg(second).await.unwrap();

        assert!(hub.get_room(42).await.is_some());
    }

    #[tokio::test]
    async fn send_to_viewer_in_room_forwards_raw_response_to_many_payload() {
        let mut viewership = HashMap::new();
        viewership.insert(42, vec![7]);
        let store = Arc::new(FakeStore::new(vec![room(42, 7)], viewership));
        let hub: Hub<()> = Hub::new(store);

        let (room_h, _room_rx) = room_handle(42, 7);
        hub.on_reg(room_h).await.unwrap();
        let (viewer_h, mut viewer_rx) = viewer_handle(7);
        hub.on_join(viewer_h).await.unwrap();

        let opaque = serde_json::json!({"type": "Response", "to": "ManageGetIpcam", "content": []});
        hub.send_to_viewer_in_room(42, 7, opaque.clone()).await;
        let received = viewer_rx.recv().await.unwrap();
        match received {
            ToViewerFrame::Raw(value) => assert_eq!(value, opaque),
            ToViewerFrame::Typed(_) => panic!("expected a raw passthrough frame"),
        }
    }

    #[tokio::test]
    async fn send_to_viewer_in_room_drops_silently_when_viewer_absent() {
        let store = Arc::new(FakeStore::new(vec![room(42, 7)], HashMap::new()));
        let hub: Hub<()> = Hub::new(store);
        let (room_h, _room_rx) = room_handle(42, 7);
        hub.on_reg(room_h).await.unwrap();

        hub.send_to_viewer_in_room(42, 999, serde_json::json!({"x": 1})).await;
    }

    #[tokio::test]
    async fn camera_list_is_empty_for_offline_rooms() {
        let mut viewership = HashMap::new();
        viewership.insert(42, vec![7]);
        let store = Arc::new(FakeStore::new(vec![room(42, 7)], viewership));
        let hub: Hub<()> = Hub::new(store);

        let rooms = hub.camera_list(7).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].cameras, Value::Array(vec![]));
    }
}
