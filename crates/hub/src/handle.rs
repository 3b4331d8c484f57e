use std::sync::Arc;

use camrelay_protocol::{ToRoom, ToViewerFrame};
use tokio::sync::{Notify, mpsc};

/// Handle to a live, authenticated room connection. Cheap to clone: the
/// roster held by the hub and the one held by a viewer's routing path are
/// the same handle, not a copy of connection state.
#[derive(Clone)]
pub struct RoomHandle {
    pub id: i64,
    pub owner_id: i64,
    outbound: mpsc::Sender<ToRoom>,
    close: Arc<Notify>,
}

impl RoomHandle {
    pub fn new(id: i64, owner_id: i64, outbound: mpsc::Sender<ToRoom>, close: Arc<Notify>) -> Self {
        Self {
            id,
            owner_id,
            outbound,
            close,
        }
    }

    /// Enqueue a frame without blocking. Per the bounded-queue invariant, a
    /// full (or already-torn-down) outbound queue closes the connection
    /// rather than retrying or waiting it out — the sole backpressure
    /// mechanism.
    pub fn send(&self, frame: ToRoom) -> bool {
        let sent = self.outbound.try_send(frame).is_ok();
        if !sent {
            self.close();
        }
        sent
    }

    /// Ask the connection's read pump to close, e.g. because a newer login
    /// for the same room id just replaced it.
    pub fn close(&self) {
        self.close.notify_one();
    }
}

/// Handle to a live, authenticated viewer connection.
#[derive(Clone)]
pub struct ViewerHandle {
    pub account_id: i64,
    pub display_name: String,
    outbound: mpsc::Sender<ToViewerFrame>,
    close: Arc<Notify>,
}

impl ViewerHandle {
    pub fn new(
        account_id: i64,
        display_name: String,
        outbound: mpsc::Sender<ToViewerFrame>,
        close: Arc<Notify>,
    ) -> Self {
        Self {
            account_id,
            display_name,
            outbound,
            close,
        }
    }

    /// Enqueue a frame without blocking. Accepts either a typed frame or a
    /// raw JSON value (the `ResponseToMany` passthrough case). A full (or
    /// already-torn-down) outbound queue closes the connection — the sole
    /// backpressure mechanism.
    pub fn send(&self, frame: impl Into<ToViewerFrame>) -> bool {
        let sent = self.outbound.try_send(frame.into()).is_ok();
        if !sent {
            self.close();
        }
        sent
    }

    pub fn close(&self) {
        self.close.notify_one();
    }
}
