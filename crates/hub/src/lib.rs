//! Process-wide room/viewer registry, message routing, and the signaling
//! rendezvous that pairs a viewer with a room's dial-back socket.

mod handle;
mod registry;
mod rendezvous;

pub use handle::{RoomHandle, ViewerHandle};
pub use registry::Hub;
pub use rendezvous::Rendezvous;
