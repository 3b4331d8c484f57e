//! Wire protocol for the camera relay hub: the textual `<side>:<type>:<payload>`
//! control frames exchanged on the room/viewer sockets, and the JSON frames
//! sent back in either direction.

pub mod constants;
pub mod error;
pub mod frame;
pub mod signaling;
pub mod to_room;
pub mod to_viewer;

pub use constants::*;
pub use error::{FrameError, Result};
pub use frame::{ChatPayload, CommandPayload, ManyFrame, OneFrame, ServerCommandPayload, parse_many_frame, parse_one_frame};
pub use signaling::StartSignalingInfo;
pub use to_room::ToRoom;
pub use to_viewer::{CameraRoom, ToViewer, ToViewerFrame};
