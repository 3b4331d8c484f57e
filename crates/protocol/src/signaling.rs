//! Wire shape for the viewer's signaling start frame.

use serde::Deserialize;

/// Sent by the viewer as the second frame on the signaling socket (the first
/// is the bearer token), requesting a WebRTC rendezvous with one camera.
#[derive(Debug, Clone, Deserialize)]
pub struct StartSignalingInfo {
    pub room: u64,
    pub camera: String,
    #[serde(rename = "reciever")]
    pub receiver: String,
}
