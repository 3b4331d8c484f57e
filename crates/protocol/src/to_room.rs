//! JSON frames the server pushes to room sockets.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct ToRoom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl ToRoom {
    /// A viewer-originated command forwarded to the room, e.g. `ManageSetIpcam`.
    pub fn named_cmd(from: u64, name: &'static str, content: Value) -> Self {
        Self {
            name: Some(name),
            from: Some(from),
            content: Some(content),
        }
    }

    pub fn create_signaling_connection(room_id: u64, camera: &str, receiver_nonce: &str) -> Self {
        Self {
            name: Some("CreateSignalingConnection"),
            from: Some(room_id),
            content: Some(serde_json::json!({
                "camera": camera,
                "reciever": receiver_nonce,
            })),
        }
    }

    pub fn set_room_token(jwt: impl Into<String>) -> Self {
        Self {
            name: Some("SetRoomToken"),
            from: None,
            content: Some(Value::String(jwt.into())),
        }
    }

    pub fn bad_room_token() -> Self {
        Self {
            name: Some("BadRoomToken"),
            from: None,
            content: None,
        }
    }

    pub fn bad_reg_token() -> Self {
        Self {
            name: Some("BadRegToken"),
            from: None,
            content: None,
        }
    }

    pub fn reg_error() -> Self {
        Self {
            name: Some("RegError"),
            from: None,
            content: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_room_token_has_no_content() {
        let json = serde_json::to_value(ToRoom::bad_room_token()).unwrap();
        assert_eq!(json["name"], "BadRoomToken");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn create_signaling_connection_shape() {
        let json = serde_json::to_value(ToRoom::create_signaling_connection(42, "cam1", "N")).unwrap();
        assert_eq!(json["name"], "CreateSignalingConnection");
        assert_eq!(json["from"], 42);
        assert_eq!(json["content"]["camera"], "cam1");
        assert_eq!(json["content"]["reciever"], "N");
    }
}
