//! JSON frames the server pushes to viewer sockets.
//!
//! All frames are JSON objects carrying a `type` field and a `content` field
//! of arbitrary shape. `from` is added when the content originates from a
//! specific viewer identity; `to` addresses a `Response` at the command it
//! answers.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct ToViewer {
    pub r#type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl ToViewer {
    fn plain(r#type: &'static str, content: Value) -> Self {
        Self {
            r#type,
            content: Some(content),
            from: None,
            to: None,
        }
    }

    pub fn login_ok() -> Self {
        Self::plain("Login", serde_json::json!(1))
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::plain("Info", Value::String(message.into()))
    }

    pub fn userinfo(display_name: impl Into<String>) -> Self {
        Self::plain("Userinfo", Value::String(display_name.into()))
    }

    pub fn camera_list(rooms: Vec<CameraRoom>) -> Self {
        Self::plain("CameraList", serde_json::json!({ "Rooms": rooms }))
    }

    pub fn change_room_content(room_id: u64, cameras: &Value) -> Self {
        Self::plain(
            "ChangeRoomContent",
            serde_json::json!({ "Id": room_id, "Cameras": cameras }),
        )
    }

    pub fn response(to: impl Into<String>, content: Value) -> Self {
        Self {
            r#type: "Response",
            content: Some(content),
            from: None,
            to: Some(to.into()),
        }
    }

    pub fn room_offline(room_id: u64) -> Self {
        Self::plain("RoomOffline", serde_json::json!(room_id))
    }

    pub fn chat(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            r#type: "Chat",
            content: Some(Value::String(content.into())),
            from: Some(from.into()),
            to: None,
        }
    }

    pub fn accepted() -> Self {
        Self {
            r#type: "Accepted",
            content: None,
            from: None,
            to: None,
        }
    }
}

/// What actually travels down a viewer's outbound queue: either a frame this
/// crate built (`Typed`), or a room's `ResponseToMany` payload relayed
/// verbatim — the hub never parses or re-wraps it, per spec.md's "opaque
/// frame" routing.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToViewerFrame {
    Typed(ToViewer),
    Raw(Value),
}

impl From<ToViewer> for ToViewerFrame {
    fn from(frame: ToViewer) -> Self {
        ToViewerFrame::Typed(frame)
    }
}

impl From<Value> for ToViewerFrame {
    fn from(value: Value) -> Self {
        ToViewerFrame::Raw(value)
    }
}

/// One entry in a `CameraList` snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CameraRoom {
    #[serde(rename = "Id")]
    pub id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "IsOwner")]
    pub is_owner: bool,
    /// The room's ipcams blob verbatim when online, an empty array when
    /// offline — not normalized to a list, just passed through.
    #[serde(rename = "Cameras")]
    pub cameras: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_ok_shape() {
        let json = serde_json::to_value(ToViewer::login_ok()).unwrap();
        assert_eq!(json["type"], "Login");
        assert_eq!(json["content"], 1);
        assert!(json.get("from").is_none());
    }

    #[test]
    fn response_carries_to_and_content() {
        let json = serde_json::to_value(ToViewer::response(
            "ManageSetRoomName",
            serde_json::json!({"id": 1, "name": "Home"}),
        ))
        .unwrap();
        assert_eq!(json["type"], "Response");
        assert_eq!(json["to"], "ManageSetRoomName");
        assert_eq!(json["content"]["name"], "Home");
    }

    #[test]
    fn chat_carries_from() {
        let json = serde_json::to_value(ToViewer::chat("Alice", "hello")).unwrap();
        assert_eq!(json["from"], "Alice");
        assert_eq!(json["content"], "hello");
    }
}
