//! Parsing and formatting for the textual control frames exchanged on the
//! room and viewer control sockets.
//!
//! Every inbound frame has the shape `<side>:<type>:<payload>`, split on `:`
//! at most three times so payloads may themselves contain colons. `<side>`
//! is the literal `many` (viewer) or `one` (room).

use serde::Deserialize;

use crate::error::{FrameError, Result};

/// Split `text` into exactly `side`, `type`, `payload`, rejecting frames with
/// fewer than three colon-delimited fields.
fn split3(text: &str) -> Result<(&str, &str, &str)> {
    let mut parts = text.splitn(3, ':');
    let side = parts.next().ok_or(FrameError::Malformed)?;
    let typ = parts.next().ok_or(FrameError::Malformed)?;
    let payload = parts.next().ok_or(FrameError::Malformed)?;
    Ok((side, typ, payload))
}

/// Split a payload on the first `:` only, used for the nested
/// `<token>:<json>` and `<viewerId>:<opaque>` sub-payloads.
fn split1(payload: &str, field: &'static str) -> Result<(&str, &str)> {
    let mut parts = payload.splitn(2, ':');
    let a = parts.next().ok_or(FrameError::MissingSubField(field))?;
    let b = parts.next().ok_or(FrameError::MissingSubField(field))?;
    Ok((a, b))
}

// ── Viewer → server ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ChatPayload {
    pub room: u64,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandPayload {
    pub room: u64,
    pub name: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum ManyFrame {
    Chat(ChatPayload),
    Command(CommandPayload),
    GetManyData(String),
}

/// Parse a `many:<type>:<payload>` frame. The leading `many` literal is
/// accepted but not otherwise checked — the socket only ever carries one side.
pub fn parse_many_frame(text: &str) -> Result<ManyFrame> {
    let (_side, typ, payload) = split3(text)?;
    match typ {
        "Chat" => Ok(ManyFrame::Chat(serde_json::from_str(payload)?)),
        "Command" => Ok(ManyFrame::Command(serde_json::from_str(payload)?)),
        "GetManyData" => Ok(ManyFrame::GetManyData(payload.to_string())),
        other => Err(FrameError::UnknownType(other.to_string())),
    }
}

// ── Room → server ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum OneFrame {
    Login(String),
    RegRoom { reg_token: String, name: String },
    Ipcams(serde_json::Value),
    ResponseToMany { viewer_id: u64, opaque: serde_json::Value },
    ServerCommand(ServerCommandPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerCommandPayload {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RegRoomData {
    name: String,
}

/// Parse a `one:<type>:<payload>` frame.
pub fn parse_one_frame(text: &str) -> Result<OneFrame> {
    let (_side, typ, payload) = split3(text)?;
    match typ {
        "Login" => Ok(OneFrame::Login(payload.to_string())),
        "RegRoom" => {
            let (reg_token, json) = split1(payload, "RegRoom")?;
            let data: RegRoomData = serde_json::from_str(json)?;
            Ok(OneFrame::RegRoom {
                reg_token: reg_token.to_string(),
                name: data.name,
            })
        },
        "Ipcams" => Ok(OneFrame::Ipcams(serde_json::from_str(payload)?)),
        "ResponseToMany" => {
            let (viewer_id, opaque) = split1(payload, "ResponseToMany")?;
            Ok(OneFrame::ResponseToMany {
                viewer_id: viewer_id.parse()?,
                opaque: serde_json::from_str(opaque)?,
            })
        },
        "ServerCommand" => Ok(OneFrame::ServerCommand(serde_json::from_str(payload)?)),
        other => Err(FrameError::UnknownType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat() {
        let frame = parse_many_frame(r#"many:Chat:{"room":42,"content":"hi"}"#).unwrap();
        match frame {
            ManyFrame::Chat(c) => {
                assert_eq!(c.room, 42);
                assert_eq!(c.content, "hi");
            },
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_get_many_data_bare_string() {
        let frame = parse_many_frame("many:GetManyData:CameraList").unwrap();
        match frame {
            ManyFrame::GetManyData(name) => assert_eq!(name, "CameraList"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn rejects_frames_with_too_few_fields() {
        assert!(parse_many_frame("many:Chat").is_err());
        assert!(parse_one_frame("one:Login").is_err());
        assert!(parse_one_frame("one:Login:").is_ok()); // payload empty string still 3 fields
        assert!(parse_one_frame("oneLogin").is_err());
    }

    #[test]
    fn parses_reg_room_nested_payload() {
        let frame = parse_one_frame(r#"one:RegRoom:tok123:{"name":"Home"}"#).unwrap();
        match frame {
            OneFrame::RegRoom { reg_token, name } => {
                assert_eq!(reg_token, "tok123");
                assert_eq!(name, "Home");
            },
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_response_to_many_nested_payload() {
        let frame = parse_one_frame(r#"one:ResponseToMany:7:{"sdp":"..."}"#).unwrap();
        match frame {
            OneFrame::ResponseToMany { viewer_id, opaque } => {
                assert_eq!(viewer_id, 7);
                assert_eq!(opaque["sdp"], "...");
            },
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_type_is_bad_frame_not_panic() {
        assert!(matches!(
            parse_many_frame("many:Bogus:{}"),
            Err(FrameError::UnknownType(_))
        ));
    }
}
