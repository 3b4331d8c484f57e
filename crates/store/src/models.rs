use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A human user. Created on first successful OAuth sign-in, destroyed only
/// by the account's own logoff.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
}

/// A camera site ("One"). `secret_address` is the HMAC key for this room's
/// login JWT; `ipcams` is the last camera-list blob the room reported,
/// persisted so a `CameraList` request can still describe offline rooms by
/// name even though their camera set is stale.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub secret_address: String,
    pub ipcams: Option<String>,
}

/// A registered OAuth identity provider, enabled for sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OauthProvider {
    pub provider: String,
    pub enabled: bool,
}

/// A validated `(provider, external id)` pair bound to an account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OauthCredential {
    pub id: i64,
    pub account_id: i64,
    pub provider: String,
    pub oid: String,
    pub validated: bool,
    pub enabled: bool,
}

/// Generate a fresh 36-character alphanumeric secret address for a new room.
pub fn generate_secret_address() -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..camrelay_protocol::SECRET_ADDRESS_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Parse a room's stored camera-list blob, defaulting to an empty object
/// for rooms that have never reported cameras.
pub fn ipcams_value(room: &Room) -> Value {
    room.ipcams
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_else(|| Value::Object(Default::default()))
}
