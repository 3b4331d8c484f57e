use serde::{Deserialize, Serialize};

/// Claims carried by a viewer bearer JWT, signed under `SK_MANY`. `account_id`,
/// like every numeric claim in this system, arrives as an untyped JSON number;
/// deserializing straight into `i64` rejects any non-integral coercion for us.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerClaims {
    pub account_id: i64,
    pub provider: String,
    pub oid: String,
    pub exp: i64,
}

/// Claims carried by a room login JWT, signed under that room's own secret
/// address. No `exp` — rooms are long-lived daemons and re-authenticate on
/// every reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomLoginClaims {
    pub rid: i64,
    pub aid: i64,
    pub iat: i64,
    pub rnd: String,
}
