use std::time::Duration;

/// Time allowed to write a single frame to a peer before the connection is closed.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between keepalive pings sent to viewer connections.
pub const VIEWER_PING_PERIOD: Duration = Duration::from_secs(30);

/// How long a signaling rendezvous slot stays reachable by nonce.
pub const SIGNALING_TTL: Duration = Duration::from_secs(15);

/// Capacity of each connection's outbound frame queue. Overflow closes the connection.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Length in characters of a freshly generated room secret address.
pub const SECRET_ADDRESS_LEN: usize = 36;

/// Minimum entropy, in bytes, required of a viewer-generated signaling nonce.
pub const MIN_NONCE_ENTROPY_BYTES: usize = 16;

/// `kid` header value required on viewer bearer JWTs.
pub const VIEWER_JWT_KID: &str = "many";
