use thiserror::Error;

/// Failure to parse a raw text frame off the wire.
///
/// `BadFrame` is never fatal to the connection: callers log it and drop the
/// single frame, per the spec's panic-recovery-by-frame design.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame has no recognized `side:type:payload` shape")]
    Malformed,
    #[error("unknown frame type: {0}")]
    UnknownType(String),
    #[error("missing sub-field in payload: {0}")]
    MissingSubField(&'static str),
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid integer field: {0}")]
    Int(#[from] std::num::ParseIntError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
