use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token header kid must be {0:?}")]
    WrongKid(&'static str),

    #[error("room not found for claimed (rid, aid)")]
    RoomNotFound,

    #[error(transparent)]
    Store(#[from] camrelay_store::StoreError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
