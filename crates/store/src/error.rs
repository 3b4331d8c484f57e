use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("room {0} not found")]
    RoomNotFound(i64),

    #[error("account {account_id} is not the owner of room {room_id}")]
    NotOwner { account_id: i64, room_id: i64 },

    #[error("account {0} has no credential for provider {1}")]
    CredentialNotFound(i64, String),

    #[error("account {0} cannot unassociate its last remaining OAuth credential")]
    LastCredential(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;
