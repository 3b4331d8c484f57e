//! Persistence for accounts, rooms, viewership edges and OAuth credentials —
//! everything the hub treats as an external store rather than hub state.

pub mod error;
pub mod models;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use models::{Account, OauthCredential, OauthProvider, Room, generate_secret_address, ipcams_value};

use async_trait::async_trait;

/// Storage surface the hub and gateway depend on. Mirrors the shape of an
/// ORM-backed account service: callers pass/receive plain data, all
/// ownership and viewership checks happen in the store's queries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Enabled OAuth providers, for the sign-in provider list.
    async fn find_oauth_providers(&self) -> Result<Vec<OauthProvider>>;

    /// Resolve `(provider, external id)` to an account, creating both the
    /// credential and the account on first sign-in.
    async fn on_oid(&self, provider: &str, oid: &str) -> Result<OauthCredential>;

    /// Fetch the account an already-resolved credential belongs to.
    async fn account_by_id(&self, account_id: i64) -> Result<Account>;

    /// Hard-delete an account and everything it owns.
    async fn logoff(&self, account_id: i64) -> Result<()>;

    /// Rooms an account can view (owned or shared), for the `CameraList`
    /// snapshot and the `OnJoin` roster walk.
    async fn rooms_visible_to(&self, account_id: i64) -> Result<Vec<Room>>;

    /// Create a new room owned by `account_id`, attaching the owner as a
    /// viewer too. Returns the persisted room with its fresh secret address.
    async fn create_room(&self, account_id: i64, name: &str) -> Result<Room>;

    /// Look a room up by id, asserting it's owned by `owner_id` — the guard
    /// used by owner-only commands.
    async fn find_room_if_owner(&self, id: i64, owner_id: i64) -> Result<Room>;

    /// Look a room up by its `(id, owner_id)` tuple for login verification;
    /// `None` rather than an error when the tuple doesn't match, since a
    /// failed login is not exceptional.
    async fn find_room_for_login(&self, id: i64, owner_id: i64) -> Result<Option<Room>>;

    /// Look a room up by id alone, with no ownership constraint — used to
    /// read the persisted camera-list blob for a room the caller already
    /// knows the id of.
    async fn find_room(&self, id: i64) -> Result<Option<Room>>;

    async fn rename_room(&self, id: i64, name: &str) -> Result<()>;

    async fn delete_room(&self, id: i64) -> Result<()>;

    /// Persist the room's latest camera-list blob.
    async fn save_ipcams(&self, id: i64, ipcams: &serde_json::Value) -> Result<()>;

    /// Account ids with a viewership edge to this room (owner included).
    async fn viewers_of_room(&self, room_id: i64) -> Result<Vec<i64>>;

    /// True if `account_id` has a viewership edge to `room_id`.
    async fn can_view(&self, account_id: i64, room_id: i64) -> Result<bool>;

    /// Every OAuth credential bound to an account, for the account-settings
    /// "connected providers" list.
    async fn credentials_of_account(&self, account_id: i64) -> Result<Vec<OauthCredential>>;

    /// Attach a validated `(provider, external id)` credential to an
    /// already-authenticated account, used by the "associate another
    /// provider" flow rather than `on_oid`'s create-or-fetch-fresh-account
    /// behavior.
    async fn associate_credential(&self, account_id: i64, provider: &str, oid: &str) -> Result<()>;

    /// Detach one provider credential from an account. Refuses to remove the
    /// account's last remaining credential — an account must always stay
    /// reachable by at least one provider.
    async fn unassociate_credential(&self, account_id: i64, provider: &str) -> Result<()>;
}
