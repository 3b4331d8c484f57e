use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{
    Account, OauthCredential, OauthProvider, Result, Room, Store, StoreError,
    models::generate_secret_address,
};

/// SQLite-backed [`Store`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let store = Self { pool };
        store.init().await?;
        tracing::debug!("store: schema ready");
        Ok(store)
    }

    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rooms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                secret_address TEXT NOT NULL UNIQUE,
                ipcams TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS room_viewers (
                room_id INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                PRIMARY KEY (room_id, account_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS oauth_credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                provider TEXT NOT NULL,
                oid TEXT NOT NULL,
                validated INTEGER NOT NULL DEFAULT 1,
                enabled INTEGER NOT NULL DEFAULT 1,
                UNIQUE (provider, oid)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS oauth_providers (
                provider TEXT PRIMARY KEY,
                enabled INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_oauth_providers(&self) -> Result<Vec<OauthProvider>> {
        let rows = sqlx::query_as::<_, OauthProvider>(
            "SELECT provider, enabled FROM oauth_providers WHERE enabled = 1",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn on_oid(&self, provider: &str, oid: &str) -> Result<OauthCredential> {
        if let Some(existing) = sqlx::query_as::<_, OauthCredential>(
            "SELECT id, account_id, provider, oid, validated, enabled
             FROM oauth_credentials WHERE provider = ? AND oid = ?",
        )
        .bind(provider)
        .bind(oid)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(existing);
        }

        let mut tx = self.pool.begin().await?;
        let account_id: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (name, enabled) VALUES (?, 1) RETURNING id",
        )
        .bind(format!("{provider}:{oid}"))
        .fetch_one(&mut *tx)
        .await?;

        let credential_id: i64 = sqlx::query_scalar(
            "INSERT INTO oauth_credentials (account_id, provider, oid, validated, enabled)
             VALUES (?, ?, ?, 1, 1) RETURNING id",
        )
        .bind(account_id)
        .bind(provider)
        .bind(oid)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(OauthCredential {
            id: credential_id,
            account_id,
            provider: provider.to_string(),
            oid: oid.to_string(),
            validated: true,
            enabled: true,
        })
    }

    async fn account_by_id(&self, account_id: i64) -> Result<Account> {
        sqlx::query_as::<_, Account>("SELECT id, name, enabled FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::AccountNotFound(account_id))
    }

    async fn logoff(&self, account_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rooms_visible_to(&self, account_id: i64) -> Result<Vec<Room>> {
        let rows = sqlx::query_as::<_, Room>(
            "SELECT r.id, r.owner_id, r.name, r.secret_address, r.ipcams
             FROM rooms r
             JOIN room_viewers v ON v.room_id = r.id
             WHERE v.account_id = ?
             ORDER BY r.id",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_room(&self, account_id: i64, name: &str) -> Result<Room> {
        let secret_address = generate_secret_address();
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO rooms (owner_id, name, secret_address, ipcams)
             VALUES (?, ?, ?, NULL) RETURNING id",
        )
        .bind(account_id)
        .bind(name)
        .bind(&secret_address)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO room_viewers (room_id, account_id) VALUES (?, ?)")
            .bind(id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Room {
            id,
            owner_id: account_id,
            name: name.to_string(),
            secret_address,
            ipcams: None,
        })
    }

    async fn find_room_if_owner(&self, id: i64, owner_id: i64) -> Result<Room> {
        sqlx::query_as::<_, Room>(
            "SELECT id, owner_id, name, secret_address, ipcams
             FROM rooms WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotOwner {
            account_id: owner_id,
            room_id: id,
        })
    }

    async fn find_room_for_login(&self, id: i64, owner_id: i64) -> Result<Option<Room>> {
        let row = sqlx::query_as::<_, Room>(
            "SELECT id, owner_id, name, secret_address, ipcams
             FROM rooms WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_room(&self, id: i64) -> Result<Option<Room>> {
        let row = sqlx::query_as::<_, Room>(
            "SELECT id, owner_id, name, secret_address, ipcams FROM rooms WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn rename_room(&self, id: i64, name: &str) -> Result<()> {
        sqlx::query("UPDATE rooms SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_room(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_ipcams(&self, id: i64, ipcams: &serde_json::Value) -> Result<()> {
        sqlx::query("UPDATE rooms SET ipcams = ? WHERE id = ?")
            .bind(ipcams.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn viewers_of_room(&self, room_id: i64) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT account_id FROM room_viewers WHERE room_id = ?")
                .bind(room_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn can_view(&self, account_id: i64, room_id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM room_viewers WHERE room_id = ? AND account_id = ?",
        )
        .bind(room_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn credentials_of_account(&self, account_id: i64) -> Result<Vec<OauthCredential>> {
        let rows = sqlx::query_as::<_, OauthCredential>(
            "SELECT id, account_id, provider, oid, validated, enabled
             FROM oauth_credentials WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn associate_credential(&self, account_id: i64, provider: &str, oid: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO oauth_credentials (account_id, provider, oid, validated, enabled)
             VALUES (?, ?, ?, 1, 1)
             ON CONFLICT (provider, oid) DO UPDATE SET account_id = excluded.account_id",
        )
        .bind(account_id)
        .bind(provider)
        .bind(oid)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unassociate_credential(&self, account_id: i64, provider: &str) -> Result<()> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM oauth_credentials WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        if count <= 1 {
            return Err(StoreError::LastCredential(account_id));
        }

        let result = sqlx::query(
            "DELETE FROM oauth_credentials WHERE account_id = ? AND provider = ?",
        )
        .bind(account_id)
        .bind(provider)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::CredentialNotFound(account_id, provider.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn on_oid_creates_account_on_first_sign_in() {
        let store = memory_store().await;
        let cred = store.on_oid("google", "oid-1").await.unwrap();
        assert!(cred.validated);

        let again = store.on_oid("google", "oid-1").await.unwrap();
        assert_eq!(cred.account_id, again.account_id);
    }

    #[tokio::test]
    async fn create_room_attaches_owner_as_viewer() {
        let store = memory_store().await;
        let cred = store.on_oid("google", "oid-2").await.unwrap();
        let room = store.create_room(cred.account_id, "Home").await.unwrap();
        assert_eq!(room.secret_address.len(), camrelay_protocol::SECRET_ADDRESS_LEN);
        assert!(store.can_view(cred.account_id, room.id).await.unwrap());
    }

    #[tokio::test]
    async fn find_room_for_login_requires_owner_match() {
        let store = memory_store().await;
        let cred = store.on_oid("google", "oid-3").await.unwrap();
        let room = store.create_room(cred.account_id, "Home").await.unwrap();

        assert!(
            store
                .find_room_for_login(room.id, cred.account_id + 1)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_room_for_login(room.id, cred.account_id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn logoff_cascades_room_deletion() {
        let store = memory_store().await;
        let cred = store.on_oid("google", "oid-4").await.unwrap();
        let room = store.create_room(cred.account_id, "Home").await.unwrap();
        store.logoff(cred.account_id).await.unwrap();
        assert!(store.find_room_if_owner(room.id, cred.account_id).await.is_err());
    }

    #[tokio::test]
    async fn associate_credential_attaches_to_existing_account() {
        let store = memory_store().await;
        let google = store.on_oid("google", "oid-7").await.unwrap();
        store.associate_credential(google.account_id, "github", "gh-7").await.unwrap();

        let creds = store.credentials_of_account(google.account_id).await.unwrap();
        assert_eq!(creds.len(), 2);
        assert!(creds.iter().any(|c| c.provider == "github" && c.oid == "gh-7"));
    }

    #[tokio::test]
    async fn unassociate_removes_one_of_several_credentials() {
        let store = memory_store().await;
        let google = store.on_oid("google", "oid-5").await.unwrap();
        sqlx::query(
            "INSERT INTO oauth_credentials (account_id, provider, oid, validated, enabled)
             VALUES (?, 'github', 'gh-5', 1, 1)",
        )
        .bind(google.account_id)
        .execute(&store.pool)
        .await
        .unwrap();

        store.unassociate_credential(google.account_id, "github").await.unwrap();
        let remaining = store.credentials_of_account(google.account_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].provider, "google");
    }

    #[tokio::test]
    async fn unassociate_refuses_last_remaining_credential() {
        let store = memory_store().await;
        let cred = store.on_oid("google", "oid-6").await.unwrap();
        let result = store.unassociate_credential(cred.account_id, "google").await;
        assert!(matches!(result, Err(StoreError::LastCredential(_))));
    }
}
