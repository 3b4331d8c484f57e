//! Verifies and mints the three JWT kinds the relay uses: the viewer bearer
//! token, the room login token, and the room registration token (which is
//! just a viewer bearer token presented in a different context).

mod claims;
mod error;

pub use claims::{RoomLoginClaims, ViewerClaims};
pub use error::{AuthError, Result};

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use camrelay_protocol::VIEWER_JWT_KID;
use camrelay_store::{Room, Store};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use secrecy::{ExposeSecret, Secret};

/// Refresh threshold for viewer bearer tokens: the API re-mints a token
/// whose `exp` is closer than this to now.
pub const VIEWER_TOKEN_REFRESH_WINDOW: Duration = Duration::from_secs(30 * 60);

pub struct AuthVerifier {
    viewer_secret: Secret<String>,
    store: Arc<dyn Store>,
}

impl AuthVerifier {
    pub fn new(viewer_secret: Secret<String>, store: Arc<dyn Store>) -> Self {
        Self {
            viewer_secret,
            store,
        }
    }

    /// Mint a viewer bearer token for an already-resolved OAuth identity.
    pub fn mint_viewer_token(&self, account_id: i64, provider: &str, oid: &str) -> Result<String> {
        let exp = now_unix() + VIEWER_TOKEN_REFRESH_WINDOW.as_secs() as i64 * 2;
        let claims = ViewerClaims {
            account_id,
            provider: provider.to_string(),
            oid: oid.to_string(),
            exp,
        };
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(VIEWER_JWT_KID.to_string());
        let key = EncodingKey::from_secret(self.viewer_secret.expose_secret().as_bytes());
        Ok(encode(&header, &claims, &key)?)
    }

    /// Verify a viewer bearer token, checking the `kid` header and signature.
    /// Returns the claims; the caller decides whether `exp` warrants a
    /// refresh via [`needs_refresh`].
    pub fn verify_viewer_token(&self, token: &str) -> Result<ViewerClaims> {
        let header = jsonwebtoken::decode_header(token)?;
        if header.kid.as_deref() != Some(VIEWER_JWT_KID) {
            return Err(AuthError::WrongKid(VIEWER_JWT_KID));
        }
        let key = DecodingKey::from_secret(self.viewer_secret.expose_secret().as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<ViewerClaims>(token, &key, &validation)?;
        Ok(data.claims)
    }

    /// Verify a room registration token. Identical to viewer verification —
    /// only an authenticated human may birth a room on their account.
    pub fn verify_registration_token(&self, token: &str) -> Result<ViewerClaims> {
        self.verify_viewer_token(token)
    }

    /// Verify a room login token. The signing key is the claimed room's own
    /// secret address, so the claims must be read (with signature checking
    /// disabled) before the real key is known; the subsequent full decode
    /// with that key is what actually authenticates the room.
    pub async fn verify_room_login(&self, token: &str) -> Result<Room> {
        let mut peek = Validation::new(Algorithm::HS256);
        peek.insecure_disable_signature_validation();
        peek.validate_exp = false;
        peek.required_spec_claims.clear();
        let peeked = decode::<RoomLoginClaims>(token, &DecodingKey::from_secret(&[]), &peek)?;

        let room = self
            .store
            .find_room_for_login(peeked.claims.rid, peeked.claims.aid)
            .await?
            .ok_or(AuthError::RoomNotFound)?;

        let key = DecodingKey::from_secret(room.secret_address.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<RoomLoginClaims>(token, &key, &validation)?;

        Ok(room)
    }

    /// Sign a fresh room login JWT under `room`'s own secret address, the
    /// token returned to a room from `RegRoom`.
    pub fn mint_room_login_token(&self, room: &Room) -> Result<String> {
        let claims = RoomLoginClaims {
            rid: room.id,
            aid: room.owner_id,
            iat: now_unix(),
            rnd: random_nonce(),
        };
        let key = EncodingKey::from_secret(room.secret_address.as_bytes());
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
    }
}

/// True if `exp` (unix seconds) is within the refresh window of now.
pub fn needs_refresh(exp: i64) -> bool {
    exp - now_unix() < VIEWER_TOKEN_REFRESH_WINDOW.as_secs() as i64
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn random_nonce() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..16)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use camrelay_store::{Account, OauthCredential, OauthProvider, Room, Store, StoreError};

    use super::*;

    struct FakeStore {
        room: Room,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn find_oauth_providers(&self) -> camrelay_store::Result<Vec<OauthProvider>> {
            Ok(vec![])
        }
        async fn on_oid(&self, _provider: &str, _oid: &str) -> camrelay_store::Result<OauthCredential> {
            unimplemented!()
        }
        async fn account_by_id(&self, _account_id: i64) -> camrelay_store::Result<Account> {
            unimplemented!()
        }
        async fn logoff(&self, _account_id: i64) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn rooms_visible_to(&self, _account_id: i64) -> camrelay_store::Result<Vec<Room>> {
            Ok(vec![])
        }
        async fn create_room(&self, _account_id: i64, _name: &str) -> camrelay_store::Result<Room> {
            unimplemented!()
        }
        async fn find_room_if_owner(&self, _id: i64, _owner_id: i64) -> camrelay_store::Result<Room> {
            unimplemented!()
        }
        async fn find_room_for_login(
            &self,
            id: i64,
            owner_id: i64,
        ) -> camrelay_store::Result<Option<Room>> {
            if id == self.room.id && owner_id == self.room.owner_id {
                Ok(Some(self.room.clone()))
            } else {
                Ok(None)
            }
        }
        async fn find_room(&self, _id: i64) -> camrelay_store::Result<Option<Room>> {
            unimplemented!()
        }
        async fn rename_room(&self, _id: i64, _name: &str) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn delete_room(&self, _id: i64) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn save_ipcams(&self, _id: i64, _ipcams: &serde_json::Value) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn viewers_of_room(&self, _room_id: i64) -> camrelay_store::Result<Vec<i64>> {
            Ok(vec![])
        }
        async fn can_view(&self, _account_id: i64, _room_id: i64) -> camrelay_store::Result<bool> {
            Ok(true)
        }
        async fn credentials_of_account(
            &self,
            _account_id: i64,
        ) -> camrelay_store::Result<Vec<OauthCredential>> {
            unimplemented!()
        }
        async fn associate_credential(
            &self,
            _account_id: i64,
            _provider: &str,
            _oid: &str,
        ) -> camrelay_store::Result<()> {
            unimplemented!()
        }
        async fn unassociate_credential(&self, _account_id: i64, _provider: &str) -> camrelay_store::Result<()> {
            unimplemented!()
        }
    }

    fn verifier_with_room(room: Room) -> (AuthVerifier, Room) {
        let store: Arc<dyn Store> = Arc::new(FakeStore { room: room.clone() });
        (
            AuthVerifier::new(Secret::new("viewer-secret".to_string()), store),
            room,
        )
    }

    #[test]
    fn viewer_token_round_trips() {
        let store: Arc<dyn Store> = Arc::new(FakeStore {
            room: Room {
                id: 1,
                owner_id: 1,
                name: "x".into(),
                secret_address: "s".repeat(36),
                ipcams: None,
            },
        });
        let verifier = AuthVerifier::new(Secret::new("viewer-secret".to_string()), store);
        let token = verifier.mint_viewer_token(7, "google", "oid-1").unwrap();
        let claims = verifier.verify_viewer_token(&token).unwrap();
        assert_eq!(claims.account_id, 7);
        assert!(!needs_refresh(claims.exp + VIEWER_TOKEN_REFRESH_WINDOW.as_secs() as i64));
    }

    #[test]
    fn wrong_kid_is_rejected() {
        let store: Arc<dyn Store> = Arc::new(FakeStore {
            room: Room {
                id: 1,
                owner_id: 1,
                name: "x".into(),
                secret_address: "s".repeat(36),
                ipcams: None,
            },
        });
        let verifier = AuthVerifier::new(Secret::new("viewer-secret".to_string()), store);
        let claims = ViewerClaims {
            account_id: 1,
            provider: "google".into(),
            oid: "oid".into(),
            exp: now_unix() + 3600,
        };
        let key = EncodingKey::from_secret(b"viewer-secret");
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("wrong".to_string());
        let token = encode(&header, &claims, &key).unwrap();
        assert!(matches!(
            verifier.verify_viewer_token(&token),
            Err(AuthError::WrongKid(_))
        ));
    }

    #[tokio::test]
    async fn room_login_round_trips_with_room_secret() {
        let room = Room {
            id: 42,
            owner_id: 7,
            name: "Home".into(),
            secret_address: "r".repeat(36),
            ipcams: None,
        };
        let (verifier, room) = verifier_with_room(room);
        let token = verifier.mint_room_login_token(&room).unwrap();
        let resolved = verifier.verify_room_login(&token).await.unwrap();
        assert_eq!(resolved.id, room.id);
        assert_eq!(resolved.owner_id, room.owner_id);
    }

    #[tokio::test]
    async fn room_login_fails_for_unknown_room() {
        let room = Room {
            id: 42,
            owner_id: 7,
            name: "Home".into(),
            secret_address: "r".repeat(36),
            ipcams: None,
        };
        let (verifier, _room) = verifier_with_room(room);
        let other = Room {
            id: 99,
            owner_id: 7,
            name: "Other".into(),
            secret_address: "q".repeat(36),
            ipcams: None,
        };
        let token = verifier.mint_room_login_token(&other).unwrap();
        assert!(verifier.verify_room_login(&token).await.is_err());
    }
}
