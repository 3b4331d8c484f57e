//! Shared application state handed to every axum handler: the hub, the
//! store, the auth verifier, and the OAuth flows configured for sign-in.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::extract::ws::WebSocket;
use camrelay_auth::AuthVerifier;
use camrelay_hub::Hub;
use camrelay_oauth::OAuthFlow;
use camrelay_store::Store;
use tokio::sync::Mutex;

/// How long a `state` parameter from an in-flight OAuth redirect stays
/// redeemable. Generous enough for a slow sign-in page, short enough that an
/// abandoned flow doesn't linger in memory.
const PENDING_OAUTH_TTL: Duration = Duration::from_secs(10 * 60);

/// Bookkeeping for one outstanding `OAuthFlow::start` round trip, parked
/// under its `state` value until the provider redirects back.
pub struct PendingOAuth {
    pub provider: String,
    pub verifier: String,
    /// `Some(account_id)` when this flow is associating a provider with an
    /// already-authenticated account rather than signing in fresh.
    pub associate_account_id: Option<i64>,
    created_at: Instant,
}

/// Everything a request handler needs, cloned cheaply per request the way
/// axum's `State` extractor expects.
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    pub hub: Hub<WebSocket>,
    pub store: Arc<dyn Store>,
    pub auth: AuthVerifier,
    /// OAuth flows for sign-in, keyed by provider name (`google`, `github`, …).
    pub oauth_flows: HashMap<String, OAuthFlow>,
    pub cors_origins: Vec<String>,
    pending_oauth: Mutex<HashMap<String, PendingOAuth>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        auth: AuthVerifier,
        oauth_flows: HashMap<String, OAuthFlow>,
        cors_origins: Vec<String>,
    ) -> Self {
        Self(Arc::new(Inner {
            hub: Hub::new(Arc::clone(&store)),
            store,
            auth,
            oauth_flows,
            cors_origins,
            pending_oauth: Mutex::new(HashMap::new()),
        }))
    }

    pub fn hub(&self) -> &Hub<WebSocket> {
        &self.0.hub
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.0.store
    }

    pub fn auth(&self) -> &AuthVerifier {
        &self.0.auth
    }

    pub fn oauth_flow(&self, provider: &str) -> Option<&OAuthFlow> {
        self.0.oauth_flows.get(provider)
    }

    pub fn oauth_providers(&self) -> impl Iterator<Item = &str> {
        self.0.oauth_flows.keys().map(String::as_str)
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.0.cors_origins
    }

    /// Park a PKCE verifier under the `state` the caller will see again on
    /// the callback, pruning anything that's aged out while we're in here.
    pub async fn register_pending_oauth(
        &self,
        state: String,
        provider: String,
        verifier: String,
        associate_account_id: Option<i64>,
    ) {
        let mut pending = self.0.pending_oauth.lock().await;
        pending.retain(|_, p| p.created_at.elapsed() < PENDING_OAUTH_TTL);
        pending.insert(
            state,
            PendingOAuth {
                provider,
                verifier,
                associate_account_id,
                created_at: Instant::now(),
            },
        );
    }

    /// Redeem (and remove) a pending flow by its `state` value. `None` for an
    /// unknown or expired state — the caller should treat it as a bad
    /// callback request, not panic.
    pub async fn take_pending_oauth(&self, state: &str) -> Option<PendingOAuth> {
        let mut pending = self.0.pending_oauth.lock().await;
        let entry = pending.remove(state)?;
        if entry.created_at.elapsed() >= PENDING_OAUTH_TTL {
            return None;
        }
        Some(entry)
    }
}
