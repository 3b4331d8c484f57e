//! Plain HTTP account-management routes: OAuth sign-in and provider
//! association, viewer-token check/refresh, logoff, the enabled-provider
//! list, and the static system-data blob.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use camrelay_auth::needs_refresh;
use camrelay_protocol::{SIGNALING_TTL, VIEWER_PING_PERIOD};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::AppState;

/// Pull a bearer token out of `Authorization: Bearer <token>`. Hand-rolled
/// rather than `axum-extra`'s typed header since this workspace only enables
/// its `cookie` feature.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authenticated_account(state: &AppState, headers: &HeaderMap) -> Option<i64> {
    let token = bearer_token(headers)?;
    state.auth().verify_viewer_token(token).ok().map(|claims| claims.account_id)
}

#[derive(Serialize)]
struct ProviderEntry {
    provider: String,
}

/// `GET /api/providers` — enabled OAuth providers, for the sign-in page.
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    match state.store().find_oauth_providers().await {
        Ok(providers) => Json(
            providers
                .into_iter()
                .filter(|p| p.enabled)
                .map(|p| ProviderEntry { provider: p.provider })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(error) => {
            warn!(%error, "http: find_oauth_providers failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

const SYSTEM_DATA_ETAG: &str = "sys-data";

/// `GET /api/system-data` — long-cached protocol constants the frontend
/// needs before it ever opens a socket. Short-circuits to `304` when the
/// client already has `sys-data` cached.
pub async fn system_data(headers: HeaderMap) -> impl IntoResponse {
    let etag = HeaderValue::from_static(SYSTEM_DATA_ETAG);
    let cache_control = HeaderValue::from_static("max-age=2592000");

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(SYSTEM_DATA_ETAG));
    if not_modified {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        response.headers_mut().insert(header::ETAG, etag);
        response.headers_mut().insert(header::CACHE_CONTROL, cache_control);
        return response;
    }

    let body = serde_json::json!({
        "signalingTtlSecs": SIGNALING_TTL.as_secs(),
        "viewerPingPeriodSecs": VIEWER_PING_PERIOD.as_secs(),
    });
    let mut response: Response = Json(body).into_response();
    response.headers_mut().insert(header::ETAG, etag);
    response.headers_mut().insert(header::CACHE_CONTROL, cache_control);
    response
}

#[derive(Deserialize, Default)]
pub struct StartOAuthQuery {
    #[serde(default)]
    associate: bool,
}

#[derive(Serialize)]
struct StartOAuthResponse {
    url: String,
}

/// `GET /api/oauth/:provider/start` — begins a sign-in flow, or (with
/// `?associate=true` and a valid bearer token) an associate-provider flow.
pub async fn start_oauth(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<StartOAuthQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(flow) = state.oauth_flow(&provider) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let associate_account_id = if query.associate {
        match authenticated_account(&state, &headers).await {
            Some(account_id) => Some(account_id),
            None => return StatusCode::UNAUTHORIZED.into_response(),
        }
    } else {
        None
    };

    let request = match flow.start() {
        Ok(request) => request,
        Err(error) => {
            warn!(%error, provider, "http: oauth start failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        },
    };

    state
        .register_pending_oauth(
            request.state.clone(),
            provider,
            request.pkce.verifier.clone(),
            associate_account_id,
        )
        .await;

    Json(StartOAuthResponse { url: request.url }).into_response()
}

#[derive(Deserialize)]
pub struct OAuthCallbackQuery {
    code: String,
    state: String,
}

#[derive(Serialize)]
struct OAuthCallbackResponse {
    token: String,
}

/// `GET /api/oauth/:provider/callback` — redeems the pending flow parked at
/// `start`, exchanges the code, and either mints a fresh viewer token
/// (sign-in) or attaches the credential to the associating account.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
) -> impl IntoResponse {
    let Some(pending) = state.take_pending_oauth(&query.state).await else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if pending.provider != provider {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let Some(flow) = state.oauth_flow(&provider) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let tokens = match flow.exchange(&query.code, &pending.verifier).await {
        Ok(tokens) => tokens,
        Err(error) => {
            warn!(%error, provider, "http: oauth exchange failed");
            return StatusCode::BAD_GATEWAY.into_response();
        },
    };
    let Some(oid) = tokens.oid.as_deref() else {
        warn!(provider, "http: oauth provider returned no subject claim");
        return StatusCode::BAD_GATEWAY.into_response();
    };

    let account_id = match pending.associate_account_id {
        Some(account_id) => {
            if let Err(error) = state.store().associate_credential(account_id, &provider, oid).await {
                warn!(%error, account_id, provider, "http: associate_credential failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            account_id
        },
        None => match state.store().on_oid(&provider, oid).await {
            Ok(credential) => credential.account_id,
            Err(error) => {
                warn!(%error, provider, "http: on_oid failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            },
        },
    };

    match state.auth().mint_viewer_token(account_id, &provider, oid) {
        Ok(token) => Json(OAuthCallbackResponse { token }).into_response(),
        Err(error) => {
            warn!(%error, account_id, "http: mint_viewer_token failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

#[derive(Serialize)]
struct AuthCheckResponse {
    valid: bool,
    exp: Option<i64>,
    needs_refresh: bool,
    reissued: Option<String>,
}

/// `POST /api/auth/check` — validates the bearer token and, if it's close to
/// expiring, reissues one in the same response.
pub async fn auth_check(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let empty = AuthCheckResponse {
        valid: false,
        exp: None,
        needs_refresh: false,
        reissued: None,
    };
    let Some(token) = bearer_token(&headers) else {
        return Json(empty).into_response();
    };
    let claims = match state.auth().verify_viewer_token(token) {
        Ok(claims) => claims,
        Err(_) => return Json(empty).into_response(),
    };

    let refresh = needs_refresh(claims.exp);
    let reissued = if refresh {
        state
            .auth()
            .mint_viewer_token(claims.account_id, &claims.provider, &claims.oid)
            .ok()
    } else {
        None
    };

    Json(AuthCheckResponse {
        valid: true,
        exp: Some(claims.exp),
        needs_refresh: refresh,
        reissued,
    })
    .into_response()
}

/// `POST /api/account/unassociate/:provider` — detach one credential from
/// the calling account; refused by the store if it's the last one.
pub async fn unassociate_provider(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(account_id) = authenticated_account(&state, &headers).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match state.store().unassociate_credential(account_id, &provider).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => {
            warn!(%error, account_id, provider, "http: unassociate_credential failed");
            StatusCode::CONFLICT.into_response()
        },
    }
}

/// `POST /api/account/logoff` — hard-deletes the calling account.
pub async fn logoff(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(account_id) = authenticated_account(&state, &headers).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match state.store().logoff(account_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => {
            warn!(%error, account_id, "http: logoff failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_missing_header_is_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
