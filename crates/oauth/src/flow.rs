use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use secrecy::Secret;
use url::Url;

use crate::{
    Error, Result,
    pkce::{generate_pkce, generate_state},
    types::{OAuthConfig, OAuthTokens, PkceChallenge},
};

/// Drives the OAuth 2.0 authorization code flow with PKCE for one provider.
pub struct OAuthFlow {
    config: OAuthConfig,
    client: reqwest::Client,
}

/// Result of starting the flow: the URL to send the account owner to, plus
/// the verifier and state the caller must hold onto until the callback.
pub struct AuthorizationRequest {
    pub url: String,
    pub pkce: PkceChallenge,
    pub state: String,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn start(&self) -> Result<AuthorizationRequest> {
        let pkce = generate_pkce();
        let state = generate_state();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|source| Error::external(format!("invalid auth_url: {source}"), source))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &state);

        if !self.config.scopes.is_empty() {
            url.query_pairs_mut()
                .append_pair("scope", &self.config.scopes.join(" "));
        }

        Ok(AuthorizationRequest {
            url: url.to_string(),
            pkce,
            state,
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange(&self, code: &str, verifier: &str) -> Result<OAuthTokens> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
            ("client_id", &self.config.client_id),
            ("code_verifier", verifier),
        ];

        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        parse_token_response(&resp)
    }

    /// Refresh an access token using a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.config.client_id),
        ];

        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        parse_token_response(&resp)
    }
}

fn parse_token_response(resp: &serde_json::Value) -> Result<OAuthTokens> {
    let access_token = resp["access_token"]
        .as_str()
        .ok_or_else(|| Error::message("missing access_token in token response"))?
        .to_string();

    let refresh_token = resp["refresh_token"].as_str().map(str::to_string);
    let id_token = resp["id_token"].as_str().map(str::to_string);
    let oid = id_token
        .as_deref()
        .and_then(subject_from_jwt)
        .or_else(|| subject_from_jwt(&access_token));

    let expires_at = resp["expires_in"].as_u64().and_then(|secs| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs() + secs)
    });

    Ok(OAuthTokens {
        access_token: Secret::new(access_token),
        refresh_token: refresh_token.map(Secret::new),
        id_token: id_token.map(Secret::new),
        oid,
        expires_at,
    })
}

/// Pull the `sub` claim out of a JWT's payload without verifying its
/// signature — the provider's own token endpoint already authenticated it
/// over TLS, this is just claim extraction for display purposes.
fn subject_from_jwt(token: &str) -> Option<String> {
    let payload_b64 = token.split('.').nth(1)?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).or_else(|_| {
        let padded = match payload_b64.len() % 4 {
            2 => format!("{payload_b64}=="),
            3 => format!("{payload_b64}="),
            _ => payload_b64.to_string(),
        };
        STANDARD.decode(padded)
    });
    let claims: serde_json::Value = serde_json::from_slice(&payload.ok()?).ok()?;
    claims
        .get("sub")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_sub(sub: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let payload = URL_SAFE_NO_PAD.encode(format!("{{\"sub\":\"{sub}\"}}"));
        format!("{header}.{payload}.")
    }

    #[test]
    fn extracts_subject_from_id_token() {
        assert_eq!(
            subject_from_jwt(&jwt_with_sub("account-42")),
            Some("account-42".to_string())
        );
    }

    #[test]
    fn missing_sub_claim_is_none() {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let payload = URL_SAFE_NO_PAD.encode("{}");
        assert_eq!(subject_from_jwt(&format!("{header}.{payload}.")), None);
    }

    #[test]
    fn missing_access_token_is_error() {
        let resp = serde_json::json!({ "token_type": "bearer" });
        assert!(parse_token_response(&resp).is_err());
    }
}
