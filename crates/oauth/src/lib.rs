//! OAuth 2.0 PKCE flow used to associate an external identity provider with
//! an account — the `POST /associate` / `DELETE /unassociate` surface.

pub mod error;
pub mod flow;
pub mod pkce;
pub mod types;

pub use error::{Error, Result};
pub use flow::{AuthorizationRequest, OAuthFlow};
pub use types::{OAuthConfig, OAuthTokens, PkceChallenge};
