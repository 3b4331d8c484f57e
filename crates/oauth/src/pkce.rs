use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::types::PkceChallenge;

/// Generate an RFC 7636 PKCE verifier/challenge pair using S256.
pub fn generate_pkce() -> PkceChallenge {
    let verifier = random_url_safe_token(32);
    let digest = Sha256::digest(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(digest);
    PkceChallenge {
        verifier,
        challenge,
    }
}

/// Generate an opaque anti-CSRF `state` value for the authorization request.
pub fn generate_state() -> String {
    random_url_safe_token(16)
}

fn random_url_safe_token(len_bytes: usize) -> String {
    let mut buf = vec![0u8; len_bytes];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}
