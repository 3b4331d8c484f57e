use crate::ConfigFile;

const BIND_ADDR: &str = "CAMRELAY_BIND_ADDR";
const DATABASE_URL: &str = "CAMRELAY_DATABASE_URL";
const VIEWER_JWT_SECRET: &str = "CAMRELAY_VIEWER_JWT_SECRET";
const TLS_CERT_PATH: &str = "CAMRELAY_TLS_CERT_PATH";
const TLS_KEY_PATH: &str = "CAMRELAY_TLS_KEY_PATH";
const CORS_ORIGINS: &str = "CAMRELAY_CORS_ORIGINS";

/// Overlay environment variables on top of a file-or-default [`ConfigFile`].
/// Unset or unparsable variables leave the existing value untouched; a
/// malformed `CAMRELAY_BIND_ADDR` is logged and ignored rather than failing
/// the whole process.
pub fn apply_env_overrides(cfg: &mut ConfigFile) {
    if let Ok(v) = std::env::var(BIND_ADDR) {
        match v.parse() {
            Ok(addr) => cfg.bind_addr = addr,
            Err(e) => tracing::warn!(value = %v, error = %e, "ignoring invalid {BIND_ADDR}"),
        }
    }
    if let Ok(v) = std::env::var(DATABASE_URL) {
        cfg.database_url = v;
    }
    if let Ok(v) = std::env::var(VIEWER_JWT_SECRET) {
        cfg.viewer_jwt_secret = v;
    }
    if let Ok(v) = std::env::var(TLS_CERT_PATH) {
        cfg.tls.cert_path = v.into();
    }
    if let Ok(v) = std::env::var(TLS_KEY_PATH) {
        cfg.tls.key_path = v.into();
    }
    if let Ok(v) = std::env::var(CORS_ORIGINS) {
        cfg.cors_origins = v.split(',').map(str::trim).map(str::to_owned).collect();
    }
}
