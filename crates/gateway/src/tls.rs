//! TLS is mandatory for this relay — there is no plaintext listener. This
//! module just loads operator-supplied cert/key PEM files into the
//! `rustls::ServerConfig` `axum-server` wants; unlike a developer-facing
//! gateway there is no self-signed CA to generate here.

use std::{io::BufReader, path::Path};

use anyhow::Context;
use rustls::ServerConfig;

/// Load a cert/key PEM pair into a `rustls::ServerConfig` with ALPN offering
/// both h2 and http/1.1 (the WebSocket upgrade itself stays on http/1.1).
pub fn load_rustls_config(cert_path: &Path, key_path: &Path) -> anyhow::Result<ServerConfig> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cert_file = std::fs::File::open(cert_path)
        .with_context(|| format!("open TLS cert {}", cert_path.display()))?;
    let key_file = std::fs::File::open(key_path)
        .with_context(|| format!("open TLS key {}", key_path.display()))?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<Result<Vec<_>, _>>()
        .context("parse TLS cert chain")?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .context("parse TLS private key")?
        .context("no private key found in key file")?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("build rustls ServerConfig")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}
