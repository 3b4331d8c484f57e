//! Process entry point: load configuration, open the store, wire up auth and
//! OAuth, and serve the gateway over TLS.

use std::{collections::HashMap, net::SocketAddr, path::PathBuf, sync::Arc};

use camrelay_auth::AuthVerifier;
use camrelay_config::Config;
use camrelay_gateway::{AppState, build_router, load_rustls_config};
use camrelay_oauth::OAuthFlow;
use camrelay_store::sqlite::SqliteStore;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "camrelay", about = "Camera relay control-plane hub")]
struct Cli {
    /// Path to a `camrelay.toml` config file.
    #[arg(long, env = "CAMRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overridden by `RUST_LOG`.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable text.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Bind address, overriding the config file / env value.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.bind_addr,
        "camrelay starting"
    );

    let store: Arc<dyn camrelay_store::Store> = Arc::new(SqliteStore::connect(&config.database_url).await?);
    let auth = AuthVerifier::new(config.viewer_jwt_secret, Arc::clone(&store));

    let oauth_flows: HashMap<String, OAuthFlow> = config
        .oauth_providers
        .into_iter()
        .map(|cfg| (cfg.provider.clone(), OAuthFlow::new(cfg)))
        .collect();
    tracing::info!(providers = ?oauth_flows.keys().collect::<Vec<_>>(), "oauth providers configured");

    let rustls_config = load_rustls_config(&config.tls.cert_path, &config.tls.key_path)?;
    let tls_config = axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(rustls_config));

    let state = AppState::new(store, auth, oauth_flows, config.cors_origins);
    let router = build_router(state);

    axum_server::bind_rustls(config.bind_addr, tls_config)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}
