use std::str::FromStr;

use mimalloc::MiMalloc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vihara::config::Config;
use vihara::gate::AccessGate;
use vihara::router::{ViharaState, vihara_router};
use vihara::store::DataStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen_addr = %cfg.listen_addr,
        session_timeout_secs = cfg.session_timeout_secs,
        loglevel = %cfg.loglevel
    );

    let connect_opts =
        SqliteConnectOptions::from_str(cfg.database_url.as_str())?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    let store = DataStore::new(pool);
    store.init_schema().await?;

    let gate = AccessGate::new(
        store.clone(),
        cfg.session_timeout_secs,
        cfg.session_warning_lead_secs,
    );

    // Build axum router and serve
    let state = ViharaState::new(store, gate);
    let app = vihara_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
