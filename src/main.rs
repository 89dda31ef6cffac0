use std::net::SocketAddr;
use std::sync::Arc;

use mimalloc::MiMalloc;
use redscan::config::AppConfig;
use redscan::middleware::rate_limit;
use redscan::services::executor::SubprocessRunner;
use redscan::services::insights::InsightsClient;
use redscan::services::store::ScanStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redscan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AppConfig::from_env();

    let pool = redscan::db::connect(&config).await;
    let store = ScanStore::from_pool(pool);
    if !store.is_durable() {
        tracing::warn!("Running with an ephemeral store; scan results will not be persisted");
    }

    let state = redscan::AppState {
        store,
        insights: Arc::new(InsightsClient::new(&config)),
        runner: Arc::new(SubprocessRunner::new(&config)),
        rate_limiter: rate_limit::build(&config),
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(host = %addr, "Starting scan orchestration API server");

    let app = redscan::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
