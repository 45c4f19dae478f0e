use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use verse_nexus::config::Config;
use verse_nexus::router::{VerseState, verse_router};
use verse_nexus::store::{GithubStore, VerseLayout};
use verse_nexus::{VerseRenderer, VerseService};

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
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        branch = %cfg.github.branch,
        directory = %cfg.github.directory,
        api_base = %cfg.github.api_base,
        proxy = %cfg.github.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
    );

    let renderer = Arc::new(VerseRenderer::new()?);
    let layout = VerseLayout::new(cfg.github.directory.clone());

    let state = match cfg.github.target() {
        Some(target) => match GithubStore::new(target, &cfg.github) {
            Ok(store) => {
                info!(repo = %store.full_name(), "GitHub content store initialized");
                VerseState::new(VerseService::new(Arc::new(store), renderer, layout))
            }
            Err(e) => {
                warn!(error = %e, "failed to initialize GitHub client; store-backed routes disabled");
                VerseState::unconfigured()
            }
        },
        None => {
            warn!(
                "Missing GitHub settings. Please set GITHUB_TOKEN, GITHUB_REPO_OWNER, GITHUB_REPO_NAME."
            );
            VerseState::unconfigured()
        }
    };

    let app = verse_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
