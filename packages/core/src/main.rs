use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::signal;

use site_gallery::api::{self, AppState};
use site_gallery::classify::DomainSet;
use site_gallery::cli::Cli;
use site_gallery::config::Config;
use site_gallery::db;
use site_gallery::error::AppError;
use site_gallery::logging::init_logging;
use site_gallery::metrics::AppMetrics;
use site_gallery::scheduler::run_periodic_sync;
use site_gallery::services::netlify::NetlifyClient;
use site_gallery::services::screenshot::ScreenshotUrls;
use site_gallery::sync::HostingInventory;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run().await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = Config::from_env().map_err(AppError::Config)?;
    cli.apply(&mut config);

    let pool = match config.database_url.as_deref() {
        Some(url) if cli.skip_migrations => Some(db::connect(url).await?),
        Some(url) => Some(db::create_pool(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; site endpoints will report not_configured");
            None
        }
    };

    let inventory: Option<Arc<dyn HostingInventory + Send + Sync>> =
        config.hosting_api_token.as_deref().map(|token| {
            Arc::new(NetlifyClient::new(config.hosting_api_url.clone(), token))
                as Arc<dyn HostingInventory + Send + Sync>
        });
    if inventory.is_none() {
        tracing::warn!("NETLIFY_ACCESS_TOKEN not set; sync is disabled");
    }

    let wpmu = match &config.wpmu_domains {
        Some(domains) => DomainSet::new(domains),
        None => DomainSet::wpmu_default(),
    };
    let metrics = AppMetrics::new()
        .map_err(|err| AppError::Config(format!("metrics registry: {}", err)))?;

    let state = AppState {
        screenshots: ScreenshotUrls::new(config.screenshot_api_key.clone()),
        config: Arc::new(config),
        pool,
        inventory,
        wpmu: Arc::new(wpmu),
        metrics: Arc::new(metrics),
    };

    if let Some(secs) = state.config.sync_interval_seconds {
        match state.reconciler() {
            Ok(reconciler) => {
                tokio::spawn(run_periodic_sync(
                    Arc::new(reconciler),
                    state.metrics.clone(),
                    secs,
                ));
            }
            Err(err) => tracing::warn!("Periodic sync not started: {}", err),
        }
    }

    let bind_addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("cannot bind {}: {}", bind_addr, err)))?;
    tracing::info!(
        "Site gallery listening on {} ({} WPMU domains)",
        bind_addr,
        state.wpmu.len()
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await
        .map_err(|err| AppError::Network(err.to_string()))?;

    tracing::info!("Server stopped cleanly");
    Ok(())
}
