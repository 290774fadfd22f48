use anyhow::{Context, Result};
use dotenvy::dotenv;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_relay::bridge_connection::{wait_for_bridge, RetryConfig};
use news_relay::models::AppConfig;
use news_relay::news_source::HttpNewsSource;
use news_relay::poller::run_relay_loop;
use news_relay::rate_limiter::RateLimiter;
use news_relay::relay::Relay;
use news_relay::services::JsonSubscriberStore;
use news_relay::shutdown::{race_with_shutdown, shutdown_signal, ShutdownRace};
use news_relay::transport::BridgeTransport;
use news_relay::web::{self, StaticFiles, WebState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = AppConfig::from_env()?;

    let client = Client::builder()
        .user_agent(cfg.http_user_agent.clone())
        .timeout(cfg.http_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let store = Arc::new(JsonSubscriberStore::open(&cfg.subscribers_path, cfg.store_policy).await);
    let source = Arc::new(HttpNewsSource::new(client.clone(), cfg.news_url.clone()));
    let transport = Arc::new(BridgeTransport::new(
        client,
        &cfg.bridge_url,
        &cfg.bridge_session,
        cfg.bridge_api_key.clone(),
    ));

    // The bridge reconnects on its own; a slow start is not fatal
    let retry = RetryConfig::from_env();
    match race_with_shutdown(wait_for_bridge(transport.as_ref(), &retry)).await? {
        ShutdownRace::Shutdown => {
            info!("Shutdown requested before the bridge came up");
            return Ok(());
        }
        ShutdownRace::Completed(Err(e)) => warn!("{:#} - starting anyway", e),
        ShutdownRace::Completed(Ok(_)) => {}
    }

    let relay = Arc::new(
        Relay::new(store, source, transport)
            .with_throttle(RateLimiter::per_minute(cfg.send_rate_limit_per_minute))
            .with_footer(cfg.caption_footer.clone()),
    );

    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let relay_task = tokio::spawn(run_relay_loop(
        relay.clone(),
        inbound_rx,
        cfg.poll_interval(),
    ));

    let app = web::router(
        WebState {
            relay,
            inbound: inbound_tx,
            session: cfg.bridge_session.clone(),
        },
        &StaticFiles {
            landing_page: cfg.landing_page_path.clone(),
            qr_image: cfg.qr_image_path.clone(),
            public_dir: cfg.public_dir.clone(),
        },
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server is running on http://{}", addr);

    let result = web::serve(listener, app, async {
        if let Err(e) = shutdown_signal().await {
            warn!("Unable to listen for shutdown signal: {:#}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    // In-flight requests are done; nothing can reach the relay loop anymore
    relay_task.abort();
    info!("Shutdown complete");
    result
}
