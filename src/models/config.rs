use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::services::StorePolicy;

pub const DEFAULT_NEWS_URL: &str = "https://bit-x-apis.vercel.app/hiru";
pub const DEFAULT_CAPTION_FOOTER: &str = "_Powered by Bitx ❤️_";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub news_url: String,
    pub poll_interval_secs: u64,
    pub subscribers_path: PathBuf,
    pub store_policy: StorePolicy,
    pub bridge_url: String,
    pub bridge_session: String,
    pub bridge_api_key: Option<String>,
    pub http_port: u16,
    pub qr_image_path: PathBuf,
    pub landing_page_path: PathBuf,
    pub public_dir: PathBuf,
    pub caption_footer: Option<String>,
    pub send_rate_limit_per_minute: u32,
    pub http_user_agent: String,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bridge_url = std::env::var("BRIDGE_URL")
            .context("BRIDGE_URL is required (e.g., http://localhost:3001)")?
            .trim_end_matches('/')
            .to_string();

        let news_url = std::env::var("NEWS_URL").unwrap_or_else(|_| DEFAULT_NEWS_URL.to_string());

        // Anything below one second would hammer the news API
        let poll_interval_secs = env_parse("POLL_INTERVAL_SECS").unwrap_or(20).max(1);

        let subscribers_path = std::env::var("SUBSCRIBERS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.json"));

        let store_policy = if env_flag("SUBSCRIBERS_RELOAD") {
            StorePolicy::ReloadOnCheck
        } else {
            StorePolicy::TrustCache
        };

        let bridge_session =
            std::env::var("BRIDGE_SESSION").unwrap_or_else(|_| "default".to_string());
        let bridge_api_key = std::env::var("BRIDGE_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let http_port = env_parse("HTTP_PORT").unwrap_or(3000);

        let qr_image_path = std::env::var("QR_IMAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("qr_code.png"));
        let landing_page_path = std::env::var("LANDING_PAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("index.html"));
        let public_dir = std::env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public"));

        // An explicitly empty CAPTION_FOOTER disables the footer line
        let caption_footer = match std::env::var("CAPTION_FOOTER") {
            Ok(s) if s.trim().is_empty() => None,
            Ok(s) => Some(s),
            Err(_) => Some(DEFAULT_CAPTION_FOOTER.to_string()),
        };

        const MAX_SEND_RATE: u32 = 120;
        let requested_rate = env_parse("SEND_RATE_LIMIT_PER_MINUTE").unwrap_or(30);
        let send_rate_limit_per_minute = if requested_rate > MAX_SEND_RATE {
            tracing::warn!(
                "SEND_RATE_LIMIT_PER_MINUTE is set to {}, above the maximum of {}. Capping at {} msg/min.",
                requested_rate,
                MAX_SEND_RATE,
                MAX_SEND_RATE
            );
            MAX_SEND_RATE
        } else {
            requested_rate
        };

        let http_user_agent = std::env::var("HTTP_USER_AGENT")
            .unwrap_or_else(|_| format!("news-relay/{}", env!("CARGO_PKG_VERSION")));

        let http_timeout_secs = env_parse("HTTP_TIMEOUT_SECS").unwrap_or(15).max(1);

        Ok(Self {
            news_url,
            poll_interval_secs,
            subscribers_path,
            store_policy,
            bridge_url,
            bridge_session,
            bridge_api_key,
            http_port,
            qr_image_path,
            landing_page_path,
            public_dir,
            caption_footer,
            send_rate_limit_per_minute,
            http_user_agent,
            http_timeout_secs,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).map(|s| s.trim().to_ascii_lowercase()),
        Ok(ref s) if s == "1" || s == "true" || s == "yes"
    )
}
