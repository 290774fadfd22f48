pub mod bridge_connection;
pub mod models;
pub mod news_source;
pub mod poller;
pub mod rate_limiter;
pub mod relay;
pub mod services;
pub mod shutdown;
pub mod transport;
pub mod web;
