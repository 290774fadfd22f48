//! Shutdown signal handling shared by the web server and the relay loop

use anyhow::Result;
use tokio::signal;
use tracing::{info, warn};

/// Result of racing a future against a shutdown signal
pub enum ShutdownRace<T> {
    /// Ctrl+C or SIGTERM received
    Shutdown,
    /// The future completed with this result
    Completed(T),
}

/// Resolve once the process is asked to stop
///
/// Listens for Ctrl+C everywhere and additionally for SIGTERM on Unix, which
/// is what `docker stop` sends. Errors installing a handler are returned
/// rather than treated as a shutdown request.
pub async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(unix)]
    let terminate = async {
        let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        term.recv().await;
        info!("Received SIGTERM");
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}

/// Race a future against [`shutdown_signal`]
///
/// # Example
/// ```no_run
/// use news_relay::shutdown::{race_with_shutdown, ShutdownRace};
/// use tokio::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// match race_with_shutdown(tokio::time::sleep(Duration::from_secs(10))).await? {
///     ShutdownRace::Shutdown => println!("Stopping"),
///     ShutdownRace::Completed(()) => println!("Finished first"),
/// }
/// # Ok(())
/// # }
/// ```
pub async fn race_with_shutdown<F, T>(future: F) -> Result<ShutdownRace<T>>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        result = shutdown_signal() => {
            match result {
                Ok(()) => Ok(ShutdownRace::Shutdown),
                Err(err) => {
                    warn!("Unable to listen for shutdown signal: {:#}", err);
                    Err(err)
                }
            }
        }
        output = future => Ok(ShutdownRace::Completed(output)),
    }
}
