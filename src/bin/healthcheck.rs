use std::process;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Must match the port the relay binds
    let port = std::env::var("HTTP_PORT")
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or(3000);

    match check_health(port).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Healthcheck failed: {}", e);
            process::exit(1);
        }
    }
}

async fn check_health(port: u16) -> Result<(), String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    let url = format!("http://127.0.0.1:{}/health", port);
    let res = client
        .get(&url)
        .send()
        .await
        .map_err(|e| format!("Failed to reach {}: {}", url, e))?;

    if !res.status().is_success() {
        return Err(format!("{} returned {}", url, res.status()));
    }

    // A relay that answers but reports something other than "ok" is unhealthy
    let body: serde_json::Value = res
        .json()
        .await
        .map_err(|e| format!("Invalid health response: {}", e))?;
    match body.get("status").and_then(|s| s.as_str()) {
        Some("ok") => Ok(()),
        other => Err(format!("Unexpected health status: {:?}", other)),
    }
}
