use std::path::PathBuf;

use rust_stock::services::ActivityLog;

/// Reinitializes the activity stats file and truncates the access log.
#[tokio::main]
async fn main() {
    let dir = std::env::var("LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("logs"));

    let log = ActivityLog::open(&dir).await;
    log.reset().await;
    println!("Reset activity stats in {:?}", dir);
}
