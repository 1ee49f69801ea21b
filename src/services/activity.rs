use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// What a request did, for the access log and the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Create,
    Read,
    Update,
    Delete,
    Error,
}

/// Persisted counter file shape. Field names match the stats file written by
/// earlier deployments so the file stays readable across versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityStats {
    pub access_counter: u64,
    #[serde(rename = "Creates")]
    pub creates: u64,
    #[serde(rename = "Reads")]
    pub reads: u64,
    #[serde(rename = "Updates")]
    pub updates: u64,
    #[serde(rename = "Deletes")]
    pub deletes: u64,
    pub errors_encountered: u64,
    pub last_used: Option<String>,
}

/// Request-scoped activity recorder, injected into the handlers rather than
/// held as a process-wide singleton. Counter updates and file writes are
/// serialized behind one async mutex so concurrent requests cannot interleave
/// a stats rewrite.
///
/// Persistence failures are logged and swallowed; observability never fails a
/// client request.
pub struct ActivityLog {
    stats_path: PathBuf,
    access_path: PathBuf,
    state: Mutex<ActivityStats>,
}

impl ActivityLog {
    pub async fn open(dir: &Path) -> Self {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Failed to create log directory {:?}: {}", dir, e);
        }
        let stats_path = dir.join("stats.json");
        let access_path = dir.join("access.txt");

        let stats = match tokio::fs::read(&stats_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => ActivityStats::default(),
        };

        Self {
            stats_path,
            access_path,
            state: Mutex::new(stats),
        }
    }

    pub async fn record(&self, interaction: Interaction, id: Option<&str>) {
        let statement = match (interaction, id) {
            (Interaction::Create, Some(id)) => format!("Created new item with id: {}", id),
            (Interaction::Create, None) => "Created new item".to_string(),
            (Interaction::Read, Some(id)) => format!("Retrieved item with id: {}", id),
            (Interaction::Read, None) => "Retrieved all items".to_string(),
            (Interaction::Update, Some(id)) => format!("Updated item with id: {}", id),
            (Interaction::Update, None) => "Updated item".to_string(),
            (Interaction::Delete, Some(id)) => format!("Deleted item with id: {}", id),
            (Interaction::Delete, None) => "Deleted item".to_string(),
            (Interaction::Error, detail) => format!("Error: {}", detail.unwrap_or("unknown")),
        };

        let mut stats = self.state.lock().await;
        match interaction {
            Interaction::Create => stats.creates += 1,
            Interaction::Read => stats.reads += 1,
            Interaction::Update => stats.updates += 1,
            Interaction::Delete => stats.deletes += 1,
            Interaction::Error => stats.errors_encountered += 1,
        }
        let counter = stats.access_counter;
        let now = Utc::now().to_rfc3339();
        tracing::info!("{} : {} : {}", now, counter, statement);

        stats.access_counter += 1;
        stats.last_used = Some(now.clone());

        self.persist(&stats).await;
        self.append_access_line(&format!("{} : {} : {}\n", now, counter, statement))
            .await;
    }

    pub async fn snapshot(&self) -> ActivityStats {
        self.state.lock().await.clone()
    }

    /// Reinitialize the counters and truncate the access log.
    pub async fn reset(&self) {
        let mut stats = self.state.lock().await;
        *stats = ActivityStats::default();
        self.persist(&stats).await;
        if let Err(e) = tokio::fs::write(&self.access_path, b"").await {
            tracing::error!("Failed to truncate access log: {}", e);
        }
    }

    async fn persist(&self, stats: &ActivityStats) {
        let json = match serde_json::to_vec(stats) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize activity stats: {}", e);
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.stats_path, json).await {
            tracing::error!("Failed to write activity stats: {}", e);
        }
    }

    async fn append_access_line(&self, line: &str) {
        let result = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.access_path)
            .await;
        match result {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    tracing::error!("Failed to append access log: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to open access log: {}", e),
        }
    }
}
