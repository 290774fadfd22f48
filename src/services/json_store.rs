use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::SubscriberFile;
use crate::services::subscriber_store::{Insertion, StorePolicy, SubscriberStore};

/// Production implementation of SubscriberStore backed by a JSON file
///
/// The file is read once when the store is opened. Every insert rewrites the
/// whole file, pretty-printed, through a `.json.tmp` sibling and a rename so a
/// crash mid-write never leaves a truncated list behind.
pub struct JsonSubscriberStore {
    path: PathBuf,
    policy: StorePolicy,
    inner: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    file: SubscriberFile,
    /// Destinations added in memory whose write failed; carried over reloads
    /// until a later write succeeds
    pending: Vec<String>,
}

impl StoreState {
    fn contains(&self, destination: &str) -> bool {
        self.file.active_jids.iter().any(|jid| jid == destination)
    }

    fn merge_pending(&mut self) {
        let on_disk = &self.file.active_jids;
        self.pending.retain(|jid| !on_disk.contains(jid));
        for jid in &self.pending {
            if !self.file.active_jids.contains(jid) {
                self.file.active_jids.push(jid.clone());
            }
        }
    }
}

impl JsonSubscriberStore {
    /// Open the store at `path`, creating an empty list if the file is missing
    pub async fn open(path: impl AsRef<Path>, policy: StorePolicy) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = load_with_tmp_fallback(&path).await;
        info!(
            "Loaded {} subscriber(s) from {}",
            file.active_jids.len(),
            path.display()
        );
        Self {
            path,
            policy,
            inner: Mutex::new(StoreState {
                file,
                pending: Vec::new(),
            }),
        }
    }

    /// Replace the cached list with the file contents when the policy asks for it.
    /// Unpersisted entries are appended back; a file that cannot be read or
    /// parsed leaves the cache untouched.
    async fn refresh(&self, state: &mut StoreState) {
        if self.policy != StorePolicy::ReloadOnCheck {
            return;
        }
        match read_file(&self.path).await {
            Ok(Some(file)) => {
                state.file = file;
                state.merge_pending();
            }
            Ok(None) => debug!("Subscriber file {} not found; keeping cache", self.path.display()),
            Err(e) => warn!("Reload of {} failed, keeping cached list: {:#}", self.path.display(), e),
        }
    }

    async fn persist(&self, data: &SubscriberFile) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(data).context("failed to serialize subscriber list")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for JsonSubscriberStore {
    async fn list(&self) -> Vec<String> {
        self.inner.lock().await.file.active_jids.clone()
    }

    async fn contains(&self, destination: &str) -> bool {
        let mut state = self.inner.lock().await;
        self.refresh(&mut state).await;
        state.contains(destination)
    }

    async fn add(&self, destination: &str) -> Insertion {
        let mut state = self.inner.lock().await;
        self.refresh(&mut state).await;
        if state.contains(destination) {
            return Insertion::AlreadyPresent;
        }
        state.file.active_jids.push(destination.to_string());

        // Lock is held across the write so two inserts cannot interleave on disk
        match self.persist(&state.file).await {
            Ok(()) => {
                if !state.pending.is_empty() {
                    info!("Persisted {} previously unsaved subscriber(s)", state.pending.len());
                    state.pending.clear();
                }
                Insertion::Added
            }
            Err(e) => {
                state.pending.push(destination.to_string());
                Insertion::AddedNotPersisted(e)
            }
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// `Ok(None)` when the file does not exist
async fn read_file(path: &Path) -> Result<Option<SubscriberFile>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    let mut data: SubscriberFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    data.dedup();
    Ok(Some(data))
}

async fn load_with_tmp_fallback(path: &Path) -> SubscriberFile {
    match read_file(path).await {
        Ok(Some(data)) => data,
        Ok(None) => SubscriberFile::default(),
        Err(e) => {
            warn!("{:#}; trying temp file fallback", e);
            match read_file(&tmp_path(path)).await {
                Ok(Some(data)) => data,
                _ => {
                    warn!("No usable subscriber list found, starting empty");
                    SubscriberFile::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "news_relay_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("config.json")
    }

    async fn read_back(path: &Path) -> SubscriberFile {
        let bytes = tokio::fs::read(path).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let path = temp_file("missing");
        let store = JsonSubscriberStore::open(&path, StorePolicy::TrustCache).await;
        assert!(store.list().await.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_add_writes_active_jids() {
        let path = temp_file("add");
        let store = JsonSubscriberStore::open(&path, StorePolicy::TrustCache).await;

        assert!(matches!(store.add("111@g.us").await, Insertion::Added));
        assert!(matches!(store.add("222@c.us").await, Insertion::Added));

        let on_disk = read_back(&path).await;
        assert_eq!(on_disk.active_jids, vec!["111@g.us", "222@c.us"]);

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("\"activeJids\""));
        assert!(raw.contains('\n'), "file should be pretty-printed");
    }

    #[tokio::test]
    async fn test_add_existing_is_noop() {
        let path = temp_file("dup");
        let store = JsonSubscriberStore::open(&path, StorePolicy::TrustCache).await;

        store.add("111@g.us").await;
        assert!(matches!(store.add("111@g.us").await, Insertion::AlreadyPresent));
        assert_eq!(store.len().await, 1);
        assert_eq!(read_back(&path).await.active_jids.len(), 1);
    }

    #[tokio::test]
    async fn test_reopen_preserves_order_and_drops_duplicates() {
        let path = temp_file("reopen");
        tokio::fs::write(&path, r#"{"activeJids": ["b", "a", "b", ""]}"#)
            .await
            .unwrap();

        let store = JsonSubscriberStore::open(&path, StorePolicy::TrustCache).await;
        assert_eq!(store.list().await, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_tmp() {
        let path = temp_file("corrupt");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        tokio::fs::write(tmp_path(&path), r#"{"activeJids": ["x"]}"#)
            .await
            .unwrap();

        let store = JsonSubscriberStore::open(&path, StorePolicy::TrustCache).await;
        assert_eq!(store.list().await, vec!["x"]);
    }

    #[tokio::test]
    async fn test_trust_cache_ignores_external_edits() {
        let path = temp_file("trust");
        let store = JsonSubscriberStore::open(&path, StorePolicy::TrustCache).await;
        store.add("a").await;

        tokio::fs::write(&path, r#"{"activeJids": ["a", "edited"]}"#)
            .await
            .unwrap();
        assert!(!store.contains("edited").await);
    }

    #[tokio::test]
    async fn test_reload_on_check_picks_up_external_edits() {
        let path = temp_file("reload");
        let store = JsonSubscriberStore::open(&path, StorePolicy::ReloadOnCheck).await;
        store.add("a").await;

        tokio::fs::write(&path, r#"{"activeJids": ["a", "edited"]}"#)
            .await
            .unwrap();
        assert!(store.contains("edited").await);
        assert!(matches!(store.add("edited").await, Insertion::AlreadyPresent));
        assert_eq!(store.list().await, vec!["a", "edited"]);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_update() {
        // A directory where the file should be makes the rename fail
        let path = temp_file("unwritable");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let store = JsonSubscriberStore::open(&path, StorePolicy::TrustCache).await;
        let outcome = store.add("a").await;
        assert!(matches!(outcome, Insertion::AddedNotPersisted(_)));
        assert!(store.contains("a").await);
    }

    #[tokio::test]
    async fn test_reload_keeps_unpersisted_entry_until_next_write() {
        let path = temp_file("reload_unpersisted");
        tokio::fs::write(&path, r#"{"activeJids": ["a"]}"#).await.unwrap();
        let store = JsonSubscriberStore::open(&path, StorePolicy::ReloadOnCheck).await;

        // A directory in place of the temp file makes the write fail
        let blocker = tmp_path(&path);
        std::fs::create_dir_all(&blocker).unwrap();
        assert!(matches!(store.add("X").await, Insertion::AddedNotPersisted(_)));
        assert!(store.contains("X").await, "reload must not drop X");
        assert_eq!(store.list().await, vec!["a", "X"]);
        assert_eq!(read_back(&path).await.active_jids, vec!["a"]);

        std::fs::remove_dir(&blocker).unwrap();
        assert!(matches!(store.add("Y").await, Insertion::Added));
        assert!(store.contains("X").await);
        assert_eq!(store.list().await, vec!["a", "X", "Y"]);
        assert_eq!(read_back(&path).await.active_jids, vec!["a", "X", "Y"]);

        // Once written, X survives a reload on its own
        tokio::fs::write(&path, r#"{"activeJids": ["a", "X", "Y"]}"#)
            .await
            .unwrap();
        assert_eq!(store.list().await, vec!["a", "X", "Y"]);
        assert!(store.contains("X").await);
    }

    #[tokio::test]
    async fn test_reload_does_not_duplicate_entry_written_externally() {
        let path = temp_file("reload_external");
        tokio::fs::write(&path, r#"{"activeJids": []}"#).await.unwrap();
        let store = JsonSubscriberStore::open(&path, StorePolicy::ReloadOnCheck).await;

        let blocker = tmp_path(&path);
        std::fs::create_dir_all(&blocker).unwrap();
        assert!(matches!(store.add("X").await, Insertion::AddedNotPersisted(_)));

        // Someone else records X on disk meanwhile
        tokio::fs::write(&path, r#"{"activeJids": ["X"]}"#).await.unwrap();
        assert!(matches!(store.add("X").await, Insertion::AlreadyPresent));
        assert_eq!(store.list().await, vec!["X"]);
    }
}
