//! String-keyed async key/value storage for saved items and notes.
//!
//! [`FileStore`] keeps every key in a single JSON object on disk. [`Retrying`]
//! wraps any store with a bounded number of extra attempts.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File name of the JSON document holding all keys.
const STORE_FILE: &str = "store.json";
/// Extension given to a store file that failed to parse.
const CORRUPT_EXT: &str = "json.corrupt";

#[async_trait]
pub trait KvStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>>;
  async fn set(&self, key: &str, value: &str) -> Result<()>;
}

pub type SharedStore = Arc<dyn KvStore>;

pub struct FileStore {
  path: PathBuf,
  /// Serializes read-modify-write cycles within this process.
  lock: Mutex<()>,
}

impl FileStore {
  pub fn new(dir: &Path) -> Self {
    Self { path: dir.join(STORE_FILE), lock: Mutex::new(()) }
  }

  async fn read_all(&self) -> Result<BTreeMap<String, String>> {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
      Ok(content) => match serde_json::from_str(&content) {
        Ok(entries) => Ok(entries),
        Err(e) => self.quarantine(e).await,
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
      Err(e) => Err(anyhow!(e).context(format!("Failed to read store file {}", self.path.display()))),
    }
  }

  /// Move an unreadable store file aside and start over empty.
  async fn quarantine(&self, err: serde_json::Error) -> Result<BTreeMap<String, String>> {
    let aside = self.path.with_extension(CORRUPT_EXT);
    tokio::fs::rename(&self.path, &aside)
      .await
      .with_context(|| format!("Failed to move corrupt store file {}", self.path.display()))?;
    warn!(path = %self.path.display(), moved_to = %aside.display(), err = %err, "store: corrupt file moved aside");
    Ok(BTreeMap::new())
  }

  async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      tokio::fs::create_dir_all(dir).await.with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = serde_json::to_string_pretty(entries).context("Failed to encode store")?;
    // Write beside the target and rename so readers never see a torn file.
    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await.with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, &self.path).await.with_context(|| format!("Failed to replace {}", self.path.display()))?;
    Ok(())
  }
}

#[async_trait]
impl KvStore for FileStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let _guard = self.lock.lock().await;
    Ok(self.read_all().await?.remove(key))
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    let _guard = self.lock.lock().await;
    let mut entries = self.read_all().await?;
    entries.insert(key.to_string(), value.to_string());
    self.write_all(&entries).await?;
    debug!(key = %key, bytes = value.len(), "store: wrote key");
    Ok(())
  }
}

/// Retries failed calls on the inner store a fixed number of times.
pub struct Retrying<S> {
  inner: S,
  retries: u32,
  backoff: Duration,
}

impl<S> Retrying<S> {
  pub fn new(inner: S, retries: u32, backoff: Duration) -> Self {
    Self { inner, retries, backoff }
  }
}

#[async_trait]
impl<S: KvStore> KvStore for Retrying<S> {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let mut attempt = 0;
    loop {
      match self.inner.get(key).await {
        Ok(value) => return Ok(value),
        Err(e) if attempt < self.retries => {
          attempt += 1;
          warn!(key = %key, attempt, err = %e, "store: get failed, retrying");
          tokio::time::sleep(self.backoff).await;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut attempt = 0;
    loop {
      match self.inner.set(key, value).await {
        Ok(()) => return Ok(()),
        Err(e) if attempt < self.retries => {
          attempt += 1;
          warn!(key = %key, attempt, err = %e, "store: set failed, retrying");
          tokio::time::sleep(self.backoff).await;
        }
        Err(e) => return Err(e),
      }
    }
  }
}


#[cfg(test)]
mod tests {
  use super::memory::MemoryStore;
  use super::*;

  #[tokio::test]
  async fn file_store_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    assert_eq!(store.get("anything").await.unwrap(), None);
  }

  #[tokio::test]
  async fn file_store_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(&dir.path().join("nested"));
    store.set("a", "1").await.unwrap();
    store.set("b", "two").await.unwrap();
    store.set("a", "one").await.unwrap();
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("one"));
    assert_eq!(store.get("b").await.unwrap().as_deref(), Some("two"));
  }

  #[tokio::test]
  async fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    FileStore::new(dir.path()).set("k", "v").await.unwrap();
    let reopened = FileStore::new(dir.path());
    assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("v"));
    assert!(!dir.path().join("store.json.tmp").exists());
  }

  #[tokio::test]
  async fn file_store_corrupt_file_is_moved_aside() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::write(dir.path().join("store.json"), "{not json").unwrap();

    store.set("k", "v").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    let aside = std::fs::read_to_string(dir.path().join("store.json.corrupt")).unwrap();
    assert_eq!(aside, "{not json");
  }

  #[tokio::test]
  async fn file_store_corrupt_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::write(dir.path().join("store.json"), "[1, 2").unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
    assert!(!dir.path().join("store.json").exists());
  }

  #[tokio::test(start_paused = true)]
  async fn retrying_recovers_within_budget() {
    let store = Retrying::new(MemoryStore::default(), 2, Duration::from_millis(50));
    store.inner.fail_next(2);
    store.set("k", "v").await.unwrap();
    assert_eq!(store.inner.writes(), 1);
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
  }

  #[tokio::test(start_paused = true)]
  async fn retrying_gives_up_after_budget() {
    let store = Retrying::new(MemoryStore::default(), 1, Duration::from_millis(50));
    store.inner.fail_next(2);
    assert!(store.set("k", "v").await.is_err());
    assert_eq!(store.inner.writes(), 0);
    assert_eq!(store.get("k").await.unwrap(), None);
  }
}
