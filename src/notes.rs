//! Per-reference notes with debounced, coalesced writes.
//!
//! Each edit restarts the quiet window. Only the latest text is written once
//! the window passes. A write still waiting is replaced; one already running
//! finishes before the next one starts.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::constants::constants;
use crate::resolver::ReferenceIds;
use crate::store::SharedStore;

/// Storage key for the notes of a reference. Playlist id wins over video id.
pub fn note_key(ids: &ReferenceIds) -> Option<String> {
  let prefix = &constants().notes_key_prefix;
  match (&ids.collection, &ids.single) {
    (Some(list), _) => Some(format!("{}playlist_{}", prefix, list)),
    (None, Some(video)) => Some(format!("{}video_{}", prefix, video)),
    (None, None) => None,
  }
}

/// Writes a value to one key after a quiet period, keeping only the newest.
///
/// Only the wait can be cancelled. Once the quiet period has passed the write
/// runs on its own task and always completes.
pub struct DebouncedWriter {
  store: SharedStore,
  key: String,
  delay: Duration,
  pending: Option<JoinHandle<()>>,
  generation: u64,
  /// Generation of the newest value handed to the store. Held across each write.
  written: Arc<Mutex<u64>>,
  in_flight: Arc<AtomicUsize>,
}

impl DebouncedWriter {
  pub fn new(store: SharedStore, key: String, delay: Duration) -> Self {
    Self {
      store,
      key,
      delay,
      pending: None,
      generation: 0,
      written: Arc::new(Mutex::new(0)),
      in_flight: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn schedule(&mut self, value: String) {
    self.cancel();
    self.generation += 1;

    let generation = self.generation;
    let store = Arc::clone(&self.store);
    let key = self.key.clone();
    let delay = self.delay;
    let written = Arc::clone(&self.written);
    let in_flight = Arc::clone(&self.in_flight);

    self.pending = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      in_flight.fetch_add(1, Ordering::AcqRel);
      tokio::spawn(flush(store, key, value, generation, written, in_flight));
    }));
  }

  /// Drop a write still waiting out its quiet period. A write already
  /// running is left alone.
  pub fn cancel(&mut self) {
    if let Some(handle) = self.pending.take() {
      handle.abort();
    }
  }

  pub fn is_pending(&self) -> bool {
    self.pending.as_ref().is_some_and(|h| !h.is_finished())
  }

  pub fn is_saving(&self) -> bool {
    self.in_flight.load(Ordering::Acquire) > 0
  }
}

async fn flush(
  store: SharedStore,
  key: String,
  value: String,
  generation: u64,
  written: Arc<Mutex<u64>>,
  in_flight: Arc<AtomicUsize>,
) {
  let mut newest = written.lock().await;
  if *newest < generation {
    match store.set(&key, &value).await {
      Ok(()) => debug!(key = %key, bytes = value.len(), "notes: flushed"),
      Err(e) => error!(key = %key, err = %e, "notes: failed to save"),
    }
    *newest = generation;
  } else {
    debug!(key = %key, generation, "notes: skipped stale write");
  }
  drop(newest);
  in_flight.fetch_sub(1, Ordering::AcqRel);
}

impl Drop for DebouncedWriter {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// Editable note text bound to one storage key.
pub struct Notes {
  text: String,
  writer: DebouncedWriter,
}

impl Notes {
  pub fn new(store: SharedStore, key: String, initial: String, delay: Duration) -> Self {
    Self { text: initial, writer: DebouncedWriter::new(store, key, delay) }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn is_saving(&self) -> bool {
    self.writer.is_saving()
  }

  pub fn has_pending_write(&self) -> bool {
    self.writer.is_pending()
  }

  pub fn insert(&mut self, c: char) {
    self.text.push(c);
    self.changed();
  }

  pub fn backspace(&mut self) {
    if self.text.pop().is_some() {
      self.changed();
    }
  }

  fn changed(&mut self) {
    self.writer.schedule(self.text.clone());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::KvStore;
  use crate::store::memory::MemoryStore;
  use anyhow::Result;
  use async_trait::async_trait;

  /// Store whose writes take a while, counting starts and completions.
  #[derive(Default)]
  struct SlowStore {
    inner: MemoryStore,
    started: AtomicUsize,
    completed: AtomicUsize,
  }

  const WRITE_TIME: Duration = Duration::from_millis(300);

  #[async_trait]
  impl KvStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
      self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
      self.started.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(WRITE_TIME).await;
      self.inner.set(key, value).await?;
      self.completed.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  const DELAY: Duration = Duration::from_millis(1500);

  fn notes_with(store: &Arc<MemoryStore>) -> Notes {
    let shared: SharedStore = store.clone();
    Notes::new(shared, "k".to_string(), String::new(), DELAY)
  }

  #[test]
  fn key_prefers_playlist() {
    let ids = ReferenceIds::extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1");
    assert_eq!(note_key(&ids).as_deref(), Some("lostin_notes_playlist_PL1"));
  }

  #[test]
  fn key_for_video() {
    let ids = ReferenceIds::extract("https://youtu.be/dQw4w9WgXcQ");
    assert_eq!(note_key(&ids).as_deref(), Some("lostin_notes_video_dQw4w9WgXcQ"));
    assert_eq!(note_key(&ReferenceIds::default()), None);
  }

  #[tokio::test(start_paused = true)]
  async fn rapid_edits_coalesce_into_one_write() {
    let store = Arc::new(MemoryStore::default());
    let mut notes = notes_with(&store);

    for c in "hello".chars() {
      notes.insert(c);
      tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert_eq!(store.writes(), 0);
    assert!(notes.has_pending_write());

    tokio::time::sleep(DELAY).await;
    assert_eq!(store.writes(), 1);
    assert_eq!(store.value("k").as_deref(), Some("hello"));
    assert!(!notes.has_pending_write());
  }

  #[tokio::test(start_paused = true)]
  async fn separated_edits_write_separately() {
    let store = Arc::new(MemoryStore::default());
    let mut notes = notes_with(&store);

    for c in "first".chars() {
      notes.insert(c);
    }
    tokio::time::sleep(Duration::from_millis(1600)).await;
    notes.backspace();
    tokio::time::sleep(Duration::from_millis(1600)).await;

    assert_eq!(store.writes(), 2);
    assert_eq!(store.value("k").as_deref(), Some("firs"));
  }

  #[tokio::test(start_paused = true)]
  async fn dropping_cancels_pending_write() {
    let store = Arc::new(MemoryStore::default());
    let mut notes = notes_with(&store);
    notes.insert('x');
    drop(notes);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(store.writes(), 0);
    assert_eq!(store.value("k"), None);
  }

  #[tokio::test(start_paused = true)]
  async fn failed_write_keeps_text() {
    let store = Arc::new(MemoryStore::default());
    store.fail_next(1);
    let mut notes = notes_with(&store);
    notes.insert('a');

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(store.writes(), 0);
    assert_eq!(notes.text(), "a");
    assert!(!notes.is_saving());
  }

  #[tokio::test(start_paused = true)]
  async fn backspace_on_empty_schedules_nothing() {
    let store = Arc::new(MemoryStore::default());
    let mut notes = notes_with(&store);
    notes.backspace();
    assert!(!notes.has_pending_write());
  }

  #[tokio::test(start_paused = true)]
  async fn edit_during_running_write_lets_it_finish() {
    let store = Arc::new(SlowStore::default());
    let shared: SharedStore = store.clone();
    let mut writer = DebouncedWriter::new(shared, "k".to_string(), DELAY);

    writer.schedule("first".to_string());
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(store.started.load(Ordering::SeqCst), 1);
    assert!(writer.is_saving());

    writer.schedule("second".to_string());
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.completed.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.value("k").as_deref(), Some("first"));
    assert!(!writer.is_saving());
    assert!(writer.is_pending());

    drop(writer);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(store.started.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.value("k").as_deref(), Some("first"));
  }

  #[tokio::test(start_paused = true)]
  async fn closing_during_running_write_still_saves() {
    let store = Arc::new(SlowStore::default());
    let mut notes = Notes::new(store.clone(), "k".to_string(), String::new(), DELAY);
    notes.insert('z');
    tokio::time::sleep(Duration::from_millis(1600)).await;
    drop(notes);

    tokio::time::sleep(WRITE_TIME).await;
    assert_eq!(store.completed.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.value("k").as_deref(), Some("z"));
  }

  #[tokio::test(start_paused = true)]
  async fn overlapping_writes_land_in_order() {
    let store = Arc::new(SlowStore::default());
    let shared: SharedStore = store.clone();
    let mut writer = DebouncedWriter::new(shared, "k".to_string(), Duration::from_millis(100));

    writer.schedule("a".to_string());
    tokio::time::sleep(Duration::from_millis(150)).await;
    writer.schedule("b".to_string());
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(store.completed.load(Ordering::SeqCst), 2);
    assert_eq!(store.inner.value("k").as_deref(), Some("b"));
    assert!(!writer.is_saving());
  }
}
