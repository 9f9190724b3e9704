//! Saved videos and playlists, stored as one JSON array under a fixed key.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::constants;
use crate::resolver::ReferenceIds;
use crate::store::KvStore;

/// Characters of a playlist id shown in its default title.
const TITLE_ID_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
  pub id: String,
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub collection_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub single_id: Option<String>,
  #[serde(default)]
  pub title: String,
}

impl SavedItem {
  /// Build an item for `url`. Returns `None` when it carries no id at all.
  pub fn new(url: &str, ids: &ReferenceIds) -> Option<Self> {
    let id = ids.primary()?.to_string();
    let title = match (&ids.collection, &ids.single) {
      (Some(list), _) => format!("Playlist {}", list.chars().take(TITLE_ID_CHARS).collect::<String>()),
      (None, Some(video)) => format!("Video {}", video),
      (None, None) => String::new(),
    };
    Some(Self {
      id,
      url: url.to_string(),
      collection_id: ids.collection.clone(),
      single_id: ids.single.clone(),
      title,
    })
  }

  pub fn matches(&self, ids: &ReferenceIds) -> bool {
    (ids.collection.is_some() && self.collection_id == ids.collection)
      || (ids.single.is_some() && self.single_id == ids.single)
  }

  pub fn is_collection(&self) -> bool {
    self.collection_id.is_some()
  }

  /// Display label, falling back to the URL for untitled items.
  pub fn label(&self) -> &str {
    if self.title.is_empty() { &self.url } else { &self.title }
  }
}

pub async fn load(store: &dyn KvStore) -> Result<Vec<SavedItem>> {
  let key = &constants().saved_items_key;
  match store.get(key).await.context("Failed to read saved items")? {
    Some(data) if !data.trim().is_empty() => serde_json::from_str(&data).context("Saved items are not valid JSON"),
    _ => Ok(Vec::new()),
  }
}

async fn write(store: &dyn KvStore, items: &[SavedItem]) -> Result<()> {
  let data = serde_json::to_string(items).context("Failed to encode saved items")?;
  store.set(&constants().saved_items_key, &data).await.context("Failed to write saved items")
}

pub async fn is_saved(store: &dyn KvStore, ids: &ReferenceIds) -> Result<bool> {
  Ok(load(store).await?.iter().any(|item| item.matches(ids)))
}

/// Append `url` to the library unless it is already there. Returns the new list.
pub async fn save(store: &dyn KvStore, url: &str, ids: &ReferenceIds) -> Result<Vec<SavedItem>> {
  let mut items = load(store).await?;
  if items.iter().any(|item| item.matches(ids)) {
    return Ok(items);
  }
  let Some(item) = SavedItem::new(url, ids) else {
    return Ok(items);
  };
  info!(id = %item.id, "library: saved");
  items.push(item);
  write(store, &items).await?;
  Ok(items)
}

/// Remove every item matching either id. Returns the new list.
pub async fn remove(store: &dyn KvStore, ids: &ReferenceIds) -> Result<Vec<SavedItem>> {
  let mut items = load(store).await?;
  let before = items.len();
  items.retain(|item| !item.matches(ids));
  if items.len() != before {
    info!(removed = before - items.len(), "library: unsaved");
    write(store, &items).await?;
  }
  Ok(items)
}

/// Remove the item whose `id` is `item_id`. Returns the new list.
pub async fn delete(store: &dyn KvStore, item_id: &str) -> Result<Vec<SavedItem>> {
  let mut items = load(store).await?;
  let before = items.len();
  items.retain(|item| item.id != item_id);
  if items.len() != before {
    info!(id = %item_id, "library: deleted");
    write(store, &items).await?;
  }
  Ok(items)
}

/// Save or unsave depending on the current state. Returns whether it is now saved.
pub async fn toggle(store: &dyn KvStore, url: &str, ids: &ReferenceIds) -> Result<bool> {
  if is_saved(store, ids).await? {
    remove(store, ids).await?;
    Ok(false)
  } else {
    let items = save(store, url, ids).await?;
    Ok(items.iter().any(|item| item.matches(ids)))
  }
}
