//! Turns whatever the user pasted into a playable YouTube reference.
//!
//! Every function here is total: garbage in gives `None` / `Reference::Invalid`
//! out, never an error, so the UI can call it on every keystroke.

use serde::Serialize;

use crate::constants::constants;
use crate::link::ParsedUrl;

/// Length of a YouTube video id.
const SINGLE_ID_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
  Single,
  Collection,
  Invalid,
}

/// A classified reference: one video, a playlist, or nothing playable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
  Single(String),
  Collection(String),
  Invalid,
}

impl Reference {
  pub fn kind(&self) -> ReferenceKind {
    match self {
      Reference::Single(_) => ReferenceKind::Single,
      Reference::Collection(_) => ReferenceKind::Collection,
      Reference::Invalid => ReferenceKind::Invalid,
    }
  }

  pub fn id(&self) -> Option<&str> {
    match self {
      Reference::Single(id) | Reference::Collection(id) => Some(id),
      Reference::Invalid => None,
    }
  }

  pub fn is_valid(&self) -> bool {
    self.kind() != ReferenceKind::Invalid
  }

  /// Canonical embed address. Depends on nothing but the variant and its id.
  pub fn embed_address(&self) -> Option<String> {
    let c = constants();
    match self {
      Reference::Collection(id) => Some(format!("{}/videoseries?list={}&{}", c.embed_base, id, c.embed_params)),
      Reference::Single(id) => Some(format!("{}/{}?{}", c.embed_base, id, c.embed_params)),
      Reference::Invalid => None,
    }
  }
}

impl ReferenceKind {
  pub fn label(self) -> &'static str {
    match self {
      ReferenceKind::Single => "Video",
      ReferenceKind::Collection => "Playlist",
      ReferenceKind::Invalid => "Invalid",
    }
  }
}

/// Both ids a URL may carry. A watch URL inside a playlist has both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIds {
  pub collection: Option<String>,
  pub single: Option<String>,
}

impl ReferenceIds {
  pub fn extract(raw: &str) -> Self {
    Self { collection: extract_collection_id(raw), single: extract_single_id(raw) }
  }

  /// The id used to key saved items and notes: playlist first.
  pub fn primary(&self) -> Option<&str> {
    self.collection.as_deref().or(self.single.as_deref())
  }
}

fn is_single_id(s: &str) -> bool {
  s.len() == SINGLE_ID_LEN && s.bytes().all(is_id_byte)
}

fn is_collection_id(s: &str) -> bool {
  !s.is_empty() && s.bytes().all(is_id_byte)
}

fn is_id_byte(b: u8) -> bool {
  b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

pub fn extract_single_id(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  if is_single_id(trimmed) {
    return Some(trimmed.to_string());
  }

  let url = ParsedUrl::parse(trimmed)?;

  if url.host.contains(constants().short_link_host.as_str())
    && let Some(first) = url.segments().next().filter(|s| is_single_id(s))
  {
    return Some(first.to_string());
  }

  let segments: Vec<&str> = url.segments().collect();
  let shorts = segments.windows(2).find(|pair| pair[0] == "shorts" && is_single_id(pair[1]));
  if let Some(pair) = shorts {
    return Some(pair[1].to_string());
  }

  url.query_param("v").filter(|v| is_single_id(v))
}

pub fn extract_collection_id(raw: &str) -> Option<String> {
  let url = ParsedUrl::parse(raw.trim())?;
  url.query_param("list").filter(|list| is_collection_id(list))
}

pub fn resolve(raw: &str) -> Reference {
  if let Some(id) = extract_collection_id(raw) {
    return Reference::Collection(id);
  }
  match extract_single_id(raw) {
    Some(id) => Reference::Single(id),
    None => Reference::Invalid,
  }
}

pub fn is_valid(raw: &str) -> bool {
  resolve(raw).is_valid()
}
