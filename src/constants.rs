//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Embed address
  pub embed_base: String,
  pub embed_params: String,
  pub short_link_host: String,

  // Persistence keys
  pub saved_items_key: String,
  pub notes_key_prefix: String,

  // Notes
  pub notes_debounce_ms: u64,

  // Focus timer
  pub focus_minutes: u32,
  pub break_minutes: u32,
  pub quick_minutes: Vec<u32>,

  // Player controls
  pub controls_autohide_secs: u64,
  pub error_dismiss_secs: u64,

  // Store retry
  pub store_retries: u32,
  pub store_retry_backoff_ms: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed the first test run catches it.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.short_link_host, "youtu.be");
    assert_eq!(c.notes_debounce_ms, 1500);
    assert_eq!(c.quick_minutes, vec![25, 15, 5]);
  }
}
