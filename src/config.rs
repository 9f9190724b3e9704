use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::constants::constants;

/// User preferences from `prefs.toml`. Unset fields fall back to `constants.ron`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub data_dir: Option<PathBuf>,
  pub notes_debounce_ms: Option<u64>,
  pub focus_minutes: Option<u32>,
  pub break_minutes: Option<u32>,
  /// Seconds of inactivity before player controls hide; 0 keeps them visible.
  pub controls_autohide_secs: Option<u64>,
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "lostin")
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = project_dirs() {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(&config_file) {
        match toml::from_str(&content) {
          Ok(config) => return config,
          Err(e) => warn!(path = %config_file.display(), err = %e, "config: ignoring unreadable prefs"),
        }
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = project_dirs() {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }

  /// Where the store and logs live.
  pub fn data_dir(&self) -> PathBuf {
    self
      .data_dir
      .clone()
      .or_else(|| project_dirs().map(|d| d.data_dir().to_path_buf()))
      .unwrap_or_else(|| PathBuf::from(".lostin"))
  }

  pub fn notes_debounce(&self) -> Duration {
    Duration::from_millis(self.notes_debounce_ms.unwrap_or(constants().notes_debounce_ms))
  }

  pub fn focus_minutes(&self) -> u32 {
    self.focus_minutes.unwrap_or(constants().focus_minutes)
  }

  pub fn break_minutes(&self) -> u32 {
    self.break_minutes.unwrap_or(constants().break_minutes)
  }

  pub fn controls_autohide(&self) -> Option<Duration> {
    let secs = self.controls_autohide_secs.unwrap_or(constants().controls_autohide_secs);
    (secs > 0).then(|| Duration::from_secs(secs))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_come_from_constants() {
    let config = Config::default();
    assert_eq!(config.notes_debounce(), Duration::from_millis(1500));
    assert_eq!(config.focus_minutes(), 25);
    assert_eq!(config.break_minutes(), 5);
    assert_eq!(config.controls_autohide(), Some(Duration::from_secs(4)));
  }

  #[test]
  fn toml_overrides() {
    let config: Config = toml::from_str(
      r#"
      theme_name = "paper"
      data_dir = "/tmp/lostin"
      notes_debounce_ms = 500
      controls_autohide_secs = 0
      "#,
    )
    .unwrap();
    assert_eq!(config.theme_name.as_deref(), Some("paper"));
    assert_eq!(config.data_dir(), PathBuf::from("/tmp/lostin"));
    assert_eq!(config.notes_debounce(), Duration::from_millis(500));
    assert_eq!(config.controls_autohide(), None);
  }

  #[test]
  fn roundtrips_through_toml() {
    let config = Config { theme_name: Some("terminal".into()), focus_minutes: Some(50), ..Config::default() };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
  }
}
