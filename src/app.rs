use anyhow::{Context, Result, anyhow};
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::library::{self, SavedItem};
use crate::notes::{Notes, note_key};
use crate::resolver::{self, Reference, ReferenceIds};
use crate::store::SharedStore;
use crate::theme::{THEMES, Theme};
use crate::timer::FocusTimer;

// --- Types ---

type NotesLoad = (String, Result<Option<String>>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  Home,
  Player,
}

/// Which Home widget receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeFocus {
  Input,
  Saved,
}

/// Overlay panel on the Player screen. Only one is open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
  Notes,
  Timer,
}

/// A URL the user opened, with everything derived from it.
#[derive(Debug, Clone)]
pub struct Opened {
  pub url: String,
  pub ids: ReferenceIds,
  pub reference: Reference,
}

impl Opened {
  pub fn new(url: &str) -> Self {
    Self { url: url.trim().to_string(), ids: ReferenceIds::extract(url), reference: resolver::resolve(url) }
  }
}

/// State of the Player screen. Dropping it cancels any pending note write.
pub struct PlayerView {
  pub opened: Opened,
  pub embed_address: Option<String>,
  pub saved: bool,
  pub panel: Option<Panel>,
  pub controls_visible: bool,
  pub notes: Option<Notes>,
  pub notes_key: Option<String>,
  pub timer: FocusTimer,
  last_activity: Instant,
}

impl PlayerView {
  fn new(opened: Opened, config: &Config) -> Self {
    let embed_address = opened.reference.embed_address();
    let notes_key = note_key(&opened.ids);
    Self {
      opened,
      embed_address,
      saved: false,
      panel: None,
      controls_visible: true,
      notes: None,
      notes_key,
      timer: FocusTimer::new(config.focus_minutes(), config.break_minutes()),
      last_activity: Instant::now(),
    }
  }

  pub fn is_invalid(&self) -> bool {
    !self.opened.reference.is_valid()
  }

  /// Any key shows the controls again and restarts the auto-hide countdown.
  pub fn touch(&mut self) {
    self.controls_visible = true;
    self.last_activity = Instant::now();
  }

  pub fn toggle_panel(&mut self, panel: Panel) {
    self.panel = if self.panel == Some(panel) { None } else { Some(panel) };
  }

  /// Hide controls after `idle` without input. Panels keep them pinned.
  fn autohide(&mut self, now: Instant, idle: Duration) {
    if self.controls_visible && self.panel.is_none() && now.duration_since(self.last_activity) >= idle {
      debug!("player: auto-hiding controls");
      self.controls_visible = false;
    }
  }
}

/// In-flight async store calls, polled once per frame.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) library_rx: Option<oneshot::Receiver<Result<Vec<SavedItem>>>>,
  pub(crate) saved_rx: Option<oneshot::Receiver<Result<bool>>>,
  pub(crate) notes_rx: Option<oneshot::Receiver<NotesLoad>>,
}

pub struct App {
  pub config: Config,
  store: SharedStore,
  pub screen: Screen,
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub home_focus: HomeFocus,
  pub saved_items: Vec<SavedItem>,
  pub list_state: ListState,
  pub player: Option<PlayerView>,
  pub theme_index: usize,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  pub should_quit: bool,
  pub(crate) tasks: AsyncTasks,
  /// When the last error was set, for auto-dismiss.
  error_time: Option<Instant>,
  /// Last whole second delivered to the focus timer.
  last_tick: Instant,
}

impl App {
  pub fn new(config: Config, store: SharedStore) -> Self {
    let theme_index =
      if let Some(ref name) = config.theme_name { THEMES.iter().position(|t| t.name == name).unwrap_or(0) } else { 0 };

    Self {
      config,
      store,
      screen: Screen::Home,
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      home_focus: HomeFocus::Input,
      saved_items: Vec::new(),
      list_state: ListState::default(),
      player: None,
      theme_index,
      last_error: None,
      status_message: None,
      should_quit: false,
      tasks: AsyncTasks::default(),
      error_time: None,
      last_tick: Instant::now(),
    }
  }

  pub fn theme(&self) -> &'static Theme {
    // Safety: theme_index is bounded by modular arithmetic in next_theme() and by position() in new().
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  fn expire_error(&mut self, now: Instant) {
    if let Some(t) = self.error_time
      && now.duration_since(t) >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.clear_error();
    }
  }

  /// Whether the current input would open anything. Cheap enough per keystroke.
  pub fn input_is_valid(&self) -> bool {
    resolver::is_valid(&self.input)
  }

  pub fn set_input(&mut self, text: &str) {
    self.input = text.to_string();
    self.cursor_position = self.input.chars().count();
    self.input_scroll = 0;
  }

  // --- Library ---

  pub fn reload_library(&mut self) {
    let store = self.store.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(library::load(store.as_ref()).await);
    });
    self.tasks.library_rx = Some(rx);
  }

  pub fn selected_saved(&self) -> Option<&SavedItem> {
    self.list_state.selected().and_then(|i| self.saved_items.get(i))
  }

  /// Ignored while another library read-modify-write is still running.
  pub fn delete_selected_saved(&mut self) {
    if self.tasks.library_rx.is_some() {
      debug!("library: delete ignored, previous operation pending");
      return;
    }
    let Some(item_id) = self.selected_saved().map(|item| item.id.clone()) else { return };
    let store = self.store.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(library::delete(store.as_ref(), &item_id).await);
    });
    self.tasks.library_rx = Some(rx);
  }

  pub fn open_selected_saved(&mut self) {
    if let Some(url) = self.selected_saved().map(|item| item.url.clone()) {
      self.open(&url);
    }
  }

  fn apply_library(&mut self, items: Vec<SavedItem>) {
    self.saved_items = items;
    if self.saved_items.is_empty() {
      self.list_state.select(None);
      self.home_focus = HomeFocus::Input;
    } else {
      let sel = self.list_state.selected().unwrap_or(0).min(self.saved_items.len() - 1);
      self.list_state.select(Some(sel));
    }
  }

  // --- Navigation ---

  /// Open the Home input if it resolves to something playable.
  pub fn open_from_input(&mut self) {
    if !self.input_is_valid() {
      return;
    }
    let url = self.input.clone();
    self.open(&url);
  }

  /// Switch to the Player screen for `url`. Invalid input lands on the
  /// "invalid reference" state rather than failing.
  pub fn open(&mut self, url: &str) {
    let opened = Opened::new(url);
    info!(kind = ?opened.reference.kind(), id = ?opened.reference.id(), "player: opening");

    let view = PlayerView::new(opened, &self.config);
    if !view.is_invalid() {
      self.check_saved(&view.opened.ids);
      if let Some(ref key) = view.notes_key {
        self.load_notes(key.clone());
      }
    }
    self.player = Some(view);
    self.screen = Screen::Player;
    self.clear_error();
  }

  /// Leave the Player. A pending note write is cancelled, not flushed.
  pub fn back(&mut self) {
    if let Some(view) = self.player.take()
      && view.notes.as_ref().is_some_and(|n| n.has_pending_write())
    {
      debug!("notes: dropping pending write on close");
    }
    self.tasks.saved_rx = None;
    self.tasks.notes_rx = None;
    self.screen = Screen::Home;
    self.reload_library();
  }

  // --- Player actions ---

  fn check_saved(&mut self, ids: &ReferenceIds) {
    let store = self.store.clone();
    let ids = ids.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(library::is_saved(store.as_ref(), &ids).await);
    });
    self.tasks.saved_rx = Some(rx);
  }

  /// Ignored until the previous save state has come back, so two quick
  /// presses cannot both act on the same stale read.
  pub fn toggle_saved(&mut self) {
    if self.tasks.saved_rx.is_some() {
      debug!("library: toggle ignored, previous operation pending");
      return;
    }
    let Some(view) = self.player.as_ref().filter(|v| !v.is_invalid()) else { return };
    let store = self.store.clone();
    let url = view.opened.url.clone();
    let ids = view.opened.ids.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(library::toggle(store.as_ref(), &url, &ids).await);
    });
    self.tasks.saved_rx = Some(rx);
  }

  fn load_notes(&mut self, key: String) {
    let store = self.store.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = store.get(&key).await.context("Failed to load notes");
      let _ = tx.send((key, result));
    });
    self.tasks.notes_rx = Some(rx);
  }

  /// Hand the embed address to the system browser.
  pub fn open_embed(&mut self) {
    let Some(url) = self.player.as_ref().and_then(|v| v.embed_address.clone()) else { return };
    match open_external(&url) {
      Ok(()) => {
        info!(url = %url, "player: opened embed address");
        self.status_message = Some("Opened in browser".to_string());
      }
      Err(e) => {
        warn!(err = %e, "player: failed to open browser");
        self.set_error(format!("Could not open browser: {}", e));
      }
    }
  }

  // --- Clock ---

  /// Drive time-based state: timer ticks, control auto-hide, error expiry.
  pub fn on_clock(&mut self, now: Instant) {
    self.expire_error(now);

    let elapsed = now.duration_since(self.last_tick).as_secs();
    if elapsed > 0 {
      self.last_tick += Duration::from_secs(elapsed);
    }

    let idle = self.config.controls_autohide();
    let Some(view) = self.player.as_mut() else { return };
    for _ in 0..elapsed {
      if let Some(phase) = view.timer.tick() {
        info!(phase = phase.label(), "timer: phase change");
        self.status_message = Some(format!("{} time", phase.label()));
      }
    }
    if let Some(idle) = idle {
      view.autohide(now, idle);
    }
  }

  // --- Async results ---

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.library_rx.take() {
      match rx.try_recv() {
        Ok(Ok(items)) => self.apply_library(items),
        Ok(Err(e)) => {
          error!(err = %format!("{:#}", e), "library: operation failed");
          self.set_error("Could not update saved items.".to_string());
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.library_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.set_error("Library task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.saved_rx.take() {
      match rx.try_recv() {
        Ok(Ok(saved)) => {
          if let Some(view) = self.player.as_mut() {
            view.saved = saved;
          }
        }
        Ok(Err(e)) => {
          error!(err = %format!("{:#}", e), "library: save state failed");
          self.set_error("Could not update saved state.".to_string());
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.saved_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.set_error("Save task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.notes_rx.take() {
      match rx.try_recv() {
        Ok((key, result)) => self.apply_notes(key, result),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.notes_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.set_error("Notes task failed.".to_string());
        }
      }
    }
  }

  fn apply_notes(&mut self, key: String, result: Result<Option<String>>) {
    let delay = self.config.notes_debounce();
    let store = self.store.clone();
    let Some(view) = self.player.as_mut().filter(|v| v.notes_key.as_deref() == Some(key.as_str())) else {
      return;
    };
    let initial = match result {
      Ok(text) => text.unwrap_or_default(),
      Err(e) => {
        // Keep editing possible; the first flush recreates the key.
        error!(key = %key, err = %format!("{:#}", e), "notes: load failed");
        String::new()
      }
    };
    view.notes = Some(Notes::new(store, key, initial, delay));
  }
}

/// Open `url` with the platform's default handler.
fn open_external(url: &str) -> Result<()> {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  let mut child = std::process::Command::new(cmd)
    .arg(url)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()
    .map_err(|e| anyhow!(e).context(format!("Failed to run {}", cmd)))?;
  // Reap the child in a background thread to avoid zombie processes.
  std::thread::spawn(move || {
    let _ = child.wait();
  });
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::memory::MemoryStore;
  use crate::timer::TimerState;
  use std::sync::Arc;

  const VIDEO_URL: &str = "https://youtu.be/dQw4w9WgXcQ";

  fn test_app() -> (App, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let shared: SharedStore = store.clone();
    (App::new(Config::default(), shared), store)
  }

  /// Yield until spawned store tasks have reported back.
  async fn settle(app: &mut App) {
    for _ in 0..20 {
      tokio::task::yield_now().await;
      app.check_pending();
    }
  }

  #[test]
  fn opened_keeps_both_ids() {
    let opened = Opened::new(" https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1 ");
    assert_eq!(opened.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1");
    assert_eq!(opened.reference, Reference::Collection("PL1".to_string()));
    assert_eq!(opened.ids.single.as_deref(), Some("dQw4w9WgXcQ"));
  }

  #[test]
  fn panel_toggle_is_exclusive() {
    let mut view = PlayerView::new(Opened::new(VIDEO_URL), &Config::default());
    view.toggle_panel(Panel::Notes);
    assert_eq!(view.panel, Some(Panel::Notes));
    view.toggle_panel(Panel::Timer);
    assert_eq!(view.panel, Some(Panel::Timer));
    view.toggle_panel(Panel::Timer);
    assert_eq!(view.panel, None);
  }

  #[test]
  fn autohide_waits_for_idle_and_respects_panels() {
    let mut view = PlayerView::new(Opened::new(VIDEO_URL), &Config::default());
    let start = view.last_activity;
    view.autohide(start + Duration::from_secs(1), Duration::from_secs(4));
    assert!(view.controls_visible);

    view.panel = Some(Panel::Notes);
    view.autohide(start + Duration::from_secs(10), Duration::from_secs(4));
    assert!(view.controls_visible);

    view.panel = None;
    view.autohide(start + Duration::from_secs(10), Duration::from_secs(4));
    assert!(!view.controls_visible);
    view.touch();
    assert!(view.controls_visible);
  }

  #[tokio::test]
  async fn invalid_input_does_not_open() {
    let (mut app, _) = test_app();
    app.set_input("not a url");
    assert!(!app.input_is_valid());
    app.open_from_input();
    assert_eq!(app.screen, Screen::Home);
    assert!(app.player.is_none());
  }

  #[tokio::test]
  async fn open_invalid_url_shows_invalid_state() {
    let (mut app, _) = test_app();
    app.open("https://example.com/");
    let view = app.player.as_ref().unwrap();
    assert!(view.is_invalid());
    assert_eq!(view.embed_address, None);
    assert!(app.tasks.notes_rx.is_none());
  }

  #[tokio::test]
  async fn open_loads_existing_notes() {
    let (mut app, store) = test_app();
    store.insert("lostin_notes_video_dQw4w9WgXcQ", "remember this");
    app.set_input(VIDEO_URL);
    app.open_from_input();
    settle(&mut app).await;

    let view = app.player.as_ref().unwrap();
    assert_eq!(app.screen, Screen::Player);
    assert_eq!(view.notes.as_ref().map(|n| n.text()), Some("remember this"));
    assert!(!view.saved);
  }

  #[tokio::test]
  async fn notes_load_failure_still_allows_editing() {
    let (mut app, store) = test_app();
    app.open(VIDEO_URL);
    // Both the saved-state read and the notes read fail.
    store.fail_next(2);
    settle(&mut app).await;

    let view = app.player.as_ref().unwrap();
    assert_eq!(view.notes.as_ref().map(|n| n.text()), Some(""));
    assert!(!view.saved);
    assert!(app.last_error.is_some());
  }

  #[tokio::test]
  async fn toggle_saved_updates_view_and_library() {
    let (mut app, _) = test_app();
    app.open(VIDEO_URL);
    settle(&mut app).await;

    app.toggle_saved();
    settle(&mut app).await;
    assert!(app.player.as_ref().unwrap().saved);

    app.back();
    settle(&mut app).await;
    assert_eq!(app.screen, Screen::Home);
    assert_eq!(app.saved_items.len(), 1);
    assert_eq!(app.list_state.selected(), Some(0));

    app.delete_selected_saved();
    settle(&mut app).await;
    assert!(app.saved_items.is_empty());
    assert_eq!(app.list_state.selected(), None);
  }

  #[tokio::test]
  async fn double_toggle_before_result_acts_once() {
    let (mut app, store) = test_app();
    app.open(VIDEO_URL);
    settle(&mut app).await;

    app.toggle_saved();
    app.toggle_saved();
    settle(&mut app).await;
    assert!(app.player.as_ref().unwrap().saved);
    assert_eq!(store.writes(), 1);

    app.toggle_saved();
    settle(&mut app).await;
    assert!(!app.player.as_ref().unwrap().saved);
    assert_eq!(store.writes(), 2);
  }

  #[tokio::test]
  async fn toggle_waits_for_initial_saved_check() {
    let (mut app, store) = test_app();
    app.open(VIDEO_URL);
    app.toggle_saved();
    settle(&mut app).await;
    assert!(!app.player.as_ref().unwrap().saved);
    assert_eq!(store.writes(), 0);
  }

  #[tokio::test]
  async fn clock_drives_timer() {
    let (mut app, _) = test_app();
    app.open(VIDEO_URL);
    app.player.as_mut().unwrap().timer.toggle();
    let start = app.last_tick;
    app.on_clock(start + Duration::from_millis(2500));
    let timer = &app.player.as_ref().unwrap().timer;
    assert_eq!(timer.state(), TimerState::Running);
    assert_eq!(timer.display(), "24:58");
    // The half second carries over to the next call.
    app.on_clock(start + Duration::from_millis(3000));
    assert_eq!(app.player.as_ref().unwrap().timer.display(), "24:57");
  }

  #[tokio::test]
  async fn errors_expire() {
    let (mut app, _) = test_app();
    app.set_error("boom".to_string());
    let set_at = app.error_time.unwrap();
    app.on_clock(set_at + Duration::from_secs(1));
    assert!(app.last_error.is_some());
    app.on_clock(set_at + Duration::from_secs(6));
    assert!(app.last_error.is_none());
  }
}
