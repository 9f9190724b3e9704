mod app;
mod config;
mod constants;
mod input;
mod library;
mod link;
mod notes;
mod resolver;
mod store;
mod theme;
mod timer;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use constants::constants;
use resolver::{ReferenceKind, resolve};
use store::{FileStore, Retrying, SharedStore};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Distraction-free YouTube learning", long_about = None)]
struct Args {
  /// YouTube URL or bare video id to open right away
  url: Option<String>,

  /// Print the resolved reference as JSON and exit
  #[arg(long, requires = "url")]
  resolve: bool,

  /// Directory for saved items, notes and logs (overrides prefs.toml)
  #[arg(long)]
  data_dir: Option<PathBuf>,
}

/// JSON shape printed by `--resolve`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolution<'a> {
  kind: ReferenceKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  id: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  embed_address: Option<String>,
}

// --- Logging ---

/// Log to a daily file in the data dir; the terminal belongs to the UI.
fn init_logging(dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
  let appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix("lostin")
    .filename_suffix("log")
    .build(dir)
    .context("Failed to open log file")?;
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_env("LOSTIN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Ok(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if args.resolve {
    let raw = args.url.as_deref().unwrap_or_default();
    let reference = resolve(raw);
    let out = Resolution { kind: reference.kind(), id: reference.id(), embed_address: reference.embed_address() };
    println!("{}", serde_json::to_string_pretty(&out).context("Failed to encode resolution")?);
    return Ok(());
  }

  let mut config = Config::load();
  if let Some(dir) = args.data_dir {
    config.data_dir = Some(dir);
  }
  let data_dir = config.data_dir();
  let _log_guard = init_logging(&data_dir)?;
  info!(data_dir = %data_dir.display(), "lostin starting");

  let c = constants();
  let store: SharedStore = Arc::new(Retrying::new(
    FileStore::new(&data_dir),
    c.store_retries,
    Duration::from_millis(c.store_retry_backoff_ms),
  ));

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, config, store, args.url).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, config: Config, store: SharedStore, url: Option<String>) -> Result<()> {
  let mut app = App::new(config, store);
  app.reload_library();
  if let Some(url) = url {
    app.set_input(&url);
    app.open(&url);
  }

  loop {
    app.check_pending();
    app.on_clock(Instant::now());

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("lostin exiting");
  Ok(())
}
