use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, HomeFocus, Panel, Screen};
use crate::constants::constants;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  app.status_message = None;

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  match app.screen {
    Screen::Home => match app.home_focus {
      HomeFocus::Input => handle_input_key(app, key),
      HomeFocus::Saved => handle_saved_key(app, key),
    },
    Screen::Player => handle_player_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      app.open_from_input();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.set_input("");
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down | KeyCode::Tab => {
      if !app.saved_items.is_empty() {
        app.home_focus = HomeFocus::Saved;
        if app.list_state.selected().is_none() {
          app.list_state.select(Some(0));
        }
      }
    }
    _ => {}
  }
}

fn handle_saved_key(app: &mut App, key: KeyEvent) {
  let count = app.saved_items.len();
  match key.code {
    KeyCode::Enter => {
      app.open_selected_saved();
    }
    KeyCode::Down | KeyCode::Char('j') => {
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| (i + 1) % count);
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Delete | KeyCode::Char('d') => {
      app.delete_selected_saved();
    }
    KeyCode::Esc | KeyCode::Tab => {
      app.home_focus = HomeFocus::Input;
    }
    _ => {}
  }
}

fn handle_player_key(app: &mut App, key: KeyEvent) {
  let Some(view) = app.player.as_mut() else {
    app.screen = Screen::Home;
    return;
  };
  view.touch();

  if view.is_invalid() {
    if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace) {
      app.back();
    }
    return;
  }

  match view.panel {
    Some(Panel::Notes) => handle_notes_key(app, key),
    Some(Panel::Timer) => handle_timer_key(app, key),
    None => match key.code {
      KeyCode::Esc | KeyCode::Char('b') => app.back(),
      KeyCode::Enter | KeyCode::Char('o') => app.open_embed(),
      KeyCode::Char('n') => view.toggle_panel(Panel::Notes),
      KeyCode::Char('t') => view.toggle_panel(Panel::Timer),
      KeyCode::Char('s') => app.toggle_saved(),
      KeyCode::Char('h') => view.controls_visible = !view.controls_visible,
      _ => {}
    },
  }
}

fn handle_notes_key(app: &mut App, key: KeyEvent) {
  let Some(view) = app.player.as_mut() else { return };
  if key.code == KeyCode::Esc {
    view.panel = None;
    return;
  }
  // Keys before the saved text arrives are dropped so they can't be overwritten.
  let Some(notes) = view.notes.as_mut() else { return };
  match key.code {
    KeyCode::Char(c) => notes.insert(c),
    KeyCode::Enter => notes.insert('\n'),
    KeyCode::Tab => notes.insert('\t'),
    KeyCode::Backspace => notes.backspace(),
    _ => {}
  }
}

fn handle_timer_key(app: &mut App, key: KeyEvent) {
  let Some(view) = app.player.as_mut() else { return };
  let quick = &constants().quick_minutes;
  match key.code {
    KeyCode::Esc | KeyCode::Char('t') => view.panel = None,
    KeyCode::Char(' ') => view.timer.toggle(),
    KeyCode::Char('r') => view.timer.reset(),
    KeyCode::Char(c @ '1'..='9') => {
      let idx = (c as usize) - ('1' as usize);
      if let Some(&minutes) = quick.get(idx) {
        view.timer.set_minutes(minutes);
      }
    }
    _ => {}
  }
}
