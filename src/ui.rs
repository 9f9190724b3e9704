use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, HomeFocus, Panel, PlayerView, Screen};
use crate::constants::constants;
use crate::theme::Theme;
use crate::timer::TimerState;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Keep the cursor column inside a window `width` wide. Returns its offset
/// from the window's left edge.
fn scroll_to_cursor(scroll: &mut usize, cursor_col: usize, width: usize) -> usize {
  if cursor_col < *scroll {
    *scroll = cursor_col;
  } else if cursor_col >= *scroll + width {
    *scroll = (cursor_col + 1).saturating_sub(width);
  }
  cursor_col.saturating_sub(*scroll)
}

/// Footer label for the quick-duration keys, e.g. `1-3`.
fn quick_keys_label(count: usize) -> String {
  match count.min(9) {
    0 | 1 => "1".to_string(),
    n => format!("1-{}", n),
  }
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, footer_area] =
    Layout::vertical([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
      .areas(frame.area());

  render_header(frame, theme, header_area);
  match app.screen {
    Screen::Home => render_home(frame, app, main_area),
    Screen::Player => render_player(frame, app, main_area),
  }
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ▶ LostIn ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

// --- Home ---

fn render_home(frame: &mut Frame, app: &mut App, area: Rect) {
  let [intro_area, input_area, button_area, saved_area] =
    Layout::vertical([Constraint::Length(4), Constraint::Length(3), Constraint::Length(1), Constraint::Min(3)])
      .areas(area);

  let theme = app.theme();
  let intro = vec![
    Line::from(""),
    Line::from(Span::styled("Distraction-free YouTube learning", Style::default().fg(theme.fg))),
    Line::from(Span::styled(
      "Paste any YouTube URL. We'll open it distraction-free.",
      Style::default().fg(theme.muted),
    )),
  ];
  frame.render_widget(Paragraph::new(intro).alignment(Alignment::Center), intro_area);

  render_input(frame, app, input_area);
  render_open_button(frame, app, button_area);
  render_saved(frame, app, saved_area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.home_focus == HomeFocus::Input;
  let border_color = if focused { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" YouTube URL ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);
  let cursor_offset = scroll_to_cursor(&mut app.input_scroll, cursor_col, inner_w);

  let paragraph = if app.input.is_empty() {
    Paragraph::new(Span::styled("Paste video or playlist link", Style::default().fg(theme.muted)))
  } else {
    let visible: String = app
      .input
      .chars()
      .scan(0usize, |col, c| {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        let start = *col;
        *col += w;
        Some((start, *col, c))
      })
      .skip_while(|(_, end, _)| *end <= app.input_scroll)
      .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
      .map(|(_, _, c)| c)
      .collect();
    Paragraph::new(visible).style(Style::default().fg(theme.fg))
  };
  frame.render_widget(paragraph.block(input_block), area);

  if focused {
    let cursor_x = area.x + 2 + cursor_offset as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_open_button(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let line = if app.input_is_valid() {
    Line::from(vec![
      Span::styled(" ▶ Open ", Style::default().fg(theme.highlight_fg).bg(theme.accent).add_modifier(Modifier::BOLD)),
      Span::styled("  Enter", Style::default().fg(theme.muted)),
    ])
  } else {
    Line::from(Span::styled(" Enter URL ", Style::default().fg(theme.muted).bg(theme.surface)))
  };
  frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn render_saved(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  if app.saved_items.is_empty() {
    return;
  }

  let inner_w = area.width.saturating_sub(4) as usize;
  let items: Vec<ListItem> = app
    .saved_items
    .iter()
    .enumerate()
    .map(|(i, item)| {
      let kind = if item.is_collection() { "Playlist" } else { "Video" };
      let icon = if item.is_collection() { "≡ " } else { "▷ " };
      let title_max = inner_w.saturating_sub(kind.len() + icon.chars().count() + 2);
      let title = truncate_str(item.label(), title_max);
      let gap = inner_w.saturating_sub(icon.chars().count() + title.chars().count() + kind.len());
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      ListItem::new(Line::from(vec![
        Span::styled(icon, Style::default().fg(theme.accent)),
        Span::styled(title, Style::default().fg(theme.fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(kind, Style::default().fg(theme.muted)),
      ]))
      .bg(bg)
    })
    .collect();

  let focused = app.home_focus == HomeFocus::Saved;
  let border_color = if focused { theme.accent } else { theme.border };
  let list = List::new(items)
    .block(
      Block::bordered()
        .title(format!(" Saved Playlists ({}) ", app.saved_items.len()))
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color)),
    )
    .highlight_symbol(if focused { "▶ " } else { "  " })
    .highlight_style(if focused {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default()
    });

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

// --- Player ---

fn render_player(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let Some(view) = app.player.as_ref() else { return };

  if view.is_invalid() {
    render_invalid(frame, theme, area);
    return;
  }

  let toolbar_h = if view.controls_visible { 3 } else { 0 };
  let [stage_area, toolbar_area] =
    Layout::vertical([Constraint::Min(5), Constraint::Length(toolbar_h)]).areas(area);

  render_stage(frame, theme, view, stage_area);
  if view.controls_visible {
    render_toolbar(frame, theme, view, toolbar_area);
  }

  match view.panel {
    Some(Panel::Notes) => render_notes(frame, theme, view, stage_area),
    Some(Panel::Timer) => render_timer(frame, theme, view, stage_area),
    None => {}
  }
}

fn render_invalid(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("Invalid YouTube URL", Style::default().fg(theme.error).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Press Enter to go back.", Style::default().fg(theme.muted))),
  ];
  frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme)), area);
}

fn render_stage(frame: &mut Frame, theme: &Theme, view: &PlayerView, area: Rect) {
  let reference = &view.opened.reference;
  let inner_w = area.width.saturating_sub(4) as usize;

  let mut lines = vec![
    Line::from(""),
    Line::from(Span::styled(
      format!("{}  {}", reference.kind().label(), reference.id().unwrap_or_default()),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
  ];
  if let Some(ref embed) = view.embed_address {
    lines.push(Line::from(Span::styled(
      truncate_str(embed, inner_w),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    )));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled("Press Enter to play in your browser.", Style::default().fg(theme.muted))));

  let mut block = rounded(theme).padding(Padding::horizontal(1));
  if view.controls_visible {
    block = block.title(Span::styled(" ← Back (Esc) ", Style::default().fg(theme.fg)));
  }
  frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(block), area);
}

fn render_toolbar(frame: &mut Frame, theme: &Theme, view: &PlayerView, area: Rect) {
  let [notes_area, save_area, timer_area] =
    Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)]).areas(area);

  let button = |label: String, active: bool, color: Color| {
    let style = if active { Style::default().fg(color).add_modifier(Modifier::BOLD) } else { Style::default().fg(theme.fg) };
    Paragraph::new(Span::styled(label, style)).alignment(Alignment::Center).block(
      rounded(theme).border_style(Style::default().fg(if active { color } else { theme.border })),
    )
  };

  let save_label = if view.saved { "✓ Saved (s)" } else { "☆ Save (s)" };
  frame.render_widget(button("✎ Notes (n)".to_string(), view.panel == Some(Panel::Notes), theme.accent), notes_area);
  frame.render_widget(button(save_label.to_string(), view.saved, theme.saved), save_area);
  frame.render_widget(button("⏱ Timer (t)".to_string(), view.panel == Some(Panel::Timer), theme.accent), timer_area);
}

/// Centered overlay covering most of `area`.
fn overlay_rect(area: Rect) -> Rect {
  let w = area.width.saturating_sub(8).max(area.width.min(20));
  let h = area.height.saturating_sub(2).max(area.height.min(5));
  Rect { x: area.x + (area.width - w) / 2, y: area.y + (area.height - h) / 2, width: w, height: h }
}

fn render_notes(frame: &mut Frame, theme: &Theme, view: &PlayerView, area: Rect) {
  let rect = overlay_rect(area);
  frame.render_widget(Clear, rect);

  let mut title = vec![Span::styled(" Notes ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  if view.notes.as_ref().is_some_and(|n| n.is_saving()) {
    title.push(Span::styled("Saving… ", Style::default().fg(theme.muted)));
  }
  let block = rounded(theme).title(Line::from(title)).padding(Padding::horizontal(1)).bg(theme.surface);

  let body = match view.notes {
    Some(ref notes) if notes.text().is_empty() => {
      Paragraph::new(Span::styled("Add your notes here...", Style::default().fg(theme.muted)))
    }
    Some(ref notes) => Paragraph::new(format!("{}▏", notes.text())).style(Style::default().fg(theme.fg)),
    None => Paragraph::new(Span::styled("Loading…", Style::default().fg(theme.muted))),
  };
  frame.render_widget(body.wrap(Wrap { trim: false }).block(block), rect);
}

fn render_timer(frame: &mut Frame, theme: &Theme, view: &PlayerView, area: Rect) {
  let rect = overlay_rect(area);
  frame.render_widget(Clear, rect);

  let timer = &view.timer;
  let action = if timer.is_running() { "Pause" } else { "Start" };
  let quick: Vec<String> =
    constants().quick_minutes.iter().enumerate().map(|(i, m)| format!("[{}] {}m", i + 1, m)).collect();

  let lines = vec![
    Line::from(""),
    Line::from(Span::styled(timer.phase().label().to_uppercase(), Style::default().fg(theme.muted))),
    Line::from(Span::styled(timer.display(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(vec![
      Span::styled(format!(" Space {} ", action), Style::default().fg(theme.highlight_fg).bg(theme.accent)),
      Span::raw("  "),
      Span::styled(" r Reset ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
    ]),
    Line::from(""),
    Line::from(Span::styled(quick.join("   "), Style::default().fg(theme.muted))),
  ];
  let block = rounded(theme)
    .title(Span::styled(" Pomodoro Timer ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .bg(theme.surface);
  frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(block), rect);
}

// --- Status & footer ---

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(msg) = &app.status_message {
    (format!(" {}", msg), Style::default().fg(theme.status))
  } else if let Some(view) = app.player.as_ref().filter(|v| v.timer.state() != TimerState::Idle) {
    (format!(" ⏱ {} {}", view.timer.phase().label(), view.timer.display()), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let quick_keys = quick_keys_label(constants().quick_minutes.len());
  let keys: Vec<(&str, &str)> = match app.screen {
    Screen::Home => match app.home_focus {
      HomeFocus::Input => {
        let mut k = vec![("Enter", "Open"), ("^t", "Theme")];
        if !app.saved_items.is_empty() {
          k.push(("Tab", "Saved"));
        }
        k.push(("Esc", "Quit"));
        k
      }
      HomeFocus::Saved => vec![("Enter", "Open"), ("j/k", "Navigate"), ("d", "Delete"), ("Tab", "Input")],
    },
    Screen::Player => match app.player.as_ref() {
      Some(view) if view.is_invalid() => vec![("Enter", "Go Back")],
      Some(view) => match view.panel {
        Some(Panel::Notes) => vec![("Type", "Edit"), ("Esc", "Done")],
        Some(Panel::Timer) => vec![("Space", "Start/Pause"), ("r", "Reset"), (quick_keys.as_str(), "Duration"), ("Esc", "Done")],
        None => vec![("Enter", "Play"), ("n", "Notes"), ("s", "Save"), ("t", "Timer"), ("h", "Hide"), ("Esc", "Back")],
      },
      None => Vec::new(),
    },
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
