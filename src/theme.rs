use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub surface: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub saved: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "midnight",
    bg: Color::Rgb(0x0b, 0x0f, 0x14),
    surface: Color::Rgb(0x14, 0x1b, 0x22),
    fg: Color::Rgb(0xe6, 0xed, 0xf3),
    muted: Color::Rgb(0x6c, 0x82, 0x98),
    accent: Color::Rgb(0x2b, 0x6e, 0xf2),
    border: Color::Rgb(0x26, 0x32, 0x40),
    highlight_fg: Color::Rgb(0xff, 0xff, 0xff),
    highlight_bg: Color::Rgb(0x1f, 0x5a, 0xd9),
    stripe_bg: Color::Rgb(0x1a, 0x23, 0x29),
    status: Color::Rgb(0x9f, 0xb0, 0xc0),
    error: Color::Rgb(0xff, 0x6b, 0x6b),
    saved: Color::Rgb(0xa8, 0xff, 0x78),
    key_fg: Color::Rgb(0x0b, 0x0f, 0x14),
    key_bg: Color::Rgb(0x9f, 0xb0, 0xc0),
  },
  Theme {
    name: "paper",
    bg: Color::Rgb(0xfa, 0xf7, 0xf0),
    surface: Color::Rgb(0xef, 0xea, 0xdf),
    fg: Color::Rgb(0x2b, 0x2a, 0x27),
    muted: Color::Rgb(0x8a, 0x84, 0x78),
    accent: Color::Rgb(0xc0, 0x4a, 0x2b),
    border: Color::Rgb(0xd8, 0xd0, 0xc0),
    highlight_fg: Color::Rgb(0xfa, 0xf7, 0xf0),
    highlight_bg: Color::Rgb(0xc0, 0x4a, 0x2b),
    stripe_bg: Color::Rgb(0xf3, 0xef, 0xe6),
    status: Color::Rgb(0x5a, 0x6e, 0x3a),
    error: Color::Rgb(0xb0, 0x20, 0x20),
    saved: Color::Rgb(0x2d, 0x50, 0x16),
    key_fg: Color::Rgb(0xfa, 0xf7, 0xf0),
    key_bg: Color::Rgb(0x8a, 0x84, 0x78),
  },
  Theme {
    name: "terminal",
    bg: Color::Reset,
    surface: Color::Reset,
    fg: Color::White,
    muted: Color::DarkGray,
    accent: Color::Cyan,
    border: Color::DarkGray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Yellow,
    error: Color::Red,
    saved: Color::Green,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];
