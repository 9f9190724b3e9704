//! Focus (pomodoro) timer as an explicit state machine.
//!
//! The timer owns no clock. Whoever drives it calls [`FocusTimer::tick`] once
//! per elapsed second.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
  Idle,
  Running,
  Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Focus,
  Break,
}

impl Phase {
  pub fn label(self) -> &'static str {
    match self {
      Phase::Focus => "Focus",
      Phase::Break => "Break",
    }
  }

  fn flipped(self) -> Self {
    match self {
      Phase::Focus => Phase::Break,
      Phase::Break => Phase::Focus,
    }
  }
}

#[derive(Debug, Clone)]
pub struct FocusTimer {
  state: TimerState,
  phase: Phase,
  seconds_left: u32,
  focus_secs: u32,
  break_secs: u32,
}

impl FocusTimer {
  pub fn new(focus_minutes: u32, break_minutes: u32) -> Self {
    let focus_secs = focus_minutes.saturating_mul(60);
    Self {
      state: TimerState::Idle,
      phase: Phase::Focus,
      seconds_left: focus_secs,
      focus_secs,
      break_secs: break_minutes.saturating_mul(60),
    }
  }

  pub fn state(&self) -> TimerState {
    self.state
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn is_running(&self) -> bool {
    self.state == TimerState::Running
  }

  /// Start or pause.
  pub fn toggle(&mut self) {
    self.state = match self.state {
      TimerState::Idle | TimerState::Paused => TimerState::Running,
      TimerState::Running => TimerState::Paused,
    };
  }

  pub fn reset(&mut self) {
    self.state = TimerState::Idle;
    self.phase = Phase::Focus;
    self.seconds_left = self.focus_secs;
  }

  /// Stop and load a custom duration for the current phase.
  pub fn set_minutes(&mut self, minutes: u32) {
    self.state = TimerState::Idle;
    self.seconds_left = minutes.saturating_mul(60);
  }

  /// Advance one second. Returns the new phase when the countdown rolls over.
  pub fn tick(&mut self) -> Option<Phase> {
    if self.state != TimerState::Running {
      return None;
    }
    if self.seconds_left <= 1 {
      self.phase = self.phase.flipped();
      self.seconds_left = match self.phase {
        Phase::Focus => self.focus_secs,
        Phase::Break => self.break_secs,
      };
      return Some(self.phase);
    }
    self.seconds_left -= 1;
    None
  }

  /// Remaining time as `MM:SS`.
  pub fn display(&self) -> String {
    format!("{:02}:{:02}", self.seconds_left / 60, self.seconds_left % 60)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_idle_in_focus() {
    let t = FocusTimer::new(25, 5);
    assert_eq!(t.state(), TimerState::Idle);
    assert_eq!(t.phase(), Phase::Focus);
    assert_eq!(t.display(), "25:00");
  }

  #[test]
  fn toggle_cycles_running_and_paused() {
    let mut t = FocusTimer::new(25, 5);
    t.toggle();
    assert_eq!(t.state(), TimerState::Running);
    t.toggle();
    assert_eq!(t.state(), TimerState::Paused);
    t.toggle();
    assert!(t.is_running());
  }

  #[test]
  fn tick_only_counts_while_running() {
    let mut t = FocusTimer::new(1, 1);
    t.tick();
    assert_eq!(t.display(), "01:00");
    t.toggle();
    t.tick();
    assert_eq!(t.display(), "00:59");
    t.toggle();
    t.tick();
    assert_eq!(t.display(), "00:59");
  }

  #[test]
  fn rollover_flips_phase_and_keeps_running() {
    let mut t = FocusTimer::new(1, 2);
    t.toggle();
    let changes: Vec<Phase> = (0..60).filter_map(|_| t.tick()).collect();
    assert_eq!(changes, vec![Phase::Break]);
    assert_eq!(t.display(), "02:00");
    assert!(t.is_running());

    let changes: Vec<Phase> = (0..120).filter_map(|_| t.tick()).collect();
    assert_eq!(changes, vec![Phase::Focus]);
    assert_eq!(t.display(), "01:00");
  }

  #[test]
  fn reset_returns_to_focus_idle() {
    let mut t = FocusTimer::new(1, 1);
    t.toggle();
    for _ in 0..60 {
      t.tick();
    }
    assert_eq!(t.phase(), Phase::Break);
    t.reset();
    assert_eq!(t.state(), TimerState::Idle);
    assert_eq!(t.phase(), Phase::Focus);
    assert_eq!(t.display(), "01:00");
  }

  #[test]
  fn set_minutes_stops_and_loads() {
    let mut t = FocusTimer::new(25, 5);
    t.toggle();
    t.set_minutes(15);
    assert_eq!(t.state(), TimerState::Idle);
    assert_eq!(t.display(), "15:00");
  }

  #[test]
  fn display_pads() {
    let mut t = FocusTimer::new(0, 0);
    t.set_minutes(5);
    t.toggle();
    for _ in 0..61 {
      t.tick();
    }
    assert_eq!(t.display(), "03:59");
  }
}
