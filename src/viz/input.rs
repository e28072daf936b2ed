use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, Instant},
};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

use crate::action::Action;

/// What a key means on every terminal screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Command {
    Quit,
    NextTab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Select,
    More,
    Less,
    Hide,
    Focus,
}

impl Command {
    pub(super) fn from_key(code: KeyCode) -> Option<Self> {
        let command = match code {
            KeyCode::Char('q') | KeyCode::Esc => Self::Quit,
            KeyCode::Tab => Self::NextTab,
            KeyCode::Up => Self::Up,
            KeyCode::Down => Self::Down,
            KeyCode::Left => Self::Left,
            KeyCode::Right => Self::Right,
            KeyCode::PageUp => Self::PageUp,
            KeyCode::PageDown => Self::PageDown,
            KeyCode::Char(' ') => Self::Select,
            KeyCode::Char('+') => Self::More,
            KeyCode::Char('-') => Self::Less,
            KeyCode::Char('h') => Self::Hide,
            KeyCode::Char('f') => Self::Focus,
            _ => return None,
        };
        Some(command)
    }
}

/// The command of a key press, ignoring repeats and releases
pub(super) fn pressed(event: &Event) -> Option<Command> {
    match event {
        Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) => Command::from_key(*code),
        _ => None,
    }
}

/// How long a key counts as held after its last press or repeat when the terminal
/// does not report releases; covers the usual autorepeat delay
const HOLD: Duration = Duration::from_millis(300);

#[derive(Debug, Default)]
struct Held {
    up: Option<Instant>,
    left: Option<Instant>,
    right: Option<Instant>,
    releases_reported: bool,
}

impl Held {
    fn slot(&mut self, command: Command) -> Option<&mut Option<Instant>> {
        match command {
            Command::Up => Some(&mut self.up),
            Command::Left => Some(&mut self.left),
            Command::Right => Some(&mut self.right),
            _ => None,
        }
    }

    fn is_down(&self, pressed: Option<Instant>, now: Instant) -> bool {
        pressed.is_some_and(|t| self.releases_reported || now.saturating_duration_since(t) < HOLD)
    }
}

/// Arrow keys currently held, shared between the screen reading terminal events and
/// a [`ManualPolicy`](super::ManualPolicy) turning them into actions
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    held: Rc<RefCell<Held>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a terminal event received at `now`
    pub fn handle(&self, event: &Event, now: Instant) {
        let Event::Key(key) = event else {
            return;
        };
        let Some(command) = Command::from_key(key.code) else {
            return;
        };
        let mut held = self.held.borrow_mut();
        if key.kind == KeyEventKind::Release {
            held.releases_reported = true;
        }
        if let Some(slot) = held.slot(command) {
            *slot = match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => Some(now),
                KeyEventKind::Release => None,
            };
        }
    }

    /// Action made of the arrow keys held at `now`: up jumps, left and right thrust
    pub fn action(&self, now: Instant) -> Action {
        let held = self.held.borrow();
        Action::new(
            held.is_down(held.up, now),
            held.is_down(held.left, now),
            held.is_down(held.right, now),
        )
    }
}
