use std::{
    io::{self, stdout, Stdout},
    ops::{Deref, DerefMut},
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        Once,
    },
};

use crossterm::{
    cursor,
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use log::debug;
use ratatui::{backend::CrosstermBackend, Terminal};

type Backend = CrosstermBackend<Stdout>;

static PANIC_HOOK: Once = Once::new();
static KEY_RELEASES: AtomicBool = AtomicBool::new(false);

/// The alternate screen in raw mode, left again on drop
pub struct Screen {
    terminal: Terminal<Backend>,
}

impl Screen {
    /// Enter the alternate screen
    ///
    /// With `key_releases`, also ask the terminal to report key releases and repeats
    /// where it supports that, so held keys can be tracked.
    pub fn enter(key_releases: bool) -> io::Result<Self> {
        PANIC_HOOK.call_once(init_panic_hook);
        execute!(stdout(), EnterAlternateScreen, cursor::Hide)?;
        enable_raw_mode()?;
        if key_releases && supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            KEY_RELEASES.store(true, Ordering::SeqCst);
            debug!("terminal reports key releases");
        }
        Ok(Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout()))?,
        })
    }
}

impl Deref for Screen {
    type Target = Terminal<Backend>;

    fn deref(&self) -> &Self::Target {
        &self.terminal
    }
}

impl DerefMut for Screen {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.terminal
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = restore();
    }
}

fn restore() -> io::Result<()> {
    if KEY_RELEASES.swap(false, Ordering::SeqCst) {
        execute!(stdout(), PopKeyboardEnhancementFlags)?;
    }
    execute!(stdout(), LeaveAlternateScreen, cursor::Show)?;
    disable_raw_mode()
}

/// Leave the alternate screen before a panic message is printed
fn init_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
