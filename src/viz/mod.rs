use std::{
    io,
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

use log::LevelFilter;

use crate::env::Metric;

mod app;
mod arena_view;
mod components;
mod input;
mod manual;
mod tui;

pub use app::{App, Update};
pub use arena_view::ArenaView;
pub use input::Keyboard;
pub use manual::ManualPolicy;

/// Route `log` records into the dashboard's log tab
///
/// Call once, instead of installing another logger.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    tui_logger::init_logger(level)?;
    tui_logger::set_default_level(level);
    Ok(())
}

/// Spawn the training dashboard on its own thread
///
/// Send one [`Update`] per episode with values in the order of `plots`. Dropping the
/// sender marks training as finished; the dashboard stays open until the user quits.
pub fn init(plots: &[Metric], episodes: u32) -> (JoinHandle<io::Result<()>>, Sender<Update>) {
    let mut app = App::new(plots, episodes);
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || app.run(rx));
    (handle, tx)
}
