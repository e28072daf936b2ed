use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::event;
use log::warn;
use ratatui::{
    prelude::*,
    widgets::{
        canvas::{Canvas, Circle},
        *,
    },
};

use crate::{driver::Renderer, gym::ArenaConfig};

use super::{
    input::{self, Command, Keyboard},
    tui::Screen,
};

/// Draws the arena in the terminal; `q` or Esc closes it
///
/// Built [`with_keyboard`](Self::with_keyboard), it also feeds the arrow keys to a
/// [`ManualPolicy`](super::ManualPolicy).
pub struct ArenaView {
    screen: Screen,
    keyboard: Option<Keyboard>,
    half_width: f64,
    half_height: f64,
    player_radius: f64,
    fruit_radius: f64,
    player: (f64, f64),
    fruit: (f64, f64),
    closed: bool,
}

impl ArenaView {
    pub fn new(config: &ArenaConfig) -> io::Result<Self> {
        Self::build(config, None)
    }

    pub fn with_keyboard(config: &ArenaConfig, keyboard: Keyboard) -> io::Result<Self> {
        Self::build(config, Some(keyboard))
    }

    fn build(config: &ArenaConfig, keyboard: Option<Keyboard>) -> io::Result<Self> {
        Ok(Self {
            screen: Screen::enter(keyboard.is_some())?,
            keyboard,
            half_width: config.width as f64 / 2.0,
            half_height: config.height as f64 / 2.0,
            player_radius: config.player_radius as f64,
            fruit_radius: config.fruit_radius as f64,
            player: (0.0, 0.0),
            fruit: (0.0, 0.0),
            closed: false,
        })
    }

    fn render(&mut self, text: &str) -> io::Result<()> {
        let Self {
            half_width: w,
            half_height: h,
            player_radius,
            fruit_radius,
            player,
            fruit,
            ..
        } = *self;

        self.screen.draw(|frame| {
            let [hud_area, arena_area] =
                Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(frame.size());
            frame.render_widget(Paragraph::new(text).bold(), hud_area);

            let canvas = Canvas::default()
                .block(Block::bordered().border_type(BorderType::Rounded))
                .marker(Marker::Braille)
                .x_bounds([-w, w])
                .y_bounds([-h, h])
                .paint(|ctx| {
                    ctx.draw(&Circle {
                        x: fruit.0,
                        y: fruit.1,
                        radius: fruit_radius,
                        color: Color::Green,
                    });
                    ctx.draw(&Circle {
                        x: player.0,
                        y: player.1,
                        radius: player_radius,
                        color: Color::White,
                    });
                });
            frame.render_widget(canvas, arena_area);
        })?;
        Ok(())
    }
}

impl Renderer for ArenaView {
    fn poll_close_requested(&mut self) -> bool {
        while !self.closed {
            match event::poll(Duration::ZERO).and_then(|ready| ready.then(event::read).transpose()) {
                Ok(Some(ev)) => {
                    if let Some(keyboard) = &self.keyboard {
                        keyboard.handle(&ev, Instant::now());
                    }
                    self.closed = input::pressed(&ev) == Some(Command::Quit);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("terminal input failed: {e}");
                    self.closed = true;
                }
            }
        }
        self.closed
    }

    fn draw(&mut self, player: (f32, f32), fruit: (f32, f32)) {
        self.player = (player.0 as f64, player.1 as f64);
        self.fruit = (fruit.0 as f64, fruit.1 as f64);
    }

    fn display_text(&mut self, text: &str) {
        if let Err(e) = self.render(text) {
            warn!("terminal drawing failed: {e}");
            self.closed = true;
        }
    }
}
