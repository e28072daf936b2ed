use crossterm::event::Event;
use log::LevelFilter;
use ratatui::{prelude::*, widgets::WidgetRef};
use tui_logger::{TuiLoggerSmartWidget, TuiWidgetEvent, TuiWidgetState};

use crate::viz::input::{self, Command};

use super::Component;

/// Log targets of this crate's logging modules and of the binary
const CRATE_TARGETS: [&str; 7] = [
    "fruit_hop",
    "fruit_hop::algo::tabular::mc_table",
    "fruit_hop::driver",
    "fruit_hop::exploration",
    "fruit_hop::gym::arena",
    "fruit_hop::viz::arena_view",
    "fruit_hop::viz::tui",
];

/// Training log: this crate's records down to `debug`, dependencies' from `warn`
pub struct Logs {
    state: TuiWidgetState,
}

impl Logs {
    pub fn new() -> Self {
        let state = CRATE_TARGETS.iter().fold(
            TuiWidgetState::new().set_default_display_level(LevelFilter::Warn),
            |state, target| state.set_level_for_target(target, LevelFilter::Debug),
        );
        Self { state }
    }
}

impl WidgetRef for Logs {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        TuiLoggerSmartWidget::default()
            .title_log("training log")
            .title_target("targets")
            .style_error(Style::default().light_red())
            .style_warn(Style::default().light_yellow())
            .style_info(Style::default().cyan())
            .style_debug(Style::default().dark_gray())
            .output_target(false)
            .output_separator(' ')
            .state(&self.state)
            .render(area, buf);
    }
}

impl Component for Logs {
    fn handle_ui_event(&mut self, event: &Event) -> bool {
        let widget_event = match input::pressed(event) {
            Some(Command::Up) => TuiWidgetEvent::UpKey,
            Some(Command::Down) => TuiWidgetEvent::DownKey,
            Some(Command::Left) => TuiWidgetEvent::LeftKey,
            Some(Command::Right) => TuiWidgetEvent::RightKey,
            Some(Command::PageUp) => TuiWidgetEvent::PrevPageKey,
            Some(Command::PageDown) => TuiWidgetEvent::NextPageKey,
            Some(Command::Select) => TuiWidgetEvent::SpaceKey,
            Some(Command::More) => TuiWidgetEvent::PlusKey,
            Some(Command::Less) => TuiWidgetEvent::MinusKey,
            Some(Command::Hide) => TuiWidgetEvent::HideKey,
            Some(Command::Focus) => TuiWidgetEvent::FocusKey,
            _ => return false,
        };
        self.state.transition(widget_event);
        true
    }
}
