use std::{
    io,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use crossterm::event;
use ratatui::{prelude::*, widgets::*};

use crate::env::Metric;

use super::{
    components::{Component, Logs, Plots},
    input::{self, Command},
    tui::Screen,
};

const TABS: [&str; 2] = ["Plots", "Logs"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Train,
    Done,
    Quit,
}

/// Metric values of one finished episode, in the order the dashboard was created with
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub episode: u32,
    pub data: Vec<f64>,
}

/// Training dashboard: metric plots, captured logs and a progress bar
pub struct App {
    state: State,
    episode: u32,
    total_episodes: u32,
    selected_tab: usize,
    plots: Plots,
    logs: Logs,
}

impl App {
    pub fn new(plots: &[Metric], episodes: u32) -> Self {
        Self {
            state: State::default(),
            episode: 0,
            total_episodes: episodes,
            selected_tab: 0,
            plots: Plots::new(plots.to_vec(), episodes),
            logs: Logs::new(),
        }
    }

    fn drain(&mut self, rx: &Receiver<Update>) {
        loop {
            match rx.try_recv() {
                Ok(update) => {
                    self.episode = update.episode + 1;
                    self.plots.update(&update);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.state = State::Done;
                    break;
                }
            }
        }
    }

    /// Route a terminal event: tab switching and quitting here, the rest to the open tab
    fn handle_event(&mut self, ev: &event::Event) {
        match input::pressed(ev) {
            Some(Command::NextTab) => self.selected_tab = (self.selected_tab + 1) % TABS.len(),
            Some(command) => {
                let consumed = match self.selected_tab {
                    0 => self.plots.handle_ui_event(ev),
                    _ => self.logs.handle_ui_event(ev),
                };
                if !consumed && command == Command::Quit {
                    self.state = State::Quit;
                }
            }
            None => {}
        }
    }

    /// Enter the alternate screen and run the render loop until the user quits
    pub fn run(&mut self, rx: Receiver<Update>) -> io::Result<()> {
        let mut screen = Screen::enter(false)?;

        while self.state != State::Quit {
            if self.state == State::Train {
                self.drain(&rx);
            }

            screen.draw(|frame| frame.render_widget(&*self, frame.size()))?;

            if event::poll(Duration::from_millis(16))? {
                self.handle_event(&event::read()?);
            }
        }
        Ok(())
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [menu_area, main_area, progress_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(3),
        ])
        .areas(area);

        Tabs::new(TABS)
            .block(Block::default().padding(Padding::uniform(1)))
            .white()
            .bold()
            .highlight_style(Style::default().light_green())
            .select(self.selected_tab)
            .render(menu_area, buf);

        match self.selected_tab {
            0 => self.plots.render_ref(main_area, buf),
            _ => self.logs.render_ref(main_area, buf),
        }

        let title = match self.state {
            State::Done => "Done, press q to quit",
            _ => "Progress",
        };
        Gauge::default()
            .block(Block::bordered().border_type(BorderType::Rounded).title(title))
            .gauge_style(Style::default().cyan())
            .ratio((self.episode as f64 / self.total_episodes.max(1) as f64).min(1.0))
            .render(progress_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

    use super::*;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn keys_switch_tabs_and_quit() {
        let mut app = App::new(&[Metric::Reward, Metric::Score], 10);
        app.handle_event(&press(KeyCode::Tab));
        assert_eq!(app.selected_tab, 1);
        app.handle_event(&press(KeyCode::Tab));
        assert_eq!(app.selected_tab, 0, "wraps around");

        app.handle_event(&press(KeyCode::Right));
        assert_eq!(app.state, State::Train, "plot navigation does not quit");
        app.handle_event(&press(KeyCode::Esc));
        assert_eq!(app.state, State::Quit);
    }

    #[test]
    fn finished_training_is_done() {
        let mut app = App::new(&[Metric::Reward], 4);
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(Update {
            episode: 3,
            data: vec![2000.0],
        })
        .unwrap();
        drop(tx);
        app.drain(&rx);
        assert_eq!(app.episode, 4);
        assert_eq!(app.state, State::Done);
    }
}
