use crossterm::event::Event;
use ratatui::{prelude::*, widgets::*};

use crate::{
    env::Metric,
    viz::{
        input::{self, Command},
        Update,
    },
};

use super::Component;

/// Scatter plot of one metric against the episode number
pub struct Plot {
    y_title: String,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    data: Vec<(f64, f64)>,
}

impl Plot {
    pub fn new(metric: Metric, episodes: u32) -> Self {
        Self {
            y_title: metric.to_string(),
            x_bounds: [0.0, episodes.max(1) as f64],
            y_bounds: [f64::MAX, f64::MIN],
            data: Vec::new(),
        }
    }

    pub fn update(&mut self, point: (f64, f64)) {
        self.y_bounds[0] = self.y_bounds[0].min(point.1);
        self.y_bounds[1] = self.y_bounds[1].max(point.1);
        self.x_bounds[1] = self.x_bounds[1].max(point.0);
        self.data.push(point);
    }

    /// y bounds with some room so a flat series is still visible
    fn padded_y_bounds(&self) -> [f64; 2] {
        let [lo, hi] = self.y_bounds;
        if lo > hi {
            return [0.0, 1.0];
        }
        let pad = ((hi - lo) * 0.05).max(1.0);
        [lo - pad, hi + pad]
    }
}

fn labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    bounds.iter().map(|x| format!("{x:.0}").bold()).collect()
}

impl WidgetRef for Plot {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let y_bounds = self.padded_y_bounds();
        let dataset = Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Scatter)
            .cyan()
            .data(&self.data);

        let x_axis = Axis::default()
            .title("episode")
            .dark_gray()
            .labels(labels(self.x_bounds))
            .bounds(self.x_bounds);

        let y_axis = Axis::default()
            .title(self.y_title.as_str())
            .dark_gray()
            .labels(labels(y_bounds))
            .bounds(y_bounds);

        Chart::new(vec![dataset])
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .padding(Padding::uniform(1)),
            )
            .x_axis(x_axis)
            .y_axis(y_axis)
            .render(area, buf);
    }
}

/// One [`Plot`] per metric, switched with the arrow keys
pub struct Plots {
    names: Vec<Metric>,
    plots: Vec<Plot>,
    selected: usize,
}

impl Plots {
    pub fn new(names: Vec<Metric>, episodes: u32) -> Self {
        let plots = names.iter().map(|&m| Plot::new(m, episodes)).collect();
        Self {
            names,
            plots,
            selected: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn next_plot(&mut self) {
        if self.len() > 0 {
            self.selected = (self.selected + 1) % self.len();
        }
    }

    pub fn prev_plot(&mut self) {
        let len = self.len();
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    pub fn update(&mut self, update: &Update) {
        for (plot, &value) in self.plots.iter_mut().zip(&update.data) {
            plot.update((update.episode as f64, value));
        }
    }
}

impl WidgetRef for Plots {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let [tabs_area, plot_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);

        Tabs::new(self.names.iter().map(|m| m.to_string()))
            .white()
            .highlight_style(Style::default().light_green())
            .select(self.selected)
            .render(tabs_area, buf);

        if let Some(plot) = self.plots.get(self.selected) {
            plot.render_ref(plot_area, buf);
        }
    }
}

impl Component for Plots {
    fn handle_ui_event(&mut self, event: &Event) -> bool {
        match input::pressed(event) {
            Some(Command::Left) => self.prev_plot(),
            Some(Command::Right) => self.next_plot(),
            _ => return false,
        }
        true
    }
}
