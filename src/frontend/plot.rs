//! Plot rendering using egui_plot
//!
//! [`PlotScene`] is the GUI [`Renderer`]. The session pushes sorted curve
//! data into it between frames; [`PlotScene::render`] draws whatever it
//! currently holds.
//!
//! # Main Types
//!
//! - [`PlotScene`] - Per-curve render items plus title and axis labels
//! - [`CurveItem`] - Line, markers and error bars for one curve

use crate::config::{Background, PlotConfig};
use crate::session::Renderer;
use crate::types::{CurveStyle, LineStyle};
use egui::{Color32, Ui};
use egui_plot::{Corner, Legend, Line, MarkerShape, Plot, PlotPoints, PlotUi, Points};
use std::collections::BTreeMap;

/// Render state for one curve
#[derive(Debug, Clone, Default)]
pub struct CurveItem {
    pub style: Option<CurveStyle>,
    pub points: Vec<[f64; 2]>,
    /// Vertical segments `(bottom, top)`
    pub error_bars: Vec<([f64; 2], [f64; 2])>,
}

/// Everything currently on the plot
#[derive(Debug, Clone)]
pub struct PlotScene {
    curves: BTreeMap<usize, CurveItem>,
    title: String,
    x_label: String,
    y_label: String,
    config: PlotConfig,
}

impl PlotScene {
    pub fn new(config: PlotConfig) -> Self {
        Self {
            curves: BTreeMap::new(),
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            config,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn axis_labels(&self) -> (&str, &str) {
        (&self.x_label, &self.y_label)
    }

    pub fn curve(&self, index: usize) -> Option<&CurveItem> {
        self.curves.get(&index)
    }

    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    pub fn config_mut(&mut self) -> &mut PlotConfig {
        &mut self.config
    }

    /// Draw the plot into `ui`
    pub fn render(&self, ui: &mut Ui) {
        if !self.title.is_empty() {
            ui.vertical_centered(|ui| {
                ui.heading(&self.title);
            });
        }

        let mut plot = Plot::new("streamplot_main")
            .show_axes(true)
            .show_grid(self.config.show_grid)
            .x_axis_label(self.x_label.clone())
            .y_axis_label(self.y_label.clone());

        if self.config.show_legend {
            plot = plot.legend(
                Legend::default()
                    .position(Corner::RightTop)
                    .background_alpha(0.8),
            );
        }

        let frame = match self.config.background {
            Background::White => egui::Frame::new().fill(Color32::WHITE),
            Background::Dark => egui::Frame::new().fill(Color32::from_gray(27)),
        };

        frame.show(ui, |ui| {
            plot.show(ui, |plot_ui| {
                for (&index, item) in &self.curves {
                    self.render_curve(plot_ui, index, item);
                }
            });
        });
    }

    fn render_curve(&self, plot_ui: &mut PlotUi, index: usize, item: &CurveItem) {
        let Some(style) = &item.style else {
            return;
        };
        if item.points.is_empty() {
            return;
        }

        let color = Color32::from_rgba_unmultiplied(
            style.color[0],
            style.color[1],
            style.color[2],
            style.color[3],
        );
        let name = format!("Curve {}", index);

        let line = Line::new(name.clone(), PlotPoints::from(item.points.clone()))
            .color(color)
            .width(self.config.line_width)
            .style(plot_line_style(style.line));
        plot_ui.line(line);

        if style.markers {
            let markers = Points::new(name, PlotPoints::from(item.points.clone()))
                .color(color)
                .shape(MarkerShape::Circle)
                .filled(true)
                .radius(self.config.marker_radius);
            plot_ui.points(markers);
        }

        if self.config.show_error_bars {
            for &(bottom, top) in &item.error_bars {
                // Unnamed so error bars stay out of the legend
                let bar = Line::new("", PlotPoints::from(vec![bottom, top]))
                    .color(color)
                    .width(self.config.line_width)
                    .style(plot_line_style(style.error_bar_line));
                plot_ui.line(bar);
            }
        }
    }
}

impl Default for PlotScene {
    fn default() -> Self {
        Self::new(PlotConfig::default())
    }
}

fn plot_line_style(style: LineStyle) -> egui_plot::LineStyle {
    match style {
        LineStyle::Solid => egui_plot::LineStyle::Solid,
        LineStyle::Dashed => egui_plot::LineStyle::dashed_loose(),
    }
}

impl Renderer for PlotScene {
    fn create_curve(&mut self, index: usize, style: &CurveStyle) {
        let item = self.curves.entry(index).or_default();
        item.style = Some(style.clone());
        item.points.clear();
        item.error_bars.clear();
    }

    fn update_curve(&mut self, index: usize, x: &[f64], y: &[f64]) {
        // Items removed by clear_plot stay gone until create_curve
        if let Some(item) = self.curves.get_mut(&index) {
            item.points = x.iter().zip(y).map(|(&x, &y)| [x, y]).collect();
        }
    }

    fn set_error_bars(&mut self, index: usize, x: &[f64], y: &[f64], err: &[f64]) {
        if let Some(item) = self.curves.get_mut(&index) {
            item.error_bars = x
                .iter()
                .zip(y)
                .zip(err)
                .map(|((&x, &y), &e)| ([x, y - e], [x, y + e]))
                .collect();
        }
    }

    fn remove_curve(&mut self, index: usize) {
        self.curves.remove(&index);
    }

    fn clear_all(&mut self) {
        self.curves.clear();
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_axis_labels(&mut self, bottom: &str, left: &str) {
        self.x_label = bottom.to_string();
        self.y_label = left.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_requires_created_item() {
        let mut scene = PlotScene::default();
        scene.update_curve(0, &[1.0], &[2.0]);
        assert!(scene.curve(0).is_none());

        scene.create_curve(0, &CurveStyle::for_index(0));
        scene.update_curve(0, &[1.0, 2.0], &[3.0, 4.0]);
        assert_eq!(scene.curve(0).map(|c| c.points.clone()), Some(vec![[1.0, 3.0], [2.0, 4.0]]));
    }

    #[test]
    fn test_error_bars_are_symmetric() {
        let mut scene = PlotScene::default();
        scene.create_curve(1, &CurveStyle::for_index(1));
        scene.set_error_bars(1, &[0.0], &[5.0], &[0.5]);
        assert_eq!(
            scene.curve(1).map(|c| c.error_bars.clone()),
            Some(vec![([0.0, 4.5], [0.0, 5.5])])
        );

        scene.clear_all();
        assert_eq!(scene.curve_count(), 0);
    }

    #[test]
    fn test_title_and_labels() {
        let mut scene = PlotScene::default();
        scene.set_title("Rabi oscillation");
        scene.set_axis_labels("pulse length (us)", "P(1)");
        assert_eq!(scene.title(), "Rabi oscillation");
        assert_eq!(scene.axis_labels(), ("pulse length (us)", "P(1)"));
    }
}
