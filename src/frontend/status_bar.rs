//! Status bar: listener state, session counters and the latest diagnostic.

use egui::{Color32, RichText, Ui};

use crate::ingest::ListenerStatus;
use crate::session::{Diagnostic, Severity};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub listener: Option<&'a ListenerStatus>,
    pub address: &'a str,
    pub curves: usize,
    pub samples: usize,
    pub pending_fits: usize,
    pub latest: Option<&'a Diagnostic>,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        let (status_color, status_text) = match ctx.listener {
            Some(ListenerStatus::Running) => (Color32::GREEN, "Listening"),
            Some(ListenerStatus::Stopped) => (Color32::GRAY, "Stopped"),
            Some(ListenerStatus::Failed(_)) => (Color32::RED, "Listener failed"),
            None => (Color32::GRAY, "No listener"),
        };
        ui.colored_label(status_color, "●");
        ui.label(RichText::new(format!("{}: {}", status_text, ctx.address)).small());

        ui.separator();
        ui.label(RichText::new(format!("Curves: {}", ctx.curves)).small());

        ui.separator();
        ui.label(RichText::new(format!("Samples: {}", ctx.samples)).small());

        if ctx.pending_fits > 0 {
            ui.separator();
            ui.colored_label(
                Color32::YELLOW,
                RichText::new(format!("Fitting ({})", ctx.pending_fits)).small(),
            );
        }

        if let Some(diagnostic) = ctx.latest {
            let color = match diagnostic.severity {
                Severity::Info => Color32::GRAY,
                Severity::Warning => Color32::YELLOW,
                Severity::Error => Color32::RED,
            };
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(color, RichText::new(&diagnostic.message).small());
            });
        }
    });
}
