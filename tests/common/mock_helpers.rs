//! Mocks for the renderer and fit engine seams

use mockall::mock;
use streamplot::fit::{FitEngine, FitInput, FitResult};
use streamplot::types::CurveStyle;
use streamplot::{PlotSession, Renderer};

mock! {
    pub Plot {}

    impl Renderer for Plot {
        fn create_curve(&mut self, index: usize, style: &CurveStyle);
        fn update_curve(&mut self, index: usize, x: &[f64], y: &[f64]);
        fn set_error_bars(&mut self, index: usize, x: &[f64], y: &[f64], err: &[f64]);
        fn remove_curve(&mut self, index: usize);
        fn clear_all(&mut self);
        fn set_title(&mut self, title: &str);
        fn set_axis_labels(&mut self, bottom: &str, left: &str);
    }
}

mock! {
    pub Engine {}

    impl FitEngine for Engine {
        fn fit(&self, input: &FitInput) -> anyhow::Result<FitResult>;
    }
}

/// Renderer that accepts any call
pub fn permissive_renderer() -> MockPlot {
    let mut renderer = MockPlot::new();
    renderer.expect_create_curve().return_const(());
    renderer.expect_update_curve().return_const(());
    renderer.expect_set_error_bars().return_const(());
    renderer.expect_remove_curve().return_const(());
    renderer.expect_clear_all().return_const(());
    renderer.expect_set_title().return_const(());
    renderer.expect_set_axis_labels().return_const(());
    renderer
}

pub fn session_with(renderer: MockPlot) -> PlotSession<MockPlot> {
    PlotSession::new(renderer, 32)
}
