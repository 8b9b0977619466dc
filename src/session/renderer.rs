//! Rendering seam
//!
//! The session pushes sorted snapshots through this trait; it never hands
//! out references into the curve store. All calls happen on the consumer
//! context.

use crate::types::CurveStyle;

/// Plot surface driven by [`super::PlotSession`]
pub trait Renderer {
    /// Allocate render items for a curve
    fn create_curve(&mut self, index: usize, style: &CurveStyle);

    /// Replace a curve's line and markers with sorted data
    fn update_curve(&mut self, index: usize, x: &[f64], y: &[f64]);

    /// Replace a curve's error bars; `err` is the symmetric half-height
    fn set_error_bars(&mut self, index: usize, x: &[f64], y: &[f64], err: &[f64]);

    /// Drop a curve's render items
    fn remove_curve(&mut self, index: usize);

    /// Drop every render item
    fn clear_all(&mut self);

    fn set_title(&mut self, title: &str);

    fn set_axis_labels(&mut self, bottom: &str, left: &str);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn create_curve(&mut self, index: usize, style: &CurveStyle) {
        (**self).create_curve(index, style)
    }

    fn update_curve(&mut self, index: usize, x: &[f64], y: &[f64]) {
        (**self).update_curve(index, x, y)
    }

    fn set_error_bars(&mut self, index: usize, x: &[f64], y: &[f64], err: &[f64]) {
        (**self).set_error_bars(index, x, y, err)
    }

    fn remove_curve(&mut self, index: usize) {
        (**self).remove_curve(index)
    }

    fn clear_all(&mut self) {
        (**self).clear_all()
    }

    fn set_title(&mut self, title: &str) {
        (**self).set_title(title)
    }

    fn set_axis_labels(&mut self, bottom: &str, left: &str) {
        (**self).set_axis_labels(bottom, left)
    }
}
