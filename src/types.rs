//! Core data types for StreamPlot
//!
//! This module contains the fundamental data structures that flow from the
//! listener into the curve store and out to the renderer.
//!
//! # Main Types
//!
//! - [`Sample`] - One ingested measurement: x, one y per curve, optional errors
//! - [`SampleSchema`] - The shape (arity, uncertainty) a session is locked to
//! - [`CurveStyle`] - Colour and pen choices handed to the renderer
//!
//! # Wire Shape
//!
//! Samples arrive as JSON tuples. A 2-element tuple `[x, [y0, y1, ..]]`
//! carries no uncertainty; a 3-element tuple `[x, [y0, ..], [e0, ..]]`
//! carries one uncertainty per dependent value. Any other shape is rejected.

use crate::error::{Result, StreamPlotError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed palette so that the n-th curve has the same colour on every plot
pub const COLOR_PALETTE: [[u8; 4]; 10] = [
    [31, 119, 180, 255],
    [255, 127, 14, 255],
    [44, 160, 44, 255],
    [214, 39, 40, 255],
    [148, 103, 189, 255],
    [140, 86, 75, 255],
    [227, 119, 194, 255],
    [127, 127, 127, 255],
    [188, 189, 34, 255],
    [23, 190, 207, 255],
];

/// One measurement sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Independent variable shared by every curve in this sample
    pub independent_value: f64,
    /// One dependent value per curve
    pub dependent_values: Vec<f64>,
    /// One uncertainty per curve, if the instrument reports them
    pub uncertainties: Option<Vec<f64>>,
}

impl Sample {
    /// Create a sample without uncertainties
    pub fn new(independent_value: f64, dependent_values: Vec<f64>) -> Self {
        Self {
            independent_value,
            dependent_values,
            uncertainties: None,
        }
    }

    /// Create a sample with one uncertainty per dependent value
    pub fn with_uncertainties(
        independent_value: f64,
        dependent_values: Vec<f64>,
        uncertainties: Vec<f64>,
    ) -> Result<Self> {
        if uncertainties.len() != dependent_values.len() {
            return Err(StreamPlotError::InvalidSample(format!(
                "{} dependent values but {} uncertainties",
                dependent_values.len(),
                uncertainties.len()
            )));
        }
        Ok(Self {
            independent_value,
            dependent_values,
            uncertainties: Some(uncertainties),
        })
    }

    /// Number of curves this sample feeds
    #[inline]
    pub fn arity(&self) -> usize {
        self.dependent_values.len()
    }

    /// Whether uncertainties are present
    #[inline]
    pub fn has_uncertainties(&self) -> bool {
        self.uncertainties.is_some()
    }

    /// The schema this sample would establish for a new session
    pub fn schema(&self) -> SampleSchema {
        SampleSchema::new(self.arity(), self.has_uncertainties())
    }

    /// Interpret a decoded JSON tuple as a sample
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            StreamPlotError::InvalidSample(format!("expected a tuple, got {}", value))
        })?;

        match items.as_slice() {
            [x, ys] => Ok(Self::new(
                number(x, "independent value")?,
                numbers(ys, "dependent values")?,
            )),
            [x, ys, errs] => Self::with_uncertainties(
                number(x, "independent value")?,
                numbers(ys, "dependent values")?,
                numbers(errs, "uncertainties")?,
            ),
            other => Err(StreamPlotError::InvalidSample(format!(
                "expected 2 or 3 elements, got {}",
                other.len()
            ))),
        }
    }
}

impl TryFrom<&Value> for Sample {
    type Error = StreamPlotError;

    fn try_from(value: &Value) -> Result<Self> {
        Sample::from_value(value)
    }
}

fn number(value: &Value, what: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        StreamPlotError::InvalidSample(format!("{} is not a number: {}", what, value))
    })
}

fn numbers(value: &Value, what: &str) -> Result<Vec<f64>> {
    let items = value.as_array().ok_or_else(|| {
        StreamPlotError::InvalidSample(format!("{} must be a list: {}", what, value))
    })?;
    items.iter().map(|item| number(item, what)).collect()
}

/// The shape a session is locked to by its first sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleSchema {
    /// Number of curves
    pub arity: usize,
    /// Whether each curve tracks an error buffer
    pub with_uncertainty: bool,
}

impl SampleSchema {
    pub fn new(arity: usize, with_uncertainty: bool) -> Self {
        Self {
            arity,
            with_uncertainty,
        }
    }
}

impl std::fmt::Display for SampleSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.with_uncertainty {
            write!(f, "{} curves with uncertainties", self.arity)
        } else {
            write!(f, "{} curves", self.arity)
        }
    }
}

/// Line style for a curve's connecting line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineStyle {
    Solid,
    #[default]
    Dashed,
}

/// Everything the renderer needs to draw a curve consistently
#[derive(Debug, Clone, PartialEq)]
pub struct CurveStyle {
    /// Line and marker colour (RGBA)
    pub color: [u8; 4],
    /// Connecting line style
    pub line: LineStyle,
    /// Error bar pen style
    pub error_bar_line: LineStyle,
    /// Whether data points get a filled circle marker
    pub markers: bool,
}

impl CurveStyle {
    /// Style for the curve at `index`
    ///
    /// The first ten curves use [`COLOR_PALETTE`]; beyond that hues are spread
    /// with the golden ratio.
    pub fn for_index(index: usize) -> Self {
        let color = COLOR_PALETTE
            .get(index)
            .copied()
            .unwrap_or_else(|| generate_color(index));
        Self {
            color,
            line: LineStyle::Dashed,
            error_bar_line: LineStyle::Solid,
            markers: true,
        }
    }
}

/// Generate a distinct color based on an index
/// Uses the golden ratio to spread hues evenly across the color wheel
fn generate_color(index: usize) -> [u8; 4] {
    const GOLDEN_RATIO: f32 = 0.618033988749895;

    let hue = ((index as f32 * GOLDEN_RATIO) % 1.0) * 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.85);
    [r, g, b, 255]
}

/// Convert HSV (hue 0-360, saturation 0-1, value 0-1) to RGB (u8, u8, u8)
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (u8, u8, u8) {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
