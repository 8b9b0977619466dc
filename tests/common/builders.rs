//! Test data builders for samples and wire messages

use serde_json::{json, Value};
use streamplot::Sample;

/// Builder for creating test Samples
pub struct SampleBuilder {
    x: f64,
    values: Vec<f64>,
    uncertainties: Option<Vec<f64>>,
}

impl SampleBuilder {
    pub fn new(x: f64) -> Self {
        Self {
            x,
            values: vec![0.0],
            uncertainties: None,
        }
    }

    pub fn values(mut self, values: &[f64]) -> Self {
        self.values = values.to_vec();
        self
    }

    pub fn uncertainties(mut self, uncertainties: &[f64]) -> Self {
        self.uncertainties = Some(uncertainties.to_vec());
        self
    }

    /// The sample tuple as it appears on the wire
    pub fn tuple(&self) -> Value {
        match &self.uncertainties {
            Some(err) => json!([self.x, self.values, err]),
            None => json!([self.x, self.values]),
        }
    }

    /// One `generate_plot_pointbypoint` line
    pub fn line(&self) -> String {
        command_line("generate_plot_pointbypoint", self.tuple())
    }

    pub fn build(self) -> Sample {
        match self.uncertainties {
            Some(err) => Sample::with_uncertainties(self.x, self.values, err)
                .expect("builder uncertainties must match values"),
            None => Sample::new(self.x, self.values),
        }
    }
}

/// A single-command wire line
pub fn command_line(cmd: &str, arg: Value) -> String {
    json!({ "cmd": cmd, "arg": arg }).to_string()
}
