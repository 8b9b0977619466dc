//! Per-curve prefit models
//!
//! A prefit model holds hand-tuned starting parameters for one curve. The
//! registry keeps at most one model per curve index; asking for a model
//! with a different fit function discards the old one and its parameters.

use super::{FitFunction, FitInput};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PrefitModel {
    pub function: FitFunction,
    pub curve: usize,
    pub input: FitInput,
    /// Starting guesses, one per [`FitFunction::parameter_names`] entry
    pub parameters: Vec<(String, f64)>,
}

impl PrefitModel {
    pub fn new(input: FitInput) -> Self {
        let parameters = input
            .function
            .parameter_names()
            .iter()
            .map(|name| (name.to_string(), 0.0))
            .collect();
        Self {
            function: input.function,
            curve: input.curve,
            input,
            parameters,
        }
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> bool {
        match self.parameters.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct PrefitRegistry {
    models: BTreeMap<usize, PrefitModel>,
}

impl PrefitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model for the curve in `input`, created or replaced as needed
    ///
    /// The same function keeps the existing model untouched, including its
    /// parameters and the data it was opened with.
    pub fn open(&mut self, input: FitInput) -> &mut PrefitModel {
        match self.models.entry(input.curve) {
            Entry::Occupied(mut slot) => {
                if slot.get().function != input.function {
                    tracing::info!(
                        curve = input.curve,
                        from = %slot.get().function,
                        to = %input.function,
                        "Fit function changed, discarding previous prefit parameters"
                    );
                    slot.insert(PrefitModel::new(input));
                }
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(PrefitModel::new(input)),
        }
    }

    pub fn get(&self, curve: usize) -> Option<&PrefitModel> {
        self.models.get(&curve)
    }

    pub fn get_mut(&mut self, curve: usize) -> Option<&mut PrefitModel> {
        self.models.get_mut(&curve)
    }

    pub fn remove(&mut self, curve: usize) -> Option<PrefitModel> {
        self.models.remove(&curve)
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
