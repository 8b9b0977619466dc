//! A single curve's buffers and its sorted snapshot.

/// Append-only (x, y, err?) buffers for one curve index
///
/// Each curve owns its own independent-variable buffer, so clearing one
/// curve can never leave another curve's points misaligned.
#[derive(Debug, Clone)]
pub struct Curve {
    index: usize,
    x: Vec<f64>,
    y: Vec<f64>,
    err: Option<Vec<f64>>,
    active: bool,
    /// True while every appended x sorts at or after the previous one
    /// under `f64::total_cmp`
    in_order: bool,
}

impl Curve {
    pub(crate) fn new(index: usize, with_uncertainty: bool) -> Self {
        Self {
            index,
            x: Vec::new(),
            y: Vec::new(),
            err: with_uncertainty.then(Vec::new),
            active: true,
            in_order: true,
        }
    }

    pub(crate) fn push(&mut self, x: f64, y: f64, err: Option<f64>) {
        if let Some(&last) = self.x.last() {
            if x.total_cmp(&last).is_lt() {
                self.in_order = false;
            }
        }
        self.x.push(x);
        self.y.push(y);
        if let (Some(buffer), Some(e)) = (self.err.as_mut(), err) {
            buffer.push(e);
        }
    }

    /// Empty all buffers and retire the curve until the next session
    pub(crate) fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        if let Some(buffer) = self.err.as_mut() {
            buffer.clear();
        }
        self.active = false;
        self.in_order = true;
    }

    /// Curve index within the session
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of points held
    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Whether the curve still receives samples
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether an error buffer is tracked for this curve
    pub fn has_uncertainties(&self) -> bool {
        self.err.is_some()
    }

    /// Points in arrival order
    pub fn raw_x(&self) -> &[f64] {
        &self.x
    }

    pub fn raw_y(&self) -> &[f64] {
        &self.y
    }

    pub fn raw_err(&self) -> Option<&[f64]> {
        self.err.as_deref()
    }

    /// Copy of the curve sorted ascending by x
    ///
    /// Ties keep arrival order. When points arrived in order the sort is
    /// skipped entirely.
    pub fn snapshot_sorted(&self) -> CurveSnapshot {
        if self.in_order {
            return CurveSnapshot {
                index: self.index,
                x: self.x.clone(),
                y: self.y.clone(),
                err: self.err.clone(),
            };
        }

        let mut order: Vec<usize> = (0..self.x.len()).collect();
        // sort_by is stable, which gives arrival-order tie breaking
        order.sort_by(|&a, &b| self.x[a].total_cmp(&self.x[b]));

        let pick = |buffer: &[f64]| order.iter().map(|&i| buffer[i]).collect::<Vec<_>>();
        CurveSnapshot {
            index: self.index,
            x: pick(&self.x),
            y: pick(&self.y),
            err: self.err.as_deref().map(pick),
        }
    }
}

/// Immutable sorted copy of one curve, safe to hand across threads
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurveSnapshot {
    pub index: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub err: Option<Vec<f64>>,
}

impl CurveSnapshot {
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// (x, y) pairs for plotting
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.x.iter().zip(&self.y).map(|(&x, &y)| [x, y]).collect()
    }
}
