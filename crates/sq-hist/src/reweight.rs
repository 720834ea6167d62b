//! Per-object correction factors from pairs of reference densities.

use sq_core::{DatasetRole, Error, Result, WeightAxis};

use crate::histogram::Histogram;

/// Reference and subject densities of one reweighting axis.
///
/// Both histograms share bin edges; the pair is read-only once built.
#[derive(Debug, Clone)]
pub struct DensityPair {
    axis: WeightAxis,
    reference: Histogram,
    subject: Histogram,
}

impl DensityPair {
    /// Pair two densities, rejecting differing bin edges.
    pub fn new(axis: WeightAxis, reference: Histogram, subject: Histogram) -> Result<Self> {
        if !reference.same_binning(&subject) {
            return Err(Error::BinningMismatch {
                left: reference.name.clone(),
                right: subject.name.clone(),
            });
        }
        Ok(Self { axis, reference, subject })
    }

    /// Axis this pair corrects.
    pub fn axis(&self) -> WeightAxis {
        self.axis
    }

    /// Correction factor for an object at `value`.
    ///
    /// `1.0` for the Reference role, for values outside the densities' range,
    /// and where the subject density is empty; otherwise
    /// `reference(bin) / subject(bin)`.
    pub fn factor(&self, role: DatasetRole, value: f64) -> f64 {
        if !role.is_reweighted() {
            return 1.0;
        }
        let Some(bin) = self.subject.find_bin(value) else {
            return 1.0;
        };
        let subject = self.subject.content(bin);
        if subject == 0.0 {
            return 1.0;
        }
        self.reference.content(bin) / subject
    }

    /// Split back into `(reference, subject)`.
    pub fn into_parts(self) -> (Histogram, Histogram) {
        (self.reference, self.subject)
    }
}

/// Combined event weight: the product of independent per-axis factors.
pub fn compose(factors: impl IntoIterator<Item = f64>) -> f64 {
    factors.into_iter().product()
}

/// Factors of one object, one per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFactors {
    /// Vertex-z factor.
    pub vertex_z: f64,
    /// Beam-spot-z factor.
    pub beamspot_z: f64,
}

impl Default for AxisFactors {
    fn default() -> Self {
        Self { vertex_z: 1.0, beamspot_z: 1.0 }
    }
}

impl AxisFactors {
    /// Factor of one axis.
    pub fn get(&self, axis: WeightAxis) -> f64 {
        match axis {
            WeightAxis::VertexZ => self.vertex_z,
            WeightAxis::BeamspotZ => self.beamspot_z,
        }
    }

    /// Weight for a fill depending on `axes`; `1.0` for no axes.
    pub fn weight_for(&self, axes: &[WeightAxis]) -> f64 {
        compose(axes.iter().map(|&a| self.get(a)))
    }
}

/// Diagnostics for a stream of per-object weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSummary {
    /// Number of weights.
    pub n: u64,
    /// `Σ w`.
    pub sum_weights: f64,
    /// `Σ w²`.
    pub sum_weights_sq: f64,
    /// Minimum weight (`+inf` when empty).
    pub min_weight: f64,
    /// Maximum weight (`-inf` when empty).
    pub max_weight: f64,
    /// Number of weights equal to exactly 1 (no correction applied).
    pub n_unit: u64,
}

impl Default for WeightSummary {
    fn default() -> Self {
        Self {
            n: 0,
            sum_weights: 0.0,
            sum_weights_sq: 0.0,
            min_weight: f64::INFINITY,
            max_weight: f64::NEG_INFINITY,
            n_unit: 0,
        }
    }
}

impl WeightSummary {
    /// Record one weight.
    pub fn push(&mut self, w: f64) {
        self.n += 1;
        self.sum_weights += w;
        self.sum_weights_sq += w * w;
        self.min_weight = self.min_weight.min(w);
        self.max_weight = self.max_weight.max(w);
        if w == 1.0 {
            self.n_unit += 1;
        }
    }

    /// Mean weight, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum_weights / self.n as f64)
    }

    /// Effective sample size `(Σw)² / Σw²`, `None` when `Σw² == 0`.
    pub fn effective_sample_size(&self) -> Option<f64> {
        (self.sum_weights_sq > 0.0)
            .then(|| self.sum_weights * self.sum_weights / self.sum_weights_sq)
    }
}
