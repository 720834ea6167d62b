//! Reference density histograms used as lookup tables for reweighting.

use sq_core::Result;

use crate::binning::Binning;
use crate::histogram::Histogram;

/// Incrementally counts one observable series into a histogram.
///
/// The finished histogram is meant to be queried, not filled further; build
/// it over the whole shared row range before computing any weight from it.
#[derive(Debug, Clone)]
pub struct ReferenceDensityBuilder {
    histogram: Histogram,
}

impl ReferenceDensityBuilder {
    /// Start an empty density.
    pub fn new(name: impl Into<String>, binning: &Binning) -> Self {
        Self { histogram: Histogram::new(name, binning) }
    }

    /// Set axis labels of the resulting histogram.
    pub fn with_labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.histogram = self.histogram.with_labels(x_label, y_label);
        self
    }

    /// Count one value.
    pub fn push(&mut self, value: f64) {
        self.histogram.fill(value, 1.0);
    }

    /// Number of in-range values counted so far.
    pub fn counted(&self) -> u64 {
        self.histogram.entries()
    }

    /// Finished raw-count histogram.
    pub fn finish(self) -> Histogram {
        self.histogram
    }

    /// Finished histogram normalized to unit width-integral.
    pub fn finish_normalized(self) -> Result<Histogram> {
        let mut h = self.histogram;
        h.scale_to_density()?;
        Ok(h)
    }

    /// Count a whole series in one go.
    pub fn build(
        name: impl Into<String>,
        series: impl IntoIterator<Item = f64>,
        binning: &Binning,
    ) -> Histogram {
        let mut builder = Self::new(name, binning);
        for v in series {
            builder.push(v);
        }
        builder.finish()
    }
}
