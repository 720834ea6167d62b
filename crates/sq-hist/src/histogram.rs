//! Weighted 1D histogram with variable-width bins.

use sq_core::{Error, Result};

use crate::binning::Binning;

/// A 1D histogram accumulating weights and squared weights per bin.
///
/// Bin edges are fixed at construction. Values outside the edges never touch
/// the bins; their weights are tallied in `underflow` / `overflow` only.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// x-axis label.
    pub x_label: String,
    /// y-axis label.
    pub y_label: String,
    binning: Binning,
    bin_content: Vec<f64>,
    sumw2: Vec<f64>,
    entries: u64,
    underflow: f64,
    overflow: f64,
    underflow_sumw2: f64,
    overflow_sumw2: f64,
}

impl Histogram {
    /// Create an empty histogram.
    pub fn new(name: impl Into<String>, binning: &Binning) -> Self {
        let n = binning.n_bins();
        Self {
            name: name.into(),
            x_label: String::new(),
            y_label: String::from("#entries"),
            binning: binning.clone(),
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            entries: 0,
            underflow: 0.0,
            overflow: 0.0,
            underflow_sumw2: 0.0,
            overflow_sumw2: 0.0,
        }
    }

    /// Set axis labels.
    pub fn with_labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    /// Histogram with given bin contents and Poisson variances (`sumw2 = content`).
    pub fn from_counts(
        name: impl Into<String>,
        binning: &Binning,
        counts: Vec<f64>,
    ) -> Result<Self> {
        if counts.len() != binning.n_bins() {
            return Err(Error::InvalidBinning(format!(
                "{} counts for {} bins",
                counts.len(),
                binning.n_bins()
            )));
        }
        let mut h = Self::new(name, binning);
        h.sumw2 = counts.clone();
        h.bin_content = counts;
        Ok(h)
    }

    /// Fill `value` with `weight`.
    ///
    /// NaN values are ignored; out-of-range values only update the flow tallies.
    pub fn fill(&mut self, value: f64, weight: f64) {
        if value.is_nan() {
            return;
        }
        match self.binning.find_bin(value) {
            Some(b) => {
                self.bin_content[b] += weight;
                self.sumw2[b] += weight * weight;
                self.entries += 1;
            }
            None if value < self.binning.x_min() => {
                self.underflow += weight;
                self.underflow_sumw2 += weight * weight;
            }
            None => {
                self.overflow += weight;
                self.overflow_sumw2 += weight * weight;
            }
        }
    }

    /// Bin index of `value`, `None` outside the range.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        self.binning.find_bin(value)
    }

    /// Binning of this histogram.
    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    /// Bin edges (length = n_bins + 1).
    pub fn bin_edges(&self) -> &[f64] {
        self.binning.edges()
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bin_content.len()
    }

    /// Bin contents (sum of weights per bin).
    pub fn bin_content(&self) -> &[f64] {
        &self.bin_content
    }

    /// Sum of weights squared per bin.
    pub fn sumw2(&self) -> &[f64] {
        &self.sumw2
    }

    /// Content of bin `bin`.
    pub fn content(&self, bin: usize) -> f64 {
        self.bin_content[bin]
    }

    /// Statistical error of bin `bin`, `sqrt(sumw2)`.
    pub fn error(&self, bin: usize) -> f64 {
        self.sumw2[bin].sqrt()
    }

    /// Overwrite content and error of bin `bin`.
    pub fn set_bin(&mut self, bin: usize, content: f64, error: f64) {
        self.bin_content[bin] = content;
        self.sumw2[bin] = error * error;
    }

    /// Number of in-range fills.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Summed weight of fills below the first edge.
    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    /// Summed weight of fills at or above the last edge.
    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Statistical error of the underflow tally.
    pub fn underflow_error(&self) -> f64 {
        self.underflow_sumw2.sqrt()
    }

    /// Statistical error of the overflow tally.
    pub fn overflow_error(&self) -> f64 {
        self.overflow_sumw2.sqrt()
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// `Σ content[i] * width[i]`.
    pub fn width_integral(&self) -> f64 {
        self.bin_content.iter().enumerate().map(|(i, c)| c * self.binning.width(i)).sum()
    }

    /// Rescale to a density: `content[i] / (integral * width[i])`.
    ///
    /// Afterwards `width_integral() == 1`. A zero or non-finite integral is
    /// [`Error::EmptyHistogram`] and leaves the histogram untouched.
    pub fn scale_to_density(&mut self) -> Result<()> {
        let integral = self.integral();
        if integral == 0.0 || !integral.is_finite() {
            return Err(Error::EmptyHistogram { name: self.name.clone() });
        }
        for i in 0..self.n_bins() {
            let f = 1.0 / (integral * self.binning.width(i));
            self.bin_content[i] *= f;
            self.sumw2[i] *= f * f;
        }
        tracing::debug!(name = %self.name, integral, "scaled to density");
        Ok(())
    }

    /// Merge every `ngroup` adjacent bins.
    ///
    /// When `ngroup` does not divide the bin count, the incomplete trailing
    /// bins are dropped from the range and their content and variance move
    /// to overflow.
    pub fn rebin(&mut self, ngroup: usize) -> Result<()> {
        let n_bins = self.n_bins();
        if ngroup == 0 || ngroup > n_bins {
            return Err(Error::InvalidBinning(format!(
                "cannot rebin '{}' ({n_bins} bins) by {ngroup}",
                self.name
            )));
        }
        if ngroup == 1 {
            return Ok(());
        }
        let new_bins = n_bins / ngroup;
        let used = new_bins * ngroup;

        let edges: Vec<f64> =
            self.binning.edges().iter().step_by(ngroup).take(new_bins + 1).copied().collect();
        let content: Vec<f64> =
            self.bin_content[..used].chunks(ngroup).map(|c| c.iter().sum()).collect();
        let sumw2: Vec<f64> = self.sumw2[..used].chunks(ngroup).map(|c| c.iter().sum()).collect();
        let spill: f64 = self.bin_content[used..].iter().sum();
        let spill_sumw2: f64 = self.sumw2[used..].iter().sum();

        self.binning = Binning::from_edges(edges)?;
        self.bin_content = content;
        self.sumw2 = sumw2;
        self.overflow += spill;
        self.overflow_sumw2 += spill_sumw2;
        Ok(())
    }

    /// Whether `other` has identical bin edges.
    pub fn same_binning(&self, other: &Histogram) -> bool {
        self.binning == other.binning
    }

    /// Empty histogram with the same binning and labels.
    pub fn empty_like(&self, name: impl Into<String>) -> Self {
        Self::new(name, &self.binning).with_labels(self.x_label.clone(), self.y_label.clone())
    }
}
