//! Validated bin-edge sequences.

use sq_core::{Error, Result};

/// Upper bound on the number of bins of any binning.
pub const MAX_BINS: usize = 1_000_000;

/// Strictly increasing, finite bin edges (length = n_bins + 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    edges: Vec<f64>,
}

impl Binning {
    /// Build from explicit edges.
    pub fn from_edges(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::InvalidBinning(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
            return Err(Error::InvalidBinning(format!("non-finite edge {bad}")));
        }
        for (i, w) in edges.windows(2).enumerate() {
            if w[1] <= w[0] {
                return Err(Error::InvalidBinning(format!(
                    "edges not strictly increasing at index {}: {} >= {}",
                    i + 1,
                    w[0],
                    w[1]
                )));
            }
        }
        Ok(Self { edges })
    }

    /// `n_bins` equal-width bins on `[lo, hi)`.
    pub fn uniform(n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::InvalidBinning("uniform binning needs n_bins > 0".into()));
        }
        if n_bins > MAX_BINS {
            return Err(Error::InvalidBinning(format!(
                "{n_bins} bins exceed the limit of {MAX_BINS}"
            )));
        }
        if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
            return Err(Error::InvalidBinning(format!("invalid uniform range [{lo}, {hi})")));
        }
        let step = (hi - lo) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| lo + step * i as f64).collect();
        edges.push(hi);
        Self::from_edges(edges)
    }

    /// Concatenation of half-open `arange(start, stop, step)` segments.
    ///
    /// The last edge is the last generated value, not the final `stop`.
    pub fn from_segments(segments: &[(f64, f64, f64)]) -> Result<Self> {
        let mut edges = Vec::new();
        for &(start, stop, step) in segments {
            if !(step.is_finite() && step > 0.0) {
                return Err(Error::InvalidBinning(format!("segment step must be > 0, got {step}")));
            }
            if !(start.is_finite() && stop.is_finite()) {
                return Err(Error::InvalidBinning(format!(
                    "non-finite segment [{start}, {stop})"
                )));
            }
            let n = arange_len(start, stop, step);
            if n > (MAX_BINS + 1).saturating_sub(edges.len()) {
                return Err(Error::InvalidBinning(format!(
                    "segment [{start}, {stop}) by {step} exceeds the limit of {MAX_BINS} bins"
                )));
            }
            edges.extend(arange(start, stop, step));
        }
        Self::from_edges(edges)
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Width of bin `bin`.
    pub fn width(&self, bin: usize) -> f64 {
        self.edges[bin + 1] - self.edges[bin]
    }

    /// Index of the bin with `edge[b] <= value < edge[b+1]`.
    ///
    /// Returns `None` for underflow, overflow and NaN.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        find_bin(&self.edges, value)
    }
}

pub(crate) fn find_bin(edges: &[f64], value: f64) -> Option<usize> {
    if value.is_nan() || value < edges[0] || value >= edges[edges.len() - 1] {
        return None;
    }
    // First edge strictly above `value`; always >= 1 here.
    let upper = edges.partition_point(|&e| e <= value);
    Some(upper - 1)
}

/// Evenly spaced values in `[start, stop)`, `ceil((stop - start) / step)` of them.
///
/// Empty for a non-positive step, an empty range, or a count above
/// [`MAX_BINS`] + 1.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let n = arange_len(start, stop, step);
    if n > MAX_BINS + 1 {
        return Vec::new();
    }
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Number of `arange` values; saturates at `usize::MAX` for unbounded ranges.
fn arange_len(start: f64, stop: f64, step: f64) -> usize {
    if step.is_nan() || step <= 0.0 || start.is_nan() || stop.is_nan() || stop <= start {
        return 0;
    }
    let n = ((stop - start) / step).ceil();
    if n.is_finite() && n < usize::MAX as f64 { n as usize } else { usize::MAX }
}
