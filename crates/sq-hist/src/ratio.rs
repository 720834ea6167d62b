//! Bin-wise ratio histograms with propagated statistical errors.

use sq_core::{Error, Result};

use crate::histogram::Histogram;

/// Error of `n / d` for Poisson-like counts: `(n/d) * sqrt(1/d + 1/n)`.
///
/// Callers pass un-rescaled bin contents; both must be non-zero.
pub fn ratio_error(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator * (1.0 / denominator + 1.0 / numerator).sqrt()
}

/// Builds `numerator / denominator` histograms.
#[derive(Debug, Clone)]
pub struct RatioHistogramBuilder {
    suffix: String,
    y_label: String,
}

impl Default for RatioHistogramBuilder {
    fn default() -> Self {
        Self { suffix: "_ratio".into(), y_label: "ratio".into() }
    }
}

impl RatioHistogramBuilder {
    /// Builder naming results `<numerator name><suffix>` with y label `y_label`.
    pub fn new(suffix: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self { suffix: suffix.into(), y_label: y_label.into() }
    }

    /// Ratio of `numerator` over `denominator`, bin by bin.
    ///
    /// Bins where either input is zero get content 0 and error 0.
    pub fn build(&self, numerator: &Histogram, denominator: &Histogram) -> Result<Histogram> {
        if !numerator.same_binning(denominator) {
            return Err(Error::BinningMismatch {
                left: numerator.name.clone(),
                right: denominator.name.clone(),
            });
        }

        let mut out = numerator.empty_like(format!("{}{}", numerator.name, self.suffix));
        out.y_label = self.y_label.clone();
        for bin in 0..numerator.n_bins() {
            let n = numerator.content(bin);
            let d = denominator.content(bin);
            if n == 0.0 || d == 0.0 {
                out.set_bin(bin, 0.0, 0.0);
            } else {
                out.set_bin(bin, n / d, ratio_error(n, d));
            }
        }
        Ok(out)
    }
}

/// `numerator / denominator` with the default naming.
pub fn ratio(numerator: &Histogram, denominator: &Histogram) -> Result<Histogram> {
    RatioHistogramBuilder::default().build(numerator, denominator)
}
