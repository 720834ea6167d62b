//! Profile histograms: weighted mean of `y` in bins of `x`.

use crate::binning::Binning;

/// Profile of `y` versus `x`.
///
/// Fills with `y` outside `[y_min, y_max]` are rejected.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Profile name.
    pub name: String,
    /// x-axis label.
    pub x_label: String,
    /// y-axis label.
    pub y_label: String,
    binning: Binning,
    y_min: f64,
    y_max: f64,
    sum_w: Vec<f64>,
    sum_w2: Vec<f64>,
    sum_wy: Vec<f64>,
    sum_wy2: Vec<f64>,
    entries: u64,
}

impl Profile {
    /// Empty profile with a `y` acceptance window.
    pub fn new(name: impl Into<String>, binning: &Binning, y_min: f64, y_max: f64) -> Self {
        let n = binning.n_bins();
        Self {
            name: name.into(),
            x_label: String::new(),
            y_label: String::new(),
            binning: binning.clone(),
            y_min,
            y_max,
            sum_w: vec![0.0; n],
            sum_w2: vec![0.0; n],
            sum_wy: vec![0.0; n],
            sum_wy2: vec![0.0; n],
            entries: 0,
        }
    }

    /// Set axis labels.
    pub fn with_labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    /// Fill `(x, y)` with weight 1.
    pub fn fill(&mut self, x: f64, y: f64) {
        self.fill_weighted(x, y, 1.0);
    }

    /// Fill `(x, y)` with weight `w`.
    pub fn fill_weighted(&mut self, x: f64, y: f64, w: f64) {
        if y.is_nan() || y < self.y_min || y > self.y_max {
            return;
        }
        let Some(b) = self.binning.find_bin(x) else {
            return;
        };
        self.sum_w[b] += w;
        self.sum_w2[b] += w * w;
        self.sum_wy[b] += w * y;
        self.sum_wy2[b] += w * y * y;
        self.entries += 1;
    }

    /// Bin edges.
    pub fn bin_edges(&self) -> &[f64] {
        self.binning.edges()
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.sum_w.len()
    }

    /// Accepted `y` window `[y_min, y_max]`.
    pub fn y_range(&self) -> [f64; 2] {
        [self.y_min, self.y_max]
    }

    /// Accepted fills.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Summed weight in bin `bin`.
    pub fn bin_weight(&self, bin: usize) -> f64 {
        self.sum_w[bin]
    }

    /// Weighted mean of `y` in bin `bin`, `None` when empty.
    pub fn mean(&self, bin: usize) -> Option<f64> {
        let w = self.sum_w[bin];
        (w != 0.0).then(|| self.sum_wy[bin] / w)
    }

    /// Error on the mean: `spread / sqrt(n_eff)`, `n_eff = (Σw)² / Σw²`.
    pub fn error(&self, bin: usize) -> Option<f64> {
        let mean = self.mean(bin)?;
        let w = self.sum_w[bin];
        let spread = (self.sum_wy2[bin] / w - mean * mean).abs().sqrt();
        let n_eff = w * w / self.sum_w2[bin];
        Some(spread / n_eff.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn profile_means_per_bin() {
        let b = Binning::uniform(2, 0.0, 2.0).unwrap();
        let mut p = Profile::new("p", &b, 0.0, 2.0);
        p.fill(0.5, 1.0);
        p.fill(0.6, 1.5);
        p.fill(1.5, 0.5);
        assert_relative_eq!(p.mean(0).unwrap(), 1.25);
        assert_relative_eq!(p.mean(1).unwrap(), 0.5);
        assert_eq!(p.entries(), 3);
    }

    #[test]
    fn profile_rejects_y_outside_window() {
        let b = Binning::uniform(1, 0.0, 1.0).unwrap();
        let mut p = Profile::new("p", &b, 0.0, 2.0);
        p.fill(0.5, 2.5);
        p.fill(0.5, -0.1);
        p.fill(1.5, 1.0);
        assert_eq!(p.entries(), 0);
        assert_eq!(p.mean(0), None);
        assert_eq!(p.error(0), None);
    }

    #[test]
    fn profile_error_on_mean() {
        let b = Binning::uniform(1, 0.0, 1.0).unwrap();
        let mut p = Profile::new("p", &b, 0.0, 10.0);
        for y in [1.0, 3.0] {
            p.fill(0.5, y);
        }
        // spread = 1, n_eff = 2
        assert_relative_eq!(p.error(0).unwrap(), 1.0 / 2.0f64.sqrt(), epsilon = 1e-12);
    }
}
