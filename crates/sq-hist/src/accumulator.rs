//! Named weighted histograms filled in a single pass, plus per-event
//! multiplicity bookkeeping.

use std::collections::HashMap;

use sq_core::{DatasetRole, Error, Result};

use crate::histogram::Histogram;

/// Set of named histograms filled by name.
#[derive(Debug, Clone, Default)]
pub struct WeightedHistogramAccumulator {
    histograms: Vec<Histogram>,
    name_to_index: HashMap<String, usize>,
}

impl WeightedHistogramAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `histogram` under its name. Duplicate names are rejected.
    pub fn register(&mut self, histogram: Histogram) -> Result<()> {
        if self.name_to_index.contains_key(&histogram.name) {
            return Err(Error::Validation(format!(
                "histogram '{}' registered twice",
                histogram.name
            )));
        }
        self.name_to_index.insert(histogram.name.clone(), self.histograms.len());
        self.histograms.push(histogram);
        Ok(())
    }

    /// Fill the histogram `name` with `(value, weight)`.
    ///
    /// Values outside the histogram range are dropped silently.
    pub fn fill(&mut self, name: &str, value: f64, weight: f64) -> Result<()> {
        let idx = *self
            .name_to_index
            .get(name)
            .ok_or_else(|| Error::UnknownHistogram(name.to_string()))?;
        self.histograms[idx].fill(value, weight);
        Ok(())
    }

    /// Tracked histogram by name.
    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.name_to_index.get(name).map(|&i| &self.histograms[i])
    }

    /// Number of tracked histograms.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Whether no histogram is tracked.
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Consume into histograms in registration order.
    pub fn into_histograms(self) -> Vec<Histogram> {
        self.histograms
    }
}

/// Per-event counts of selected objects, per dataset role.
#[derive(Debug, Clone, Default)]
pub struct MultiplicityTally {
    reference: Vec<usize>,
    subject: Vec<usize>,
}

impl MultiplicityTally {
    /// Empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the selected-object count of one event.
    pub fn record(&mut self, role: DatasetRole, count: usize) {
        self.counts_mut(role).push(count);
    }

    /// Per-event counts in row order.
    pub fn counts(&self, role: DatasetRole) -> &[usize] {
        match role {
            DatasetRole::Reference => &self.reference,
            DatasetRole::Subject => &self.subject,
        }
    }

    fn counts_mut(&mut self, role: DatasetRole) -> &mut Vec<usize> {
        match role {
            DatasetRole::Reference => &mut self.reference,
            DatasetRole::Subject => &mut self.subject,
        }
    }

    /// Number of events recorded.
    pub fn events(&self, role: DatasetRole) -> usize {
        self.counts(role).len()
    }

    /// Total selected objects.
    pub fn total(&self, role: DatasetRole) -> usize {
        self.counts(role).iter().sum()
    }

    /// Mean selected objects per event, `None` without events.
    pub fn mean(&self, role: DatasetRole) -> Option<f64> {
        let n = self.events(role);
        (n > 0).then(|| self.total(role) as f64 / n as f64)
    }

    /// Reference total over subject total, `None` when the subject total is 0.
    pub fn total_ratio(&self) -> Option<f64> {
        let subject = self.total(DatasetRole::Subject);
        (subject > 0).then(|| self.total(DatasetRole::Reference) as f64 / subject as f64)
    }
}

/// Whichever of `a`, `b` lies further from zero, sign preserved.
///
/// Ties (`|a| == |b|`) return `b`.
pub fn max_signed(a: f64, b: f64) -> f64 {
    if a.abs() > b.abs() { a } else { b }
}
