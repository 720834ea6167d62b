//! Serialized output of a reweighting run (numbers-first JSON).

use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sq_core::{DatasetRole, Error, Result, WeightAxis};
use sq_hist::{Histogram, MultiplicityTally, Profile, WeightSummary};

use crate::config::RatioDirection;
use crate::selection::SelectionPolicy;

/// Artifact schema identifier.
pub const SCHEMA_VERSION: &str = "sexaq_reweight_v0";

/// Everything a run produces, grouped like the output directories of the
/// classic analysis: vertex checks, reference, subject, and ratios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReweightArtifact {
    /// Always [`SCHEMA_VERSION`].
    pub schema_version: String,
    /// Run metadata.
    pub meta: ArtifactMeta,
    /// Rebinned, normalized densities and the reweighting check histograms.
    pub vertex_histograms: Vec<HistogramRecord>,
    /// Correction factor versus vertex position.
    pub vertex_profiles: Vec<ProfileRecord>,
    /// Tracked observables of the Reference dataset.
    pub reference_histograms: Vec<HistogramRecord>,
    /// Tracked observables of the Subject dataset, weighted.
    pub subject_histograms: Vec<HistogramRecord>,
    /// Bin-wise ratios of the two groups above.
    pub ratio_histograms: Vec<HistogramRecord>,
    /// Selected-candidate multiplicities.
    pub summary: MultiplicitySummary,
    /// Per-axis statistics of the Subject correction factors.
    pub weight_summaries: Vec<WeightSummaryRecord>,
    /// Histograms skipped during finalization, with the reason.
    #[serde(default)]
    pub errors: Vec<ArtifactError>,
}

impl ReweightArtifact {
    /// Find a histogram by name in any group.
    pub fn histogram(&self, name: &str) -> Option<&HistogramRecord> {
        self.vertex_histograms
            .iter()
            .chain(&self.reference_histograms)
            .chain(&self.subject_histograms)
            .chain(&self.ratio_histograms)
            .find(|h| h.name == name)
    }

    /// Write pretty-printed JSON to `path`.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut w = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.write_all(b"\n")?;
        w.flush()?;
        Ok(())
    }

    /// Read an artifact back.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let artifact: ReweightArtifact = serde_json::from_slice(&bytes)?;
        if artifact.schema_version != SCHEMA_VERSION {
            return Err(Error::Validation(format!(
                "unsupported artifact schema '{}' (expected '{SCHEMA_VERSION}')",
                artifact.schema_version
            )));
        }
        Ok(artifact)
    }
}

/// Run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Producing tool.
    pub tool: String,
    /// Tool version.
    pub tool_version: String,
    /// Creation time; omitted for deterministic output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_unix_ms: Option<u64>,
    /// Rows in the Reference dataset.
    pub reference_rows: usize,
    /// Rows in the Subject dataset.
    pub subject_rows: usize,
    /// Rows read from each dataset for the densities.
    pub shared_rows: usize,
    /// Rows read from each dataset for the observable histograms.
    pub fill_rows: usize,
    /// Candidate selection policy in effect.
    pub selection_policy: SelectionPolicy,
    /// Direction of the ratio histograms.
    pub ratio_direction: RatioDirection,
    /// Whether densities were normalized before lookup.
    pub normalize_densities: bool,
}

pub(crate) fn now_unix_ms() -> Result<u64> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Io(std::io::Error::other(format!("system time error: {e}"))))?;
    Ok(d.as_millis() as u64)
}

/// Flattened histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramRecord {
    /// Histogram name.
    pub name: String,
    /// x-axis label.
    pub x_label: String,
    /// y-axis label.
    pub y_label: String,
    /// Bin edges.
    pub bin_edges: Vec<f64>,
    /// Bin contents.
    pub bin_content: Vec<f64>,
    /// Bin errors, `sqrt(sumw2)`.
    pub bin_error: Vec<f64>,
    /// In-range fills.
    pub entries: u64,
    /// Weight below the first edge.
    pub underflow: f64,
    /// Weight at or above the last edge.
    pub overflow: f64,
    /// Statistical error of `underflow`.
    #[serde(default)]
    pub underflow_error: f64,
    /// Statistical error of `overflow`.
    #[serde(default)]
    pub overflow_error: f64,
}

impl From<&Histogram> for HistogramRecord {
    fn from(h: &Histogram) -> Self {
        Self {
            name: h.name.clone(),
            x_label: h.x_label.clone(),
            y_label: h.y_label.clone(),
            bin_edges: h.bin_edges().to_vec(),
            bin_content: h.bin_content().to_vec(),
            bin_error: (0..h.n_bins()).map(|b| h.error(b)).collect(),
            entries: h.entries(),
            underflow: h.underflow(),
            overflow: h.overflow(),
            underflow_error: h.underflow_error(),
            overflow_error: h.overflow_error(),
        }
    }
}

impl HistogramRecord {
    /// Sum of bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}

/// Flattened profile; empty bins have no mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Profile name.
    pub name: String,
    /// x-axis label.
    pub x_label: String,
    /// y-axis label.
    pub y_label: String,
    /// Bin edges.
    pub bin_edges: Vec<f64>,
    /// Accepted `y` window.
    pub y_range: [f64; 2],
    /// Mean of `y` per bin.
    pub mean: Vec<Option<f64>>,
    /// Error on the mean per bin.
    pub error: Vec<Option<f64>>,
    /// Summed fill weight per bin.
    pub bin_weight: Vec<f64>,
    /// Accepted fills.
    pub entries: u64,
}

impl From<&Profile> for ProfileRecord {
    fn from(p: &Profile) -> Self {
        let bins = 0..p.n_bins();
        Self {
            name: p.name.clone(),
            x_label: p.x_label.clone(),
            y_label: p.y_label.clone(),
            bin_edges: p.bin_edges().to_vec(),
            y_range: p.y_range(),
            mean: bins.clone().map(|b| p.mean(b)).collect(),
            error: bins.clone().map(|b| p.error(b)).collect(),
            bin_weight: bins.map(|b| p.bin_weight(b)).collect(),
            entries: p.entries(),
        }
    }
}

/// Multiplicity of selected candidates in one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSummary {
    /// Events that passed the event selection.
    pub events: usize,
    /// Selected candidates.
    pub candidates: usize,
    /// Mean selected candidates per event.
    pub mean_per_event: Option<f64>,
}

/// Multiplicities of both datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplicitySummary {
    /// Reference dataset.
    pub reference: RoleSummary,
    /// Subject dataset.
    pub subject: RoleSummary,
    /// Reference candidates over Subject candidates.
    pub reference_to_subject: Option<f64>,
}

impl From<&MultiplicityTally> for MultiplicitySummary {
    fn from(t: &MultiplicityTally) -> Self {
        let role = |r: DatasetRole| RoleSummary {
            events: t.events(r),
            candidates: t.total(r),
            mean_per_event: t.mean(r),
        };
        Self {
            reference: role(DatasetRole::Reference),
            subject: role(DatasetRole::Subject),
            reference_to_subject: t.total_ratio(),
        }
    }
}

/// Correction-factor statistics of one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSummaryRecord {
    /// Reweighting axis.
    pub axis: WeightAxis,
    /// Number of factors (one per selected Subject candidate).
    pub n: u64,
    /// Factors equal to exactly 1.
    pub n_unit: u64,
    /// Smallest factor.
    pub min: Option<f64>,
    /// Largest factor.
    pub max: Option<f64>,
    /// Mean factor.
    pub mean: Option<f64>,
    /// `(Σw)² / Σw²`.
    pub effective_sample_size: Option<f64>,
}

impl WeightSummaryRecord {
    /// Record for `axis` from accumulated statistics.
    pub fn new(axis: WeightAxis, s: &WeightSummary) -> Self {
        let has = s.n > 0;
        Self {
            axis,
            n: s.n,
            n_unit: s.n_unit,
            min: has.then_some(s.min_weight),
            max: has.then_some(s.max_weight),
            mean: s.mean(),
            effective_sample_size: s.effective_sample_size(),
        }
    }
}

/// A histogram left out of the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactError {
    /// Histogram name.
    pub histogram: String,
    /// Failure message.
    pub message: String,
}

impl ArtifactError {
    pub(crate) fn new(histogram: impl Into<String>, err: &Error) -> Self {
        Self { histogram: histogram.into(), message: err.to_string() }
    }
}
