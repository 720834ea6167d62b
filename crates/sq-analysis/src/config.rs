//! Reweighting run configuration (YAML).
//!
//! Every field except the selection policy has a default reproducing the
//! standard K⁰s comparison, so a minimal file only names the policy:
//!
//! ```yaml
//! selection:
//!   policy: best_vertex
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sq_core::{Error, Result};
use sq_hist::Binning;

use crate::selection::{EventSelection, SelectionConfig};

/// Equal-width bins on `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformBins {
    /// Number of bins.
    pub n_bins: usize,
    /// Lower edge.
    pub lo: f64,
    /// Upper edge.
    pub hi: f64,
}

/// Bin edges as written in configuration.
///
/// Exactly one of the three forms is set:
///
/// ```yaml
/// uniform: { n_bins: 100, lo: -10.0, hi: 10.0 }
/// edges: [0.0, 0.5, 1.0, 2.0]
/// segments: [[0.0, 0.8, 0.02], [0.8, 2.0, 0.1]]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinningSpec {
    /// Equal-width bins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform: Option<UniformBins>,
    /// Explicit edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<f64>>,
    /// Concatenated half-open `[start, stop, step]` ranges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<[f64; 3]>>,
}

impl BinningSpec {
    /// `n_bins` equal-width bins on `[lo, hi)`.
    pub fn uniform(n_bins: usize, lo: f64, hi: f64) -> Self {
        Self { uniform: Some(UniformBins { n_bins, lo, hi }), ..Self::default() }
    }

    /// Explicit edges.
    pub fn edges(edges: Vec<f64>) -> Self {
        Self { edges: Some(edges), ..Self::default() }
    }

    /// Concatenated `[start, stop, step]` ranges.
    pub fn segments(segments: Vec<[f64; 3]>) -> Self {
        Self { segments: Some(segments), ..Self::default() }
    }

    /// Validated binning.
    pub fn to_binning(&self) -> Result<Binning> {
        match (&self.uniform, &self.edges, &self.segments) {
            (Some(u), None, None) => Binning::uniform(u.n_bins, u.lo, u.hi),
            (None, Some(edges), None) => Binning::from_edges(edges.clone()),
            (None, None, Some(segments)) => {
                let segs: Vec<(f64, f64, f64)> =
                    segments.iter().map(|s| (s[0], s[1], s[2])).collect();
                Binning::from_segments(&segs)
            }
            _ => Err(Error::Validation(
                "binning must set exactly one of `uniform`, `edges`, `segments`".into(),
            )),
        }
    }
}

/// Direction of the per-observable ratio histograms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioDirection {
    /// Reference over subject ("data over simulation").
    #[default]
    ReferenceOverSubject,
    /// Subject over reference.
    SubjectOverReference,
}

impl RatioDirection {
    /// Name suffix of ratio histograms.
    pub fn suffix(self) -> &'static str {
        match self {
            RatioDirection::ReferenceOverSubject => "_ReferenceToSubject",
            RatioDirection::SubjectOverReference => "_SubjectToReference",
        }
    }

    /// y-axis label of ratio histograms.
    pub fn y_label(self) -> &'static str {
        match self {
            RatioDirection::ReferenceOverSubject => "Reference/Subject",
            RatioDirection::SubjectOverReference => "Subject/Reference",
        }
    }
}

/// Dataset paths; both may also come from the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputsConfig {
    /// Reference dataset (recorded collisions).
    #[serde(default)]
    pub reference: Option<PathBuf>,
    /// Subject dataset (simulation).
    #[serde(default)]
    pub subject: Option<PathBuf>,
}

/// Reference densities, output rebinning, and reweighting diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReweightingConfig {
    /// Binning of the primary-vertex z density.
    #[serde(default = "default_vertex_density")]
    pub vertex_density: BinningSpec,
    /// Binning of the beam-spot z density.
    #[serde(default = "default_beamspot_density")]
    pub beamspot_density: BinningSpec,
    /// Normalize densities before using them as lookups.
    ///
    /// Off by default: both densities count the same number of rows, so raw
    /// counts already compare like for like.
    #[serde(default)]
    pub normalize_densities: bool,
    /// Rebin factor applied to the written vertex densities.
    #[serde(default = "default_vertex_rebin")]
    pub vertex_output_rebin: usize,
    /// Rebin factor applied to the written beam-spot densities.
    #[serde(default = "default_beamspot_rebin")]
    pub beamspot_output_rebin: usize,
    /// Binning of the reweighted / not-reweighted z check histograms.
    #[serde(default = "default_check_binning")]
    pub check_binning: BinningSpec,
    /// Accepted weight range of the weight profiles.
    #[serde(default = "default_profile_weight_range")]
    pub profile_weight_range: [f64; 2],
}

fn default_vertex_density() -> BinningSpec {
    BinningSpec::uniform(20000, -100.0, 100.0)
}

fn default_beamspot_density() -> BinningSpec {
    BinningSpec::uniform(2000, -2.0, 2.0)
}

fn default_vertex_rebin() -> usize {
    10
}

fn default_beamspot_rebin() -> usize {
    100
}

fn default_check_binning() -> BinningSpec {
    BinningSpec::uniform(200, -100.0, 100.0)
}

fn default_profile_weight_range() -> [f64; 2] {
    [0.0, 2.0]
}

impl Default for ReweightingConfig {
    fn default() -> Self {
        Self {
            vertex_density: default_vertex_density(),
            beamspot_density: default_beamspot_density(),
            normalize_densities: false,
            vertex_output_rebin: default_vertex_rebin(),
            beamspot_output_rebin: default_beamspot_rebin(),
            check_binning: default_check_binning(),
            profile_weight_range: default_profile_weight_range(),
        }
    }
}

/// Full configuration of a reweighting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReweightConfig {
    /// Input datasets.
    #[serde(default)]
    pub inputs: InputsConfig,
    /// Candidate selection.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Event selection.
    #[serde(default)]
    pub event: EventSelection,
    /// Densities and diagnostics.
    #[serde(default)]
    pub reweighting: ReweightingConfig,
    /// Cap on rows used by the histogram pass; densities always use all shared rows.
    #[serde(default)]
    pub max_fill_rows: Option<usize>,
    /// Ratio histogram direction.
    #[serde(default)]
    pub ratio_direction: RatioDirection,
    /// Per-observable binning overrides, keyed by histogram name.
    #[serde(default)]
    pub binning_overrides: BTreeMap<String, BinningSpec>,
    /// Log a progress line every this many rows (0 disables).
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

fn default_progress_every() -> usize {
    100_000
}

impl Default for ReweightConfig {
    fn default() -> Self {
        Self {
            inputs: InputsConfig::default(),
            selection: SelectionConfig::default(),
            event: EventSelection::default(),
            reweighting: ReweightingConfig::default(),
            max_fill_rows: None,
            ratio_direction: RatioDirection::default(),
            binning_overrides: BTreeMap::new(),
            progress_every: default_progress_every(),
        }
    }
}

impl ReweightConfig {
    /// Read a YAML (or JSON) configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_yaml_slice(&bytes)
    }

    /// Parse configuration from YAML bytes.
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self> {
        let cfg: ReweightConfig = serde_yaml_ng::from_slice(bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Semantic checks that do not depend on the observable catalogue.
    pub fn validate(&self) -> Result<()> {
        let r = &self.reweighting;
        r.vertex_density.to_binning()?;
        r.beamspot_density.to_binning()?;
        r.check_binning.to_binning()?;
        if r.vertex_output_rebin == 0 || r.beamspot_output_rebin == 0 {
            return Err(Error::Validation("output rebin factors must be >= 1".into()));
        }
        let [lo, hi] = r.profile_weight_range;
        if lo > hi {
            return Err(Error::Validation(format!(
                "profile_weight_range is empty: [{lo}, {hi}]"
            )));
        }
        if self.max_fill_rows == Some(0) {
            return Err(Error::Validation("max_fill_rows must be > 0 when set".into()));
        }
        for (name, spec) in &self.binning_overrides {
            spec.to_binning().map_err(|e| {
                Error::Validation(format!("binning override for '{name}': {e}"))
            })?;
        }
        Ok(())
    }
}
