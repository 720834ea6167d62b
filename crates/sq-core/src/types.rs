//! Common data types for the SexaQ toolkit

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a dataset plays in a reweighting run.
///
/// The Reference role is the trusted baseline (recorded collisions); the
/// Subject role is the sample being corrected towards it (simulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetRole {
    /// Baseline distribution, always filled with weight 1.
    Reference,
    /// Distribution reweighted towards the reference.
    Subject,
}

impl DatasetRole {
    /// Short lowercase label, used in histogram names.
    pub fn label(self) -> &'static str {
        match self {
            DatasetRole::Reference => "reference",
            DatasetRole::Subject => "subject",
        }
    }

    /// Whether correction weights are computed for this role.
    pub fn is_reweighted(self) -> bool {
        matches!(self, DatasetRole::Subject)
    }
}

impl fmt::Display for DatasetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Independent reweighting axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightAxis {
    /// Primary-vertex z position.
    VertexZ,
    /// Beam-spot z position.
    BeamspotZ,
}

impl WeightAxis {
    /// Both axes.
    pub const ALL: [WeightAxis; 2] = [WeightAxis::VertexZ, WeightAxis::BeamspotZ];
}

impl fmt::Display for WeightAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightAxis::VertexZ => f.write_str("vertex_z"),
            WeightAxis::BeamspotZ => f.write_str("beamspot_z"),
        }
    }
}

/// Per-event leading primary vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimaryVertexRow {
    /// z position of the leading primary vertex (cm).
    pub vz: f64,
}

/// Per-event beam spot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamspotRow {
    /// z position of the beam spot (cm).
    pub vz: f64,
}

/// Per-event global observables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalRow {
    /// Transverse momentum of the di-muon system (GeV), the hard-scale proxy.
    #[serde(default)]
    pub dimuon_pt: f64,
}

/// One daughter track of a K⁰s candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DaughterTrack {
    /// Transverse momentum (GeV).
    pub pt: f64,
    /// Longitudinal momentum (GeV).
    pub pz: f64,
    /// Transverse impact parameter w.r.t. the beam spot (cm).
    pub dxy_beamspot: f64,
    /// Longitudinal impact parameter w.r.t. the beam spot (cm).
    pub dz_beamspot: f64,
    /// Longitudinal impact parameter w.r.t. the best-matching primary vertex (cm).
    pub dz_min_pv: f64,
}

/// A reconstructed K⁰s candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KshortCandidate {
    /// Invariant mass (GeV).
    pub mass: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Transverse momentum (GeV).
    pub pt: f64,
    /// Longitudinal momentum (GeV).
    pub pz: f64,
    /// Decay vertex z position (cm).
    pub vz: f64,
    /// z position of the primary vertex the candidate points back to (cm).
    pub vz_dz_min_pv: f64,
    /// Transverse decay length w.r.t. the beam spot (cm).
    pub lxy: f64,
    /// Signed transverse impact parameter w.r.t. the beam spot (cm).
    pub dxy_beamspot: f64,
    /// Longitudinal impact parameter w.r.t. the origin (cm).
    pub dz_000: f64,
    /// Longitudinal impact parameter w.r.t. the leading primary vertex (cm).
    pub dz_pv0: f64,
    /// Longitudinal impact parameter w.r.t. the best-matching primary vertex (cm).
    pub dz_min_pv: f64,
    /// The two daughter tracks.
    pub daughters: [DaughterTrack; 2],
}

/// Variable-length candidate list of one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCandidates {
    /// Candidates in reconstruction order.
    #[serde(default)]
    pub candidates: Vec<KshortCandidate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels() {
        assert_eq!(DatasetRole::Reference.to_string(), "reference");
        assert!(DatasetRole::Subject.is_reweighted());
        assert!(!DatasetRole::Reference.is_reweighted());
    }

    #[test]
    fn test_role_serde() {
        let r: DatasetRole = serde_json::from_str("\"subject\"").unwrap();
        assert_eq!(r, DatasetRole::Subject);
        assert_eq!(serde_json::to_string(&WeightAxis::BeamspotZ).unwrap(), "\"beamspot_z\"");
    }

    #[test]
    fn test_empty_candidate_list_defaults() {
        let ev: EventCandidates = serde_json::from_str("{}").unwrap();
        assert!(ev.candidates.is_empty());
    }
}
