//! K⁰s candidate and event selections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sq_core::{Error, GlobalRow, KshortCandidate, Result};

/// Which primary-vertex association a candidate must satisfy.
///
/// None of these is a default: a run names its policy explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Candidate points to the leading primary vertex: `|dz_pv0| < dz_cut`.
    LeadingVertex,
    /// Candidate points to its best-matching primary vertex: `|dz_min_pv| < dz_cut`.
    BestVertex,
    /// Candidate points away from every primary vertex: `|dz_min_pv| > dz_cut`.
    DisplacedFromVertices,
    /// Pile-up proxy: away from the leading vertex but close to another one.
    PileUp,
}

impl SelectionPolicy {
    /// All policies.
    pub const ALL: [SelectionPolicy; 4] = [
        SelectionPolicy::LeadingVertex,
        SelectionPolicy::BestVertex,
        SelectionPolicy::DisplacedFromVertices,
        SelectionPolicy::PileUp,
    ];

    /// Configuration / command-line spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionPolicy::LeadingVertex => "leading_vertex",
            SelectionPolicy::BestVertex => "best_vertex",
            SelectionPolicy::DisplacedFromVertices => "displaced_from_vertices",
            SelectionPolicy::PileUp => "pile_up",
        }
    }

    fn accepts(self, c: &KshortCandidate, dz_cut: f64) -> bool {
        match self {
            SelectionPolicy::LeadingVertex => c.dz_pv0.abs() < dz_cut,
            SelectionPolicy::BestVertex => c.dz_min_pv.abs() < dz_cut,
            SelectionPolicy::DisplacedFromVertices => c.dz_min_pv.abs() > dz_cut,
            SelectionPolicy::PileUp => c.dz_pv0.abs() > dz_cut && c.dz_min_pv.abs() < dz_cut,
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|p| p.as_str() == normalized).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
            format!("unknown selection policy '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

/// Selection thresholds as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Vertex-association policy; may instead be given on the command line.
    #[serde(default)]
    pub policy: Option<SelectionPolicy>,
    /// Open mass window (GeV).
    #[serde(default = "default_mass_window")]
    pub mass_window: [f64; 2],
    /// Upper bound on `|eta|`.
    #[serde(default = "default_max_abs_eta")]
    pub max_abs_eta: f64,
    /// Open window on the signed transverse impact parameter (cm).
    #[serde(default = "default_dxy_window")]
    pub dxy_beamspot_window: [f64; 2],
    /// Longitudinal impact-parameter threshold used by the policy (cm).
    #[serde(default = "default_dz_cut")]
    pub dz_cut: f64,
}

fn default_mass_window() -> [f64; 2] {
    [0.48, 0.52]
}

fn default_max_abs_eta() -> f64 {
    2.0
}

fn default_dxy_window() -> [f64; 2] {
    [0.0, 0.1]
}

fn default_dz_cut() -> f64 {
    0.2
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: None,
            mass_window: default_mass_window(),
            max_abs_eta: default_max_abs_eta(),
            dxy_beamspot_window: default_dxy_window(),
            dz_cut: default_dz_cut(),
        }
    }
}

impl SelectionConfig {
    /// Resolve into a predicate; `policy_override` wins over the configured policy.
    pub fn resolve(&self, policy_override: Option<SelectionPolicy>) -> Result<CandidateSelection> {
        let policy = policy_override.or(self.policy).ok_or_else(|| {
            Error::Validation(
                "no candidate selection policy: set `selection.policy` or pass --selection".into(),
            )
        })?;
        let [mass_min, mass_max] = self.mass_window;
        let [dxy_min, dxy_max] = self.dxy_beamspot_window;
        if mass_min >= mass_max || dxy_min >= dxy_max {
            return Err(Error::Validation(format!(
                "empty selection window (mass {:?}, dxy {:?})",
                self.mass_window, self.dxy_beamspot_window
            )));
        }
        if !(self.max_abs_eta > 0.0 && self.dz_cut > 0.0) {
            return Err(Error::Validation(format!(
                "max_abs_eta ({}) and dz_cut ({}) must be positive",
                self.max_abs_eta, self.dz_cut
            )));
        }
        Ok(CandidateSelection {
            policy,
            mass_min,
            mass_max,
            max_abs_eta: self.max_abs_eta,
            dxy_min,
            dxy_max,
            dz_cut: self.dz_cut,
        })
    }
}

/// Per-candidate selection predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSelection {
    /// Vertex-association policy.
    pub policy: SelectionPolicy,
    mass_min: f64,
    mass_max: f64,
    max_abs_eta: f64,
    dxy_min: f64,
    dxy_max: f64,
    dz_cut: f64,
}

impl CandidateSelection {
    /// Standard K⁰s thresholds with the given policy.
    pub fn new(policy: SelectionPolicy) -> Self {
        let c = SelectionConfig::default();
        Self {
            policy,
            mass_min: c.mass_window[0],
            mass_max: c.mass_window[1],
            max_abs_eta: c.max_abs_eta,
            dxy_min: c.dxy_beamspot_window[0],
            dxy_max: c.dxy_beamspot_window[1],
            dz_cut: c.dz_cut,
        }
    }

    /// Whether `c` passes the base cuts and the policy.
    pub fn accepts(&self, c: &KshortCandidate) -> bool {
        c.mass > self.mass_min
            && c.mass < self.mass_max
            && c.eta.abs() < self.max_abs_eta
            && c.dxy_beamspot > self.dxy_min
            && c.dxy_beamspot < self.dxy_max
            && self.policy.accepts(c, self.dz_cut)
    }
}

/// Event-level hard-scale requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSelection {
    /// Minimum di-muon pT (GeV); no cut when absent.
    #[serde(default)]
    pub min_dimuon_pt: Option<f64>,
}

impl EventSelection {
    /// Whether the event enters the histograms at all.
    pub fn accepts(&self, global: &GlobalRow) -> bool {
        match self.min_dimuon_pt {
            Some(min) => global.dimuon_pt >= min,
            None => true,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sq_core::DaughterTrack;

    pub(crate) fn candidate() -> KshortCandidate {
        let track = DaughterTrack {
            pt: 1.0,
            pz: 2.0,
            dxy_beamspot: 0.5,
            dz_beamspot: 0.3,
            dz_min_pv: 0.1,
        };
        KshortCandidate {
            mass: 0.497,
            eta: 0.4,
            pt: 1.2,
            pz: 3.0,
            vz: 2.0,
            vz_dz_min_pv: 2.0,
            lxy: 4.0,
            dxy_beamspot: 0.05,
            dz_000: 1.0,
            dz_pv0: 0.05,
            dz_min_pv: 0.05,
            daughters: [track, track],
        }
    }

    #[test]
    fn base_cuts() {
        let sel = CandidateSelection::new(SelectionPolicy::BestVertex);
        assert!(sel.accepts(&candidate()));

        for mass in [0.48, 0.52, 0.3] {
            assert!(!sel.accepts(&KshortCandidate { mass, ..candidate() }));
        }
        assert!(!sel.accepts(&KshortCandidate { eta: -2.0, ..candidate() }));
        for dxy in [0.0, 0.1, -0.05] {
            assert!(!sel.accepts(&KshortCandidate { dxy_beamspot: dxy, ..candidate() }));
        }
    }

    #[test]
    fn policies() {
        let near_leading = KshortCandidate { dz_pv0: 0.1, dz_min_pv: 0.1, ..candidate() };
        let pile_up = KshortCandidate { dz_pv0: 3.0, dz_min_pv: -0.1, ..candidate() };
        let displaced = KshortCandidate { dz_pv0: 3.0, dz_min_pv: -0.5, ..candidate() };

        let check = |policy, c: &KshortCandidate| CandidateSelection::new(policy).accepts(c);

        assert!(check(SelectionPolicy::LeadingVertex, &near_leading));
        assert!(!check(SelectionPolicy::LeadingVertex, &pile_up));

        assert!(check(SelectionPolicy::BestVertex, &near_leading));
        assert!(check(SelectionPolicy::BestVertex, &pile_up));
        assert!(!check(SelectionPolicy::BestVertex, &displaced));

        assert!(check(SelectionPolicy::DisplacedFromVertices, &displaced));
        assert!(!check(SelectionPolicy::DisplacedFromVertices, &pile_up));

        assert!(check(SelectionPolicy::PileUp, &pile_up));
        assert!(!check(SelectionPolicy::PileUp, &near_leading));
        assert!(!check(SelectionPolicy::PileUp, &displaced));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("best_vertex".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::BestVertex);
        assert_eq!("Pile-Up".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::PileUp);
        let err = "closest".parse::<SelectionPolicy>().unwrap_err();
        assert!(err.contains("leading_vertex"));
        for p in SelectionPolicy::ALL {
            assert_eq!(p.to_string().parse::<SelectionPolicy>().unwrap(), p);
        }
    }

    #[test]
    fn resolve_requires_a_policy() {
        let cfg = SelectionConfig::default();
        assert!(matches!(cfg.resolve(None), Err(Error::Validation(_))));
        let sel = cfg.resolve(Some(SelectionPolicy::PileUp)).unwrap();
        assert_eq!(sel.policy, SelectionPolicy::PileUp);

        let cfg = SelectionConfig { policy: Some(SelectionPolicy::LeadingVertex), ..cfg };
        assert_eq!(cfg.resolve(None).unwrap().policy, SelectionPolicy::LeadingVertex);
        assert_eq!(
            cfg.resolve(Some(SelectionPolicy::BestVertex)).unwrap().policy,
            SelectionPolicy::BestVertex
        );
    }

    #[test]
    fn resolve_rejects_empty_windows() {
        let cfg = SelectionConfig { mass_window: [0.52, 0.48], ..SelectionConfig::default() };
        assert!(cfg.resolve(Some(SelectionPolicy::BestVertex)).is_err());
    }

    #[test]
    fn event_selection() {
        let soft = GlobalRow { dimuon_pt: 3.0 };
        assert!(EventSelection::default().accepts(&soft));
        let hard = EventSelection { min_dimuon_pt: Some(5.0) };
        assert!(!hard.accepts(&soft));
        assert!(hard.accepts(&GlobalRow { dimuon_pt: 5.0 }));
    }
}
