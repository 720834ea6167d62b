//! Catalogue of tracked K⁰s observables.
//!
//! Each observable names its histogram, its default binning, the value(s)
//! one selected candidate contributes, and the reweighting axes its fill
//! weight depends on.

use std::collections::BTreeMap;

use sq_core::{EventView, KshortCandidate, Result, WeightAxis};
use sq_hist::{Binning, max_signed};

use crate::config::BinningSpec;

const VERTEX: &[WeightAxis] = &[WeightAxis::VertexZ];
const BEAMSPOT: &[WeightAxis] = &[WeightAxis::BeamspotZ];

/// Value(s) one candidate contributes to an observable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObservableValues {
    /// A single fill.
    One(f64),
    /// Two fills with the same weight (one per daughter track).
    Two(f64, f64),
}

impl IntoIterator for ObservableValues {
    type Item = f64;
    type IntoIter = std::iter::Chain<std::iter::Once<f64>, std::option::IntoIter<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            ObservableValues::One(a) => std::iter::once(a).chain(None::<f64>),
            ObservableValues::Two(a, b) => std::iter::once(a).chain(Some(b)),
        }
    }
}

type Extractor = fn(&EventView<'_>, &KshortCandidate) -> ObservableValues;

/// One tracked observable.
#[derive(Clone, Copy)]
pub struct Observable {
    /// Histogram name.
    pub name: &'static str,
    /// x-axis label.
    pub x_label: &'static str,
    /// Reweighting axes whose factors multiply into the fill weight.
    pub axes: &'static [WeightAxis],
    default_binning: fn() -> Result<Binning>,
    extract: Extractor,
}

impl std::fmt::Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.name)
            .field("axes", &self.axes)
            .finish_non_exhaustive()
    }
}

impl Observable {
    /// Built-in binning.
    pub fn default_binning(&self) -> Result<Binning> {
        (self.default_binning)()
    }

    /// Binning after applying a per-name override, if any.
    pub fn binning(&self, overrides: &BTreeMap<String, BinningSpec>) -> Result<Binning> {
        match overrides.get(self.name) {
            Some(spec) => spec.to_binning(),
            None => self.default_binning(),
        }
    }

    /// Value(s) contributed by candidate `c` of event `ev`.
    pub fn values(&self, ev: &EventView<'_>, c: &KshortCandidate) -> ObservableValues {
        (self.extract)(ev, c)
    }
}

fn vz_binning() -> Result<Binning> {
    Binning::from_segments(&[(-150.0, -60.0, 10.0), (-60.0, 60.0, 1.0), (60.0, 150.0, 10.0)])
}

fn lxy_binning() -> Result<Binning> {
    Binning::from_segments(&[
        (0.0, 50.0, 1.0),
        (50.0, 56.0, 1.5),
        (56.0, 65.0, 1.8),
        (65.0, 70.0, 2.5),
        (70.0, 90.0, 5.0),
    ])
}

fn pt_binning() -> Result<Binning> {
    Binning::from_segments(&[(0.0, 0.8, 0.02), (0.8, 2.0, 0.1), (2.0, 8.0, 0.2), (8.0, 10.1, 0.3)])
}

fn pz_binning() -> Result<Binning> {
    Binning::from_segments(&[
        (0.0, 15.0, 1.0),
        (15.0, 21.0, 1.5),
        (21.0, 25.0, 2.0),
        (25.0, 40.0, 5.0),
    ])
}

fn dxy_binning() -> Result<Binning> {
    Binning::uniform(100, -10.0, 10.0)
}

fn dz_binning() -> Result<Binning> {
    Binning::from_segments(&[
        (-30.0, -20.0, 2.0),
        (-20.0, -14.0, 1.5),
        (-14.0, 14.0, 1.0),
        (14.0, 20.0, 1.5),
        (20.0, 30.0, 2.0),
    ])
}

fn track_dxy_binning() -> Result<Binning> {
    Binning::from_edges(vec![
        0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 5.5, 6.0, 6.5, 7.0, 8.0, 9.0, 10.0,
        12.0, 14.0, 16.0,
    ])
}

fn track_dz_binning() -> Result<Binning> {
    let mut edges = vec![-40.0, -35.0, -30.0];
    edges.extend((-14..=-7).map(|i| 2.0 * f64::from(i)));
    edges.extend((-13..=14).map(f64::from));
    edges.extend((8..=15).map(|i| 2.0 * f64::from(i)));
    edges.extend([35.0, 40.0]);
    Binning::from_edges(edges)
}

macro_rules! observable {
    (
        $name:literal,
        $label:literal,
        $axes:expr,
        $binning:ident,
        |$ev:ident, $c:ident| $body:expr
    ) => {
        Observable {
            name: $name,
            x_label: $label,
            axes: $axes,
            default_binning: $binning,
            extract: |$ev, $c| $body,
        }
    };
}

/// The 22 tracked K⁰s observables, in output order.
pub fn kshort_observables() -> Vec<Observable> {
    use ObservableValues::{One, Two};
    vec![
        observable!("h_RECO_Ks_vz", "Ks v_{z} (cm)", VERTEX, vz_binning, |_ev, c| One(c.vz)),
        observable!(
            "h_RECO_Ks_vz_beamspot",
            "Ks v_{z} (beamspot) (cm)",
            BEAMSPOT,
            vz_binning,
            |ev, c| One(ev.beamspot.vz - c.vz)
        ),
        observable!("h_RECO_Ks_lxy", "Ks l_{0} (beamspot) (cm)", VERTEX, lxy_binning, |_ev, c| {
            One(c.lxy)
        }),
        observable!("h_RECO_Ks_pt", "Ks p_{t} (GeV)", VERTEX, pt_binning, |_ev, c| One(c.pt)),
        observable!(
            "h_RECO_Ks_pt_tracks1",
            "Ks daughter 1 p_{t} (GeV)",
            VERTEX,
            pt_binning,
            |_ev, c| One(c.daughters[0].pt)
        ),
        observable!(
            "h_RECO_Ks_pt_tracks2",
            "Ks daughter 2 p_{t} (GeV)",
            VERTEX,
            pt_binning,
            |_ev, c| One(c.daughters[1].pt)
        ),
        observable!(
            "h_RECO_Ks_pt_tracks1_and_2",
            "Ks daughter 1 and 2 p_{t} (GeV)",
            VERTEX,
            pt_binning,
            |_ev, c| Two(c.daughters[0].pt, c.daughters[1].pt)
        ),
        observable!("h_RECO_Ks_pz", "Ks p_{z} (GeV)", VERTEX, pz_binning, |_ev, c| One(c.pz)),
        observable!(
            "h_RECO_Ks_pz_tracks1",
            "Ks daughter 1 p_{z} (GeV)",
            VERTEX,
            pz_binning,
            |_ev, c| One(c.daughters[0].pz)
        ),
        observable!(
            "h_RECO_Ks_pz_tracks2",
            "Ks daughter 2 p_{z} (GeV)",
            VERTEX,
            pz_binning,
            |_ev, c| One(c.daughters[1].pz)
        ),
        observable!(
            "h_RECO_Ks_pz_tracks1_and_2",
            "Ks daughter 1 and 2 p_{z} (GeV)",
            VERTEX,
            pz_binning,
            |_ev, c| Two(c.daughters[0].pz, c.daughters[1].pz)
        ),
        observable!("h_RECO_Ks_dxy_PV", "Ks d_{0} (cm)", VERTEX, dxy_binning, |_ev, c| {
            One(c.dxy_beamspot)
        }),
        observable!("h_RECO_Ks_dz", "Ks d_{z}(0,0,0) (cm)", VERTEX, dz_binning, |_ev, c| {
            One(c.dz_000)
        }),
        observable!(
            "h_RECO_Ks_Track1_dxy_beamspot",
            "d_{0}(beamspot) track1 (cm)",
            VERTEX,
            track_dxy_binning,
            |_ev, c| One(c.daughters[0].dxy_beamspot)
        ),
        observable!(
            "h_RECO_Ks_Track2_dxy_beamspot",
            "d_{0}(beamspot) track2 (cm)",
            VERTEX,
            track_dxy_binning,
            |_ev, c| One(c.daughters[1].dxy_beamspot)
        ),
        observable!(
            "h_RECO_Ks_Track1_and_2_dxy_beamspot",
            "d_{0}(beamspot) track1 and 2 (cm)",
            VERTEX,
            track_dxy_binning,
            |_ev, c| Two(c.daughters[0].dxy_beamspot, c.daughters[1].dxy_beamspot)
        ),
        observable!(
            "h_RECO_Ks_Track1Track2_max_dz_min_PV",
            "maxSigned[d_{z}(best PV Ks) track1, d_{z}(best PV Ks) track2] Ks (cm)",
            VERTEX,
            track_dz_binning,
            |_ev, c| One(max_signed(c.daughters[0].dz_min_pv, c.daughters[1].dz_min_pv))
        ),
        observable!(
            "h_RECO_Ks_Track1Track2_max_dz_beamspot",
            "maxSigned[d_{z}(beamspot) track1, d_{z}(beamspot) track2] Ks (cm)",
            VERTEX,
            track_dz_binning,
            |_ev, c| One(max_signed(c.daughters[0].dz_beamspot, c.daughters[1].dz_beamspot))
        ),
        observable!(
            "h_RECO_Ks_Track1_dz_min_PV",
            "d_{z}(best PV Ks) track1 (cm)",
            VERTEX,
            track_dz_binning,
            |_ev, c| One(c.daughters[0].dz_min_pv)
        ),
        observable!(
            "h_RECO_Ks_Track2_dz_min_PV",
            "d_{z}(best PV Ks) track2 (cm)",
            VERTEX,
            track_dz_binning,
            |_ev, c| One(c.daughters[1].dz_min_pv)
        ),
        observable!(
            "h_RECO_Ks_Track1_and_2_dz_min_PV",
            "d_{z}(best PV Ks) track 1 and 2 (cm)",
            VERTEX,
            track_dz_binning,
            |_ev, c| Two(c.daughters[0].dz_min_pv, c.daughters[1].dz_min_pv)
        ),
        observable!(
            "h_RECO_Ks_Track1_and_2_dz_beamspot",
            "d_{z}(beamspot) track 1 and 2 (cm)",
            BEAMSPOT,
            track_dz_binning,
            |_ev, c| Two(c.daughters[0].dz_beamspot, c.daughters[1].dz_beamspot)
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::tests::candidate;
    use sq_core::{BeamspotRow, EventCandidates, GlobalRow, PrimaryVertexRow};

    #[test]
    fn catalogue_is_complete_and_binnings_are_valid() {
        let obs = kshort_observables();
        assert_eq!(obs.len(), 22);
        let mut names: Vec<_> = obs.iter().map(|o| o.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 22);
        for o in &obs {
            o.default_binning().unwrap();
            assert!(!o.axes.is_empty(), "{}", o.name);
        }
    }

    #[test]
    fn default_binning_shapes() {
        let obs = kshort_observables();
        let n_bins = |name: &str| {
            obs.iter().find(|o| o.name == name).unwrap().default_binning().unwrap().n_bins()
        };
        assert_eq!(n_bins("h_RECO_Ks_vz"), 137);
        assert_eq!(n_bins("h_RECO_Ks_lxy"), 64);
        assert_eq!(n_bins("h_RECO_Ks_pt"), 88);
        assert_eq!(n_bins("h_RECO_Ks_pz"), 23);
        assert_eq!(n_bins("h_RECO_Ks_dxy_PV"), 100);
        assert_eq!(n_bins("h_RECO_Ks_dz"), 45);
        assert_eq!(n_bins("h_RECO_Ks_Track1_dxy_beamspot"), 20);
        assert_eq!(n_bins("h_RECO_Ks_Track1_dz_min_PV"), 48);
    }

    #[test]
    fn track_dz_edges_match_catalogue() {
        let b = track_dz_binning().unwrap();
        let e = b.edges();
        assert_eq!(&e[..6], &[-40.0, -35.0, -30.0, -28.0, -26.0, -24.0]);
        assert_eq!(&e[e.len() - 4..], &[28.0, 30.0, 35.0, 40.0]);
        assert!(e.contains(&-13.0) && e.contains(&0.0) && e.contains(&16.0));
    }

    #[test]
    fn extractors_read_the_right_fields() {
        let pv = PrimaryVertexRow { vz: 0.0 };
        let bs = BeamspotRow { vz: 0.5 };
        let global = GlobalRow { dimuon_pt: 0.0 };
        let ks = EventCandidates::default();
        let ev = EventView { primary_vertex: &pv, beamspot: &bs, global: &global, kshort: &ks };

        let mut c = candidate();
        c.daughters[0].dz_min_pv = 3.0;
        c.daughters[1].dz_min_pv = -5.0;
        c.daughters[1].pt = 7.0;

        let obs = kshort_observables();
        let get = |name: &str| obs.iter().find(|o| o.name == name).unwrap();

        assert_eq!(get("h_RECO_Ks_vz_beamspot").values(&ev, &c), ObservableValues::One(0.5 - 2.0));
        assert_eq!(get("h_RECO_Ks_vz_beamspot").axes, &[WeightAxis::BeamspotZ]);
        assert_eq!(
            get("h_RECO_Ks_Track1Track2_max_dz_min_PV").values(&ev, &c),
            ObservableValues::One(-5.0)
        );
        let both: Vec<f64> =
            get("h_RECO_Ks_pt_tracks1_and_2").values(&ev, &c).into_iter().collect();
        assert_eq!(both, vec![1.0, 7.0]);
        assert_eq!(get("h_RECO_Ks_dz").values(&ev, &c), ObservableValues::One(1.0));
        assert_eq!(get("h_RECO_Ks_Track1_and_2_dz_beamspot").axes, &[WeightAxis::BeamspotZ]);
    }

    #[test]
    fn overrides_replace_default_binning() {
        let obs = kshort_observables();
        let mut overrides = BTreeMap::new();
        overrides.insert("h_RECO_Ks_pt".to_string(), BinningSpec::uniform(5, 0.0, 5.0));
        assert_eq!(obs[3].binning(&overrides).unwrap().n_bins(), 5);
        assert_eq!(obs[0].binning(&overrides).unwrap().n_bins(), 137);
    }
}
