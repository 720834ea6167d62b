use std::cell::Cell;

use approx::assert_relative_eq;
use sq_analysis::{Dataset, ReweightArtifact, ReweightConfig, ReweightPipeline, SelectionPolicy};
use sq_core::{
    BeamspotRow, DaughterTrack, EventCandidates, EventSource, EventView, GlobalRow,
    KshortCandidate, PrimaryVertexRow, Result,
};

const SMALL_VERTEX: &str = r#"
reweighting:
  vertex_density: { uniform: { n_bins: 3, lo: 0.0, hi: 3.0 } }
  vertex_output_rebin: 1
progress_every: 0
"#;

fn candidate(vz: f64) -> KshortCandidate {
    let track = DaughterTrack {
        pt: 0.9,
        pz: 4.0,
        dxy_beamspot: 1.2,
        dz_beamspot: -0.4,
        dz_min_pv: 0.3,
    };
    KshortCandidate {
        mass: 0.497,
        eta: 0.3,
        pt: 1.1,
        pz: 5.0,
        vz,
        vz_dz_min_pv: vz,
        lxy: 2.0,
        dxy_beamspot: 0.02,
        dz_000: vz,
        dz_pv0: 0.01,
        dz_min_pv: 0.01,
        daughters: [track, track],
    }
}

/// One candidate per event, sitting at the event's primary vertex.
fn dataset(name: &str, vertex_z: &[f64], dimuon_pt: f64) -> Dataset {
    let n = vertex_z.len();
    Dataset::new(
        name,
        vertex_z.iter().map(|&vz| PrimaryVertexRow { vz }).collect(),
        vec![BeamspotRow { vz: 0.0 }; n],
        vec![GlobalRow { dimuon_pt }; n],
        vertex_z
            .iter()
            .map(|&vz| EventCandidates { candidates: vec![candidate(vz)] })
            .collect(),
    )
    .unwrap()
}

fn run(yaml: &str, reference: &dyn EventSource, subject: &dyn EventSource) -> ReweightArtifact {
    let config = ReweightConfig::from_yaml_slice(yaml.as_bytes()).unwrap();
    ReweightPipeline::new(config, Some(SelectionPolicy::BestVertex))
        .unwrap()
        .deterministic(true)
        .run(reference, subject)
        .unwrap()
}

#[test]
fn weighted_subject_matches_reference_where_populated() {
    let reference = dataset("data", &[0.5, 1.5, 2.5], 10.0);
    let subject = dataset("mc", &[0.5, 0.5, 2.5], 10.0);
    let artifact = run(SMALL_VERTEX, &reference, &subject);

    assert!(artifact.errors.is_empty(), "{:?}", artifact.errors);
    assert_eq!(artifact.meta.shared_rows, 3);
    assert_eq!(artifact.meta.created_unix_ms, None);

    let find = |group: &[sq_analysis::HistogramRecord], name: &str| {
        group.iter().find(|h| h.name == name).cloned().unwrap()
    };
    let r = find(&artifact.reference_histograms, "h_RECO_Ks_vz");
    let s = find(&artifact.subject_histograms, "h_RECO_Ks_vz");
    assert_eq!(r.bin_edges, s.bin_edges);

    let mut populated = 0;
    for (i, &sc) in s.bin_content.iter().enumerate() {
        if sc != 0.0 {
            populated += 1;
            assert_relative_eq!(sc, r.bin_content[i], epsilon = 1e-12);
        }
    }
    assert_eq!(populated, 2);

    // Unit weights: errors are Poisson.
    for (c, e) in r.bin_content.iter().zip(&r.bin_error) {
        assert_relative_eq!(e * e, *c, epsilon = 1e-12);
    }

    let ratio = find(&artifact.ratio_histograms, "h_RECO_Ks_vz_ReferenceToSubject");
    let at = |x: f64| ratio.bin_edges.iter().position(|&e| e == x).unwrap();
    assert_relative_eq!(ratio.bin_content[at(0.0)], 1.0, epsilon = 1e-12);
    assert_eq!(ratio.bin_content[at(1.0)], 0.0);
    assert_eq!(ratio.y_label, "Reference/Subject");

    assert_eq!(artifact.summary.reference.candidates, 3);
    assert_eq!(artifact.summary.subject.candidates, 3);
    assert_eq!(artifact.summary.reference_to_subject, Some(1.0));

    let vertex = &artifact.weight_summaries[0];
    assert_eq!(vertex.n, 3);
    assert_relative_eq!(vertex.mean.unwrap(), 2.0 / 3.0, epsilon = 1e-12);
    assert_eq!(vertex.min, Some(0.5));
    let beamspot = &artifact.weight_summaries[1];
    assert_eq!(beamspot.n_unit, 3);
}

#[test]
fn reference_is_never_reweighted() {
    let reference = dataset("data", &[0.5, 1.5, 2.5], 10.0);
    let subject = dataset("mc", &[0.5, 0.5, 0.5], 10.0);
    let artifact = run(SMALL_VERTEX, &reference, &subject);
    for h in &artifact.reference_histograms {
        assert_relative_eq!(h.integral(), h.entries as f64, epsilon = 1e-12);
        for (c, e) in h.bin_content.iter().zip(&h.bin_error) {
            assert_relative_eq!(e * e, *c, epsilon = 1e-12);
        }
    }
    let s = artifact.subject_histograms.iter().find(|h| h.name == "h_RECO_Ks_vz").unwrap();
    assert_relative_eq!(s.integral(), 1.0, epsilon = 1e-12);
}

#[test]
fn all_catalogue_histograms_are_written() {
    let reference = dataset("data", &[0.5], 10.0);
    let subject = dataset("mc", &[0.5], 10.0);
    let artifact = run(SMALL_VERTEX, &reference, &subject);
    assert_eq!(artifact.reference_histograms.len(), 22);
    assert_eq!(artifact.subject_histograms.len(), 22);
    assert_eq!(artifact.ratio_histograms.len(), 22);
    assert_eq!(artifact.vertex_profiles.len(), 2);
    assert_eq!(artifact.vertex_histograms.len(), 8);
    assert!(artifact.histogram("h_RECO_PV0_vz_subject_reweighted").is_some());
}

#[test]
fn output_finalization_failures_are_isolated() {
    // Rebinning 3 density bins by 10 cannot succeed.
    let yaml = r#"
reweighting:
  vertex_density: { uniform: { n_bins: 3, lo: 0.0, hi: 3.0 } }
  vertex_output_rebin: 10
"#;
    let reference = dataset("data", &[0.5, 1.5], 10.0);
    let subject = dataset("mc", &[0.5, 1.5], 10.0);
    let artifact = run(yaml, &reference, &subject);

    let failed: Vec<_> = artifact.errors.iter().map(|e| e.histogram.as_str()).collect();
    assert_eq!(failed, vec!["h_RECO_PV0_vz_reference", "h_RECO_PV0_vz_subject"]);
    assert!(artifact.histogram("h_RECO_beamspot_vz_reference").is_some());
    assert_eq!(artifact.ratio_histograms.len(), 22);
}

#[test]
fn event_selection_skips_soft_events() {
    let yaml = format!("{SMALL_VERTEX}event:\n  min_dimuon_pt: 5.0\n");
    let reference = dataset("data", &[0.5, 1.5], 10.0);
    let subject = dataset("mc", &[0.5, 1.5], 3.0);
    let artifact = run(&yaml, &reference, &subject);
    assert_eq!(artifact.summary.reference.events, 2);
    assert_eq!(artifact.summary.subject.events, 0);
    assert_eq!(artifact.summary.reference_to_subject, None);
    assert_eq!(artifact.summary.subject.mean_per_event, None);
}

struct Tracked<'a> {
    inner: &'a Dataset,
    max_row: Cell<Option<usize>>,
}

impl<'a> Tracked<'a> {
    fn new(inner: &'a Dataset) -> Self {
        Self { inner, max_row: Cell::new(None) }
    }
}

impl EventSource for Tracked<'_> {
    fn row_count(&self) -> usize {
        self.inner.row_count()
    }

    fn event(&self, row: usize) -> Result<EventView<'_>> {
        self.max_row.set(Some(self.max_row.get().map_or(row, |m| m.max(row))));
        self.inner.event(row)
    }
}

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| (i % 3) as f64 + 0.5).collect()
}

#[test]
fn rows_beyond_the_shorter_dataset_are_never_read() {
    let reference = dataset("data", &ramp(100), 10.0);
    let subject = dataset("mc", &ramp(80), 10.0);
    let (r, s) = (Tracked::new(&reference), Tracked::new(&subject));

    let artifact = run(SMALL_VERTEX, &r, &s);
    assert_eq!(r.max_row.get(), Some(79));
    assert_eq!(s.max_row.get(), Some(79));
    assert_eq!(artifact.meta.reference_rows, 100);
    assert_eq!(artifact.meta.subject_rows, 80);
    assert_eq!(artifact.summary.reference.events, 80);
}

#[test]
fn fill_cap_does_not_shrink_the_density_pass() {
    let yaml = format!("{SMALL_VERTEX}max_fill_rows: 10\n");
    let reference = dataset("data", &ramp(50), 10.0);
    let subject = dataset("mc", &ramp(40), 10.0);
    let (r, s) = (Tracked::new(&reference), Tracked::new(&subject));

    let artifact = run(&yaml, &r, &s);
    assert_eq!(r.max_row.get(), Some(39));
    assert_eq!(artifact.meta.shared_rows, 40);
    assert_eq!(artifact.meta.fill_rows, 10);
    assert_eq!(artifact.summary.reference.events, 10);
    assert_eq!(artifact.summary.subject.events, 10);
}
