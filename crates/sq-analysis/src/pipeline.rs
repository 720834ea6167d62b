//! The reweighting run: densities, weighted fills, finalization.
//!
//! Phases are strictly ordered. [`ReferenceDensities`] is built over every
//! shared row of both datasets before the fill phase starts, and the fill
//! phase only ever borrows it. Each pass reads rows `0..n` of both datasets
//! with `n <= min(rows(reference), rows(subject))`.

use std::collections::BTreeSet;

use sq_core::{DatasetRole, Error, EventSource, EventView, KshortCandidate, Result, WeightAxis};
use sq_hist::{
    AxisFactors, Binning, DensityPair, Histogram, MultiplicityTally, Profile,
    RatioHistogramBuilder, ReferenceDensityBuilder, WeightSummary, WeightedHistogramAccumulator,
};

use crate::artifact::{
    ArtifactError, ArtifactMeta, HistogramRecord, MultiplicitySummary, ProfileRecord,
    ReweightArtifact, SCHEMA_VERSION, WeightSummaryRecord, now_unix_ms,
};
use crate::config::{RatioDirection, ReweightConfig, ReweightingConfig};
use crate::observables::{Observable, kshort_observables};
use crate::selection::{CandidateSelection, SelectionPolicy};

const PV_LABEL: &str = "PV v_{z} (cm)";
const BEAMSPOT_LABEL: &str = "beamspot v_{z} (cm)";

/// Vertex-z and beam-spot-z density pairs of a run.
#[derive(Debug, Clone)]
pub struct ReferenceDensities {
    vertex: DensityPair,
    beamspot: DensityPair,
}

impl ReferenceDensities {
    /// Count the primary-vertex and beam-spot z positions of rows
    /// `0..shared_rows` of both datasets.
    ///
    /// With `normalize_densities` set, an empty density is
    /// [`Error::EmptyHistogram`].
    pub fn build(
        reference: &dyn EventSource,
        subject: &dyn EventSource,
        shared_rows: usize,
        cfg: &ReweightingConfig,
    ) -> Result<Self> {
        let vertex_binning = cfg.vertex_density.to_binning()?;
        let beamspot_binning = cfg.beamspot_density.to_binning()?;

        let (reference_pv, reference_bs) = count_positions(
            DatasetRole::Reference,
            reference,
            shared_rows,
            (&vertex_binning, &beamspot_binning),
            cfg.normalize_densities,
        )?;
        let (subject_pv, subject_bs) = count_positions(
            DatasetRole::Subject,
            subject,
            shared_rows,
            (&vertex_binning, &beamspot_binning),
            cfg.normalize_densities,
        )?;
        Ok(Self {
            vertex: DensityPair::new(WeightAxis::VertexZ, reference_pv, subject_pv)?,
            beamspot: DensityPair::new(WeightAxis::BeamspotZ, reference_bs, subject_bs)?,
        })
    }

    /// Vertex-z pair.
    pub fn vertex(&self) -> &DensityPair {
        &self.vertex
    }

    /// Beam-spot-z pair.
    pub fn beamspot(&self) -> &DensityPair {
        &self.beamspot
    }

    /// Correction factors of candidate `c` in event `ev`.
    ///
    /// The vertex axis is keyed by the z of the vertex the candidate points
    /// back to, the beam-spot axis by the event's beam-spot z.
    pub fn factors(
        &self,
        role: DatasetRole,
        ev: &EventView<'_>,
        c: &KshortCandidate,
    ) -> AxisFactors {
        AxisFactors {
            vertex_z: self.vertex.factor(role, c.vz_dz_min_pv),
            beamspot_z: self.beamspot.factor(role, ev.beamspot.vz),
        }
    }

    /// Split into `(vertex, beamspot)`.
    pub fn into_pairs(self) -> (DensityPair, DensityPair) {
        (self.vertex, self.beamspot)
    }
}

/// Vertex and beam-spot densities of one dataset.
fn count_positions(
    role: DatasetRole,
    source: &dyn EventSource,
    rows: usize,
    (vertex_binning, beamspot_binning): (&Binning, &Binning),
    normalize: bool,
) -> Result<(Histogram, Histogram)> {
    let mut pv = ReferenceDensityBuilder::new(format!("h_RECO_PV0_vz_{role}"), vertex_binning)
        .with_labels(PV_LABEL, "#entries");
    let mut bs =
        ReferenceDensityBuilder::new(format!("h_RECO_beamspot_vz_{role}"), beamspot_binning)
            .with_labels(BEAMSPOT_LABEL, "#entries");

    for row in 0..rows {
        let ev = source.event(row)?;
        pv.push(ev.primary_vertex.vz);
        bs.push(ev.beamspot.vz);
    }
    tracing::info!(
        role = %role,
        rows,
        vertex_in_range = pv.counted(),
        beamspot_in_range = bs.counted(),
        "densities built"
    );

    if normalize {
        Ok((pv.finish_normalized()?, bs.finish_normalized()?))
    } else {
        Ok((pv.finish(), bs.finish()))
    }
}

/// Subject-only diagnostics of the correction factors.
struct ReweightChecks {
    pv_reweighted: Histogram,
    pv_not_reweighted: Histogram,
    beamspot_reweighted: Histogram,
    beamspot_not_reweighted: Histogram,
    profile_vz_dz_min_pv: Profile,
    profile_vz: Profile,
    summaries: [WeightSummary; 2],
}

impl ReweightChecks {
    fn new(cfg: &ReweightingConfig) -> Result<Self> {
        let check = cfg.check_binning.to_binning()?;
        let [y_min, y_max] = cfg.profile_weight_range;
        let hist =
            |name: &str, label: &str| Histogram::new(name, &check).with_labels(label, "#entries");
        Ok(Self {
            pv_reweighted: hist("h_RECO_PV0_vz_subject_reweighted", PV_LABEL),
            pv_not_reweighted: hist("h_RECO_PV0_vz_subject_not_reweighted", PV_LABEL),
            beamspot_reweighted: hist("h_RECO_beamspot_vz_subject_reweighted", BEAMSPOT_LABEL),
            beamspot_not_reweighted: hist(
                "h_RECO_beamspot_vz_subject_not_reweighted",
                BEAMSPOT_LABEL,
            ),
            profile_vz_dz_min_pv: Profile::new(
                "tprof_Ks_vz_dz_min_PV_weight",
                &Binning::uniform(100, -50.0, 50.0)?,
                y_min,
                y_max,
            )
            .with_labels("Ks v_{z} of best PV (cm)", "reweighting factor"),
            profile_vz: Profile::new(
                "tprof_Ks_vz_weight",
                &Binning::uniform(300, -150.0, 150.0)?,
                y_min,
                y_max,
            )
            .with_labels("Ks v_{z} (cm)", "reweighting factor"),
            summaries: [WeightSummary::default(); 2],
        })
    }

    fn record(&mut self, ev: &EventView<'_>, c: &KshortCandidate, f: &AxisFactors) {
        let pv_vz = ev.primary_vertex.vz;
        let bs_vz = ev.beamspot.vz;
        self.pv_reweighted.fill(pv_vz, f.vertex_z);
        self.pv_not_reweighted.fill(pv_vz, 1.0);
        self.beamspot_reweighted.fill(bs_vz, f.beamspot_z);
        self.beamspot_not_reweighted.fill(bs_vz, 1.0);
        self.profile_vz_dz_min_pv.fill(c.vz_dz_min_pv, f.vertex_z);
        self.profile_vz.fill(c.vz, f.vertex_z);
        for (summary, axis) in self.summaries.iter_mut().zip(WeightAxis::ALL) {
            summary.push(f.get(axis));
        }
    }
}

/// A configured reweighting run.
#[derive(Debug, Clone)]
pub struct ReweightPipeline {
    config: ReweightConfig,
    selection: CandidateSelection,
    observables: Vec<(Observable, Binning)>,
    deterministic: bool,
}

impl ReweightPipeline {
    /// Resolve selection and binnings; `policy_override` wins over the configured policy.
    pub fn new(config: ReweightConfig, policy_override: Option<SelectionPolicy>) -> Result<Self> {
        config.validate()?;
        let selection = config.selection.resolve(policy_override)?;

        let catalogue = kshort_observables();
        let known: BTreeSet<&str> = catalogue.iter().map(|o| o.name).collect();
        let unknown = config.binning_overrides.keys().find(|k| !known.contains(k.as_str()));
        if let Some(unknown) = unknown {
            return Err(Error::Validation(format!(
                "binning override for unknown observable '{unknown}'"
            )));
        }
        let observables = catalogue
            .into_iter()
            .map(|o| o.binning(&config.binning_overrides).map(|b| (o, b)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { config, selection, observables, deterministic: false })
    }

    /// Omit wall-clock timestamps from the artifact.
    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Run all phases over `reference` and `subject`.
    pub fn run(
        &self,
        reference: &dyn EventSource,
        subject: &dyn EventSource,
    ) -> Result<ReweightArtifact> {
        let reference_rows = reference.row_count();
        let subject_rows = subject.row_count();
        let shared_rows = reference_rows.min(subject_rows);
        let fill_rows = self.config.max_fill_rows.map_or(shared_rows, |cap| cap.min(shared_rows));
        tracing::info!(
            reference_rows,
            subject_rows,
            shared_rows,
            fill_rows,
            policy = %self.selection.policy,
            "starting reweighting run"
        );

        let densities =
            ReferenceDensities::build(reference, subject, shared_rows, &self.config.reweighting)?;

        let mut tally = MultiplicityTally::new();
        let mut checks = ReweightChecks::new(&self.config.reweighting)?;
        let reference_hists =
            self.fill(DatasetRole::Reference, reference, fill_rows, &densities, &mut tally, None)?;
        let subject_hists = self.fill(
            DatasetRole::Subject,
            subject,
            fill_rows,
            &densities,
            &mut tally,
            Some(&mut checks),
        )?;

        let mut errors = Vec::new();
        let vertex_histograms = self.finalize_vertex_group(densities, &checks, &mut errors);
        let (ratios, ratio_errors) =
            ratio_histograms(&reference_hists, &subject_hists, self.config.ratio_direction);
        errors.extend(ratio_errors);

        let summary = MultiplicitySummary::from(&tally);
        tracing::info!(
            reference_candidates = summary.reference.candidates,
            subject_candidates = summary.subject.candidates,
            reference_mean = ?summary.reference.mean_per_event,
            subject_mean = ?summary.subject.mean_per_event,
            reference_to_subject = ?summary.reference_to_subject,
            "selected K0s multiplicity"
        );
        if !errors.is_empty() {
            tracing::warn!(
                n_errors = errors.len(),
                "some histograms were left out of the artifact"
            );
        }

        let created_unix_ms = if self.deterministic { None } else { Some(now_unix_ms()?) };
        Ok(ReweightArtifact {
            schema_version: SCHEMA_VERSION.to_string(),
            meta: ArtifactMeta {
                tool: "sexaq".to_string(),
                tool_version: sq_core::VERSION.to_string(),
                created_unix_ms,
                reference_rows,
                subject_rows,
                shared_rows,
                fill_rows,
                selection_policy: self.selection.policy,
                ratio_direction: self.config.ratio_direction,
                normalize_densities: self.config.reweighting.normalize_densities,
            },
            vertex_histograms,
            vertex_profiles: vec![
                ProfileRecord::from(&checks.profile_vz_dz_min_pv),
                ProfileRecord::from(&checks.profile_vz),
            ],
            reference_histograms: reference_hists.iter().map(HistogramRecord::from).collect(),
            subject_histograms: subject_hists.iter().map(HistogramRecord::from).collect(),
            ratio_histograms: ratios.iter().map(HistogramRecord::from).collect(),
            summary,
            weight_summaries: WeightAxis::ALL
                .iter()
                .zip(&checks.summaries)
                .map(|(&axis, s)| WeightSummaryRecord::new(axis, s))
                .collect(),
            errors,
        })
    }

    /// Fill every tracked observable for one dataset over rows `0..rows`.
    fn fill(
        &self,
        role: DatasetRole,
        source: &dyn EventSource,
        rows: usize,
        densities: &ReferenceDensities,
        tally: &mut MultiplicityTally,
        mut checks: Option<&mut ReweightChecks>,
    ) -> Result<Vec<Histogram>> {
        let mut acc = WeightedHistogramAccumulator::new();
        for (obs, binning) in &self.observables {
            acc.register(Histogram::new(obs.name, binning).with_labels(obs.x_label, "#entries"))?;
        }

        let progress_every = self.config.progress_every;
        for row in 0..rows {
            if progress_every > 0 && row % progress_every == 0 {
                tracing::info!(role = %role, row, "reached event");
            }
            let ev = source.event(row)?;
            if !self.config.event.accepts(ev.global) {
                continue;
            }

            let mut selected = 0;
            for c in &ev.kshort.candidates {
                if !self.selection.accepts(c) {
                    continue;
                }
                selected += 1;

                let factors = densities.factors(role, &ev, c);
                if let Some(checks) = checks.as_mut() {
                    checks.record(&ev, c, &factors);
                }
                for (obs, _) in &self.observables {
                    let w = factors.weight_for(obs.axes);
                    for v in obs.values(&ev, c) {
                        acc.fill(obs.name, v, w)?;
                    }
                }
            }
            tally.record(role, selected);
        }

        tracing::debug!(role = %role, rows, histograms = acc.len(), "fill pass done");
        Ok(acc.into_histograms())
    }

    fn finalize_vertex_group(
        &self,
        densities: ReferenceDensities,
        checks: &ReweightChecks,
        errors: &mut Vec<ArtifactError>,
    ) -> Vec<HistogramRecord> {
        let cfg = &self.config.reweighting;
        let (vertex, beamspot) = densities.into_pairs();
        for pair in [&vertex, &beamspot] {
            tracing::debug!(axis = %pair.axis(), "finalizing densities");
        }
        let (pv_ref, pv_sub) = vertex.into_parts();
        let (bs_ref, bs_sub) = beamspot.into_parts();

        let staged = [
            (pv_ref, cfg.vertex_output_rebin),
            (pv_sub, cfg.vertex_output_rebin),
            (checks.pv_reweighted.clone(), 1),
            (checks.pv_not_reweighted.clone(), 1),
            (bs_ref, cfg.beamspot_output_rebin),
            (bs_sub, cfg.beamspot_output_rebin),
            (checks.beamspot_reweighted.clone(), 1),
            (checks.beamspot_not_reweighted.clone(), 1),
        ];

        let mut out = Vec::with_capacity(staged.len());
        for (mut h, rebin) in staged {
            let finalized = h.rebin(rebin).and_then(|()| h.scale_to_density());
            match finalized {
                Ok(()) => {
                    h.y_label = "density".to_string();
                    out.push(HistogramRecord::from(&h));
                }
                Err(e) => {
                    tracing::warn!(histogram = %h.name, error = %e, "skipping vertex histogram");
                    errors.push(ArtifactError::new(h.name.clone(), &e));
                }
            }
        }
        out
    }
}

/// Pair reference and subject histograms by name and build their ratios.
///
/// A pair that fails (missing partner, differing bins) is reported and the
/// remaining pairs proceed.
pub fn ratio_histograms(
    reference: &[Histogram],
    subject: &[Histogram],
    direction: RatioDirection,
) -> (Vec<Histogram>, Vec<ArtifactError>) {
    let builder = RatioHistogramBuilder::new(direction.suffix(), direction.y_label());
    let mut ratios = Vec::with_capacity(reference.len());
    let mut errors = Vec::new();

    for r in reference {
        let result = match subject.iter().find(|s| s.name == r.name) {
            None => Err(Error::UnknownHistogram(r.name.clone())),
            Some(s) => {
                let (numerator, denominator) = match direction {
                    RatioDirection::ReferenceOverSubject => (r, s),
                    RatioDirection::SubjectOverReference => (s, r),
                };
                builder.build(numerator, denominator)
            }
        };
        match result {
            Ok(h) => ratios.push(h),
            Err(e) => {
                tracing::warn!(histogram = %r.name, error = %e, "ratio failed");
                errors.push(ArtifactError::new(r.name.clone(), &e));
            }
        }
    }
    (ratios, errors)
}
