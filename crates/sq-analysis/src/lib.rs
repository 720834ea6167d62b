//! # sq-analysis
//!
//! The SexaQ K⁰s reweighting pipeline and BDT training plans.
//!
//! A run reads two datasets (Reference and Subject) through
//! [`sq_core::EventSource`], builds the vertex-z and beam-spot-z reference
//! densities, fills the tracked K⁰s observables with per-candidate correction
//! weights, and assembles a [`ReweightArtifact`] with ratio histograms.
//!
//! ## Example
//!
//! ```no_run
//! use sq_analysis::{Dataset, ReweightConfig, ReweightPipeline, SelectionPolicy};
//!
//! let config = ReweightConfig::from_path("reweight.yaml").unwrap();
//! let pipeline = ReweightPipeline::new(config, Some(SelectionPolicy::BestVertex)).unwrap();
//! let data = Dataset::from_path("data.json").unwrap();
//! let mc = Dataset::from_path("mc.json").unwrap();
//! let artifact = pipeline.run(&data, &mc).unwrap();
//! println!("{} ratio histograms", artifact.ratio_histograms.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod bdt;
pub mod config;
pub mod dataset;
pub mod observables;
pub mod pipeline;
pub mod selection;

pub use artifact::{HistogramRecord, ProfileRecord, ReweightArtifact, SCHEMA_VERSION};
pub use bdt::{BdtOptions, SplitMode, TrainTestSplit, TrainingConfig, TrainingPlan};
pub use config::{BinningSpec, RatioDirection, ReweightConfig, UniformBins};
pub use dataset::Dataset;
pub use observables::{Observable, ObservableValues, kshort_observables};
pub use pipeline::{ReferenceDensities, ReweightPipeline, ratio_histograms};
pub use selection::{CandidateSelection, EventSelection, SelectionPolicy};
