//! # sq-hist
//!
//! Binned histograms for data/simulation comparisons.
//!
//! Provides fixed variable-width histograms with weighted fills, reference
//! density lookups and the per-event correction factors computed from them,
//! a multi-histogram accumulator, profile histograms, and bin-wise ratio
//! histograms with propagated statistical errors.
//!
//! ## Example
//!
//! ```
//! use sq_core::{DatasetRole, WeightAxis};
//! use sq_hist::{Binning, DensityPair, ReferenceDensityBuilder};
//!
//! let binning = Binning::uniform(4, 0.0, 4.0).unwrap();
//! let reference = ReferenceDensityBuilder::build("ref", [0.5, 1.5, 2.5, 3.5], &binning);
//! let subject = ReferenceDensityBuilder::build("sub", [0.5, 0.5, 1.5, 2.5], &binning);
//! let pair = DensityPair::new(WeightAxis::VertexZ, reference, subject).unwrap();
//! assert_eq!(pair.factor(DatasetRole::Subject, 0.7), 0.5);
//! assert_eq!(pair.factor(DatasetRole::Reference, 0.7), 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod binning;
pub mod density;
pub mod histogram;
pub mod profile;
pub mod ratio;
pub mod reweight;

pub use accumulator::{MultiplicityTally, WeightedHistogramAccumulator, max_signed};
pub use binning::{Binning, MAX_BINS, arange};
pub use density::ReferenceDensityBuilder;
pub use histogram::Histogram;
pub use profile::Profile;
pub use ratio::{RatioHistogramBuilder, ratio, ratio_error};
pub use reweight::{AxisFactors, DensityPair, WeightSummary, compose};
