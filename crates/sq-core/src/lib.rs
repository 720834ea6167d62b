//! # sq-core
//!
//! Core types, traits, and error handling for the SexaQ reweighting toolkit.
//!
//! This crate provides:
//! - The common error type
//! - Dataset roles and reweighting axes
//! - Typed event rows and the [`EventSource`] accessor trait

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{EventSource, EventView};
pub use types::{
    BeamspotRow, DatasetRole, DaughterTrack, EventCandidates, GlobalRow, KshortCandidate,
    PrimaryVertexRow, WeightAxis,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
