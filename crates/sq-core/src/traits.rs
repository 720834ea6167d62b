//! Core traits for the SexaQ toolkit
//!
//! The reweighting pipeline reads events through [`EventSource`] and never
//! depends on how a dataset is stored.

use crate::Result;
use crate::types::{BeamspotRow, EventCandidates, GlobalRow, PrimaryVertexRow};

/// Borrowed view of the four per-event tables at one row index.
#[derive(Debug, Clone, Copy)]
pub struct EventView<'a> {
    /// Leading primary vertex.
    pub primary_vertex: &'a PrimaryVertexRow,
    /// Beam spot.
    pub beamspot: &'a BeamspotRow,
    /// Global event observables.
    pub global: &'a GlobalRow,
    /// Reconstructed K⁰s candidates.
    pub kshort: &'a EventCandidates,
}

/// Row-indexed event dataset.
pub trait EventSource {
    /// Number of rows (events) available.
    fn row_count(&self) -> usize;

    /// Access the event at `row`.
    ///
    /// Returns [`crate::Error::RowOutOfRange`] for `row >= row_count()`.
    fn event(&self, row: usize) -> Result<EventView<'_>>;
}
