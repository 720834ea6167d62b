//! JSON-backed event datasets.
//!
//! A dataset file holds four row-aligned tables:
//!
//! ```json
//! {
//!   "primary_vertex": [{ "vz": 0.4 }],
//!   "beamspot":       [{ "vz": -0.02 }],
//!   "global":         [{ "dimuon_pt": 12.5 }],
//!   "kshort":         [{ "candidates": [] }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sq_core::{
    BeamspotRow, Error, EventCandidates, EventSource, EventView, GlobalRow, PrimaryVertexRow,
    Result,
};

/// In-memory dataset with row-aligned tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Display name (file stem when loaded from disk).
    #[serde(skip)]
    pub name: String,
    primary_vertex: Vec<PrimaryVertexRow>,
    beamspot: Vec<BeamspotRow>,
    global: Vec<GlobalRow>,
    kshort: Vec<EventCandidates>,
}

impl Dataset {
    /// Assemble a dataset, checking that all tables have the same row count.
    pub fn new(
        name: impl Into<String>,
        primary_vertex: Vec<PrimaryVertexRow>,
        beamspot: Vec<BeamspotRow>,
        global: Vec<GlobalRow>,
        kshort: Vec<EventCandidates>,
    ) -> Result<Self> {
        let ds = Self { name: name.into(), primary_vertex, beamspot, global, kshort };
        ds.validate()?;
        Ok(ds)
    }

    /// Load a dataset from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut ds: Dataset = serde_json::from_slice(&bytes)?;
        ds.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        ds.validate()?;
        tracing::debug!(name = %ds.name, rows = ds.row_count(), "loaded dataset");
        Ok(ds)
    }

    /// Parse a dataset from a JSON string.
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self> {
        let mut ds: Dataset = serde_json::from_str(json)?;
        ds.name = name.into();
        ds.validate()?;
        Ok(ds)
    }

    fn validate(&self) -> Result<()> {
        let n = self.primary_vertex.len();
        let lens = [
            ("beamspot", self.beamspot.len()),
            ("global", self.global.len()),
            ("kshort", self.kshort.len()),
        ];
        for (table, len) in lens {
            if len != n {
                return Err(Error::Validation(format!(
                    "dataset '{}': table '{table}' has {len} rows, primary_vertex has {n}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Total number of K⁰s candidates over all rows.
    pub fn candidate_count(&self) -> usize {
        self.kshort.iter().map(|e| e.candidates.len()).sum()
    }
}

impl EventSource for Dataset {
    fn row_count(&self) -> usize {
        self.primary_vertex.len()
    }

    fn event(&self, row: usize) -> Result<EventView<'_>> {
        let rows = self.row_count();
        if row >= rows {
            return Err(Error::RowOutOfRange { row, rows });
        }
        Ok(EventView {
            primary_vertex: &self.primary_vertex[row],
            beamspot: &self.beamspot[row],
            global: &self.global[row],
            kshort: &self.kshort[row],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROWS: &str = r#"{
        "primary_vertex": [{"vz": 1.0}, {"vz": -2.0}],
        "beamspot": [{"vz": 0.1}, {"vz": 0.2}],
        "global": [{"dimuon_pt": 4.0}, {}],
        "kshort": [{"candidates": []}, {}]
    }"#;

    #[test]
    fn parse_and_access_rows() {
        let ds = Dataset::from_json_str("data", TWO_ROWS).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.candidate_count(), 0);
        let ev = ds.event(1).unwrap();
        assert_eq!(ev.primary_vertex.vz, -2.0);
        assert_eq!(ev.beamspot.vz, 0.2);
        assert_eq!(ev.global.dimuon_pt, 0.0);
        assert!(matches!(ds.event(2), Err(Error::RowOutOfRange { row: 2, rows: 2 })));
    }

    #[test]
    fn misaligned_tables_are_rejected() {
        let json = r#"{
            "primary_vertex": [{"vz": 1.0}, {"vz": 2.0}],
            "beamspot": [{"vz": 0.1}],
            "global": [{}, {}],
            "kshort": [{}, {}]
        }"#;
        let err = Dataset::from_json_str("mc", json).unwrap_err();
        assert!(err.to_string().contains("beamspot"));
    }

    #[test]
    fn new_validates_lengths() {
        let ds = Dataset::new(
            "x",
            vec![PrimaryVertexRow { vz: 0.0 }],
            vec![BeamspotRow { vz: 0.0 }],
            vec![GlobalRow { dimuon_pt: 0.0 }],
            vec![],
        );
        assert!(matches!(ds, Err(Error::Validation(_))));
    }
}
