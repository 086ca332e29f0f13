// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storage sink interface and an in-memory implementation.

use crate::ids::SurrogateId;
use crate::kind::ImporterKind;
use crate::rows::{Patch, Row, SurfaceGeometryRecord};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Failure reported by a storage backend. Always fatal to the run.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Rejected by storage: {0}")]
    Rejected(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination of committed batches.
///
/// Implementations are shared between the producer thread and the
/// resolver workers.
pub trait StorageSink: Send + Sync {
    /// Insert rows of one kind.
    fn write(&self, kind: ImporterKind, rows: Vec<Row>) -> Result<(), WriteError>;

    /// Update foreign-key columns of rows written earlier.
    fn patch(&self, kind: ImporterKind, patches: Vec<Patch>) -> Result<(), WriteError>;
}

#[derive(Debug, Default)]
struct Tables {
    rows: FxHashMap<ImporterKind, Vec<Row>>,
    positions: FxHashMap<(ImporterKind, SurrogateId), usize>,
    writes: Vec<(ImporterKind, usize)>,
    patches: Vec<Patch>,
    unmatched: Vec<Patch>,
}

/// Keeps every row in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<Tables>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows of one kind, with patches applied.
    pub fn rows(&self, kind: ImporterKind) -> Vec<Row> {
        self.tables
            .lock()
            .rows
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row(&self, kind: ImporterKind, id: SurrogateId) -> Option<Row> {
        let tables = self.tables.lock();
        let pos = *tables.positions.get(&(kind, id))?;
        tables.rows.get(&kind).and_then(|rows| rows.get(pos)).cloned()
    }

    pub fn count(&self, kind: ImporterKind) -> usize {
        self.tables.lock().rows.get(&kind).map_or(0, Vec::len)
    }

    /// `(kind, rows)` for every `write` call, in call order.
    pub fn write_log(&self) -> Vec<(ImporterKind, usize)> {
        self.tables.lock().writes.clone()
    }

    pub fn patches(&self) -> Vec<Patch> {
        self.tables.lock().patches.clone()
    }

    /// Patches whose row or column did not exist.
    pub fn unmatched_patches(&self) -> Vec<Patch> {
        self.tables.lock().unmatched.clone()
    }

    pub fn surface_geometries(&self) -> Vec<SurfaceGeometryRecord> {
        self.rows(ImporterKind::SurfaceGeometry)
            .into_iter()
            .filter_map(|row| match row {
                Row::SurfaceGeometry(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn surface_geometry(&self, id: SurrogateId) -> Option<SurfaceGeometryRecord> {
        match self.row(ImporterKind::SurfaceGeometry, id)? {
            Row::SurfaceGeometry(record) => Some(record),
            _ => None,
        }
    }
}

impl StorageSink for MemorySink {
    fn write(&self, kind: ImporterKind, rows: Vec<Row>) -> Result<(), WriteError> {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        tables.writes.push((kind, rows.len()));
        let table = tables.rows.entry(kind).or_default();
        for row in rows {
            if row.kind() != kind {
                return Err(WriteError::Rejected(format!(
                    "{} row written to {} table",
                    row.kind(),
                    kind.table()
                )));
            }
            if let Some(id) = row.id() {
                tables.positions.insert((kind, id), table.len());
            }
            table.push(row);
        }
        Ok(())
    }

    fn patch(&self, kind: ImporterKind, patches: Vec<Patch>) -> Result<(), WriteError> {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        for patch in patches {
            let applied = tables
                .positions
                .get(&(kind, patch.id))
                .and_then(|&pos| tables.rows.get_mut(&kind).and_then(|rows| rows.get_mut(pos)))
                .is_some_and(|row| row.apply(patch.column, patch.value));
            if applied {
                tables.patches.push(patch);
            } else {
                tables.unmatched.push(patch);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{BuildingRow, Column};

    #[test]
    fn patches_update_stored_rows() {
        let sink = MemorySink::new();
        let id = SurrogateId::new(3);
        sink.write(
            ImporterKind::Building,
            vec![Row::Building(BuildingRow {
                id,
                root_id: id,
                ..Default::default()
            })],
        )
        .unwrap();

        let patch = Patch {
            kind: ImporterKind::Building,
            id,
            column: Column::Lod2Solid,
            value: SurrogateId::new(99),
        };
        let missing = Patch {
            id: SurrogateId::new(4),
            ..patch
        };
        sink.patch(ImporterKind::Building, vec![patch, missing]).unwrap();

        let row = sink.row(ImporterKind::Building, id).unwrap();
        assert_eq!(row.reference(Column::Lod2Solid), Some(SurrogateId::new(99)));
        assert_eq!(sink.patches(), vec![patch]);
        assert_eq!(sink.unmatched_patches(), vec![missing]);
    }

    #[test]
    fn rows_of_the_wrong_kind_are_rejected() {
        let sink = MemorySink::new();
        let result = sink.write(
            ImporterKind::Room,
            vec![Row::Building(BuildingRow::default())],
        );
        assert!(matches!(result, Err(WriteError::Rejected(_))));
    }
}
