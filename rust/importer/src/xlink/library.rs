// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::{ImportError, Result};
use crate::ids::{Sequence, SequenceAllocator, SurrogateId};
use crate::kind::ImporterKind;
use crate::rows::{ImplicitGeometryRow, Row};
use crate::sink::StorageSink;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// One implicit geometry row per library object URI.
///
/// The lock is held across lookup, id reservation and the placeholder
/// insert, so two workers resolving the same URI never both insert.
#[derive(Debug, Default)]
pub struct LibraryObjectRegistry {
    objects: Mutex<FxHashMap<String, SurrogateId>>,
}

impl LibraryObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the implicit geometry for `uri`, inserting it on first use.
    /// The flag is `true` if this call inserted the row.
    pub fn resolve_or_insert(
        &self,
        uri: &str,
        mime_type: Option<&str>,
        allocator: &dyn SequenceAllocator,
        sink: &dyn StorageSink,
    ) -> Result<(SurrogateId, bool)> {
        let mut objects = self.objects.lock();
        if let Some(&id) = objects.get(uri) {
            return Ok((id, false));
        }

        let id = allocator.next(Sequence::ImplicitGeometry)?;
        let row = Row::ImplicitGeometry(ImplicitGeometryRow {
            id,
            mime_type: mime_type.map(str::to_string),
            library_uri: Some(uri.to_string()),
            relative_geometry_id: None,
        });
        sink.write(ImporterKind::ImplicitGeometry, vec![row])
            .map_err(|source| ImportError::Write {
                kind: ImporterKind::ImplicitGeometry,
                source,
            })?;
        objects.insert(uri.to_string(), id);
        tracing::debug!(uri, id = %id, "stored library object");
        Ok((id, true))
    }

    pub fn get(&self, uri: &str) -> Option<SurrogateId> {
        self.objects.lock().get(uri).copied()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}
