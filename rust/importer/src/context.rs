// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Producer-side state shared by the feature importers.

use crate::batch::BatchWriter;
use crate::codec::GeometryCodec;
use crate::config::ImporterConfig;
use crate::decomposer::GeometryDecomposer;
use crate::error::Result;
use crate::identity::{IdentityEntry, IdentityIndex, RingIndex};
use crate::ids::{Sequence, SequenceAllocator, SurrogateId};
use crate::report::{DiagnosticKind, ImportReport};
use crate::rows::Row;
use crate::xlink::{DeferredReferenceTask, XlinkSender};
use citydb_lite_core::GeometryNode;
use std::sync::Arc;

/// Everything an importer needs while storing one feature: id
/// allocation, buffered writes, identity registration and the resolver
/// queue.
pub struct ImportContext {
    pub(crate) config: ImporterConfig,
    pub(crate) allocator: Arc<dyn SequenceAllocator>,
    pub(crate) identities: Arc<IdentityIndex>,
    pub(crate) rings: Arc<RingIndex>,
    pub(crate) codec: Arc<dyn GeometryCodec>,
    pub(crate) writer: BatchWriter,
    pub(crate) xlinks: XlinkSender,
    pub(crate) report: Arc<ImportReport>,
    current_feature: Option<String>,
}

impl ImportContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: ImporterConfig,
        allocator: Arc<dyn SequenceAllocator>,
        identities: Arc<IdentityIndex>,
        rings: Arc<RingIndex>,
        codec: Arc<dyn GeometryCodec>,
        writer: BatchWriter,
        xlinks: XlinkSender,
        report: Arc<ImportReport>,
    ) -> Self {
        Self {
            config,
            allocator,
            identities,
            rings,
            codec,
            writer,
            xlinks,
            report,
            current_feature: None,
        }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn next_id(&self, sequence: Sequence) -> Result<SurrogateId> {
        self.allocator.next(sequence)
    }

    pub fn add_row(&mut self, row: Row) -> Result<()> {
        self.writer.add(row)
    }

    /// Queue a reference for the resolver, tagged with the current feature.
    pub fn defer(&self, task: DeferredReferenceTask) -> Result<()> {
        self.xlinks
            .send(task.with_feature(self.current_feature.as_deref()))
    }

    pub fn warn(&self, kind: DiagnosticKind, path: Option<&str>, message: impl Into<String>) {
        self.report
            .warn(kind, self.current_feature.as_deref(), path, message);
    }

    /// Publish an identity. Overwriting a different object is reported
    /// but not fatal.
    pub fn register(&self, entry: IdentityEntry) {
        if let Some(conflict) = self.identities.put(entry) {
            let root = |id: Option<SurrogateId>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
            self.warn(
                DiagnosticKind::IdentityConflict,
                None,
                format!(
                    "#{} stored as {} {} and again as {} {}",
                    conflict.external_id,
                    conflict.previous_kind,
                    root(conflict.previous_root),
                    conflict.new_kind,
                    root(conflict.new_root)
                ),
            );
        }
    }

    /// Identifier for objects that carry none in the document.
    pub fn generate_id(&self) -> String {
        format!("{}{}", self.config.id_prefix, uuid::Uuid::new_v4())
    }

    /// Store a geometry tree; see [`GeometryDecomposer`].
    pub fn decompose(
        &mut self,
        node: &GeometryNode,
        owner: Option<SurrogateId>,
    ) -> Result<Option<SurrogateId>> {
        GeometryDecomposer::decompose(self, node, owner)
    }

    pub fn current_feature(&self) -> Option<&str> {
        self.current_feature.as_deref()
    }

    pub(crate) fn set_feature(&mut self, feature: Option<&str>) {
        self.current_feature = feature.map(str::to_string);
    }
}
