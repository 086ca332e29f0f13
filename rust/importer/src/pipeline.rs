// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import driver
//!
//! Wires the producer side (feature importers, batch writer) to the
//! reference resolver and runs the end-of-input sequence:
//!
//! 1. flush every batch buffer in dependency order
//! 2. close the resolver queue
//! 3. drain the resolver, which commits its rows and then its patches

use crate::batch::BatchWriter;
use crate::codec::{GeometryCodec, PolygonCodec};
use crate::config::ImporterConfig;
use crate::context::ImportContext;
use crate::error::{ImportError, Result};
use crate::identity::{IdentityIndex, RingIndex};
use crate::ids::{AtomicSequenceAllocator, SequenceAllocator, SurrogateId};
use crate::importers::{import_appearance, ImporterRegistry};
use crate::report::{Diagnostic, ImportReport};
use crate::scheduler::DependencyScheduler;
use crate::sink::StorageSink;
use crate::xlink::{ResolverDeps, ResolverSummary, XlinkPool};
use citydb_lite_core::{Appearance, CityModel, CityObject, GeometryNode};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of a completed import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Top-level features imported.
    pub features: usize,
    /// Rows written by the producer and the resolver together.
    pub rows_written: usize,
    pub resolver: ResolverSummary,
    pub diagnostics: Vec<Diagnostic>,
}

/// One import run into one sink.
///
/// Dropping an importer without calling [`finish`](Importer::finish)
/// discards everything not yet flushed and stops the resolver.
pub struct Importer {
    ctx: ImportContext,
    registry: ImporterRegistry,
    pool: Option<XlinkPool>,
    cancel: Arc<AtomicBool>,
    features: usize,
}

impl Importer {
    pub fn new(config: ImporterConfig, sink: Arc<dyn StorageSink>) -> Result<Self> {
        let codec = Arc::new(PolygonCodec::new(config.srid));
        Self::with_components(config, sink, Arc::new(AtomicSequenceAllocator::new()), codec)
    }

    /// Build an importer around a custom id allocator and geometry codec.
    pub fn with_components(
        config: ImporterConfig,
        sink: Arc<dyn StorageSink>,
        allocator: Arc<dyn SequenceAllocator>,
        codec: Arc<dyn GeometryCodec>,
    ) -> Result<Self> {
        config.validate()?;

        let scheduler = Arc::new(DependencyScheduler::new()?);
        let identities = Arc::new(IdentityIndex::new());
        let rings = Arc::new(RingIndex::new());
        let report = Arc::new(ImportReport::new());

        let (pool, sender) = XlinkPool::spawn(
            &config,
            ResolverDeps {
                identities: Arc::clone(&identities),
                rings: Arc::clone(&rings),
                allocator: Arc::clone(&allocator),
                sink: Arc::clone(&sink),
                scheduler: Arc::clone(&scheduler),
                report: Arc::clone(&report),
            },
        )?;
        tracing::info!(
            batch_size = config.batch_size,
            workers = config.xlink_workers,
            appearance = config.import_appearance,
            "importer ready"
        );

        let writer = BatchWriter::new(scheduler, sink, config.batch_size);
        let ctx = ImportContext::new(config, allocator, identities, rings, codec, writer, sender, report);
        Ok(Self {
            ctx,
            registry: ImporterRegistry::new(),
            pool: Some(pool),
            cancel: Arc::new(AtomicBool::new(false)),
            features: 0,
        })
    }

    /// Register additional feature importers.
    pub fn registry_mut(&mut self) -> &mut ImporterRegistry {
        &mut self.registry
    }

    /// Setting the flag stops the import before the next feature.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn report(&self) -> &Arc<ImportReport> {
        &self.ctx.report
    }

    pub fn identities(&self) -> &Arc<IdentityIndex> {
        &self.ctx.identities
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }

    /// Import one top-level feature.
    pub fn import_feature(&mut self, feature: &CityObject) -> Result<Option<SurrogateId>> {
        self.check_cancelled()?;
        self.ctx.set_feature(feature.id());
        let result = self.registry.import(feature, &mut self.ctx);
        self.ctx.set_feature(None);

        match result {
            Ok(id) => {
                self.features += usize::from(id.is_some());
                Ok(id)
            }
            Err(err) => Err(match feature.id() {
                Some(gmlid) => err.in_feature(gmlid),
                None => err,
            }),
        }
    }

    /// Import a model-level appearance. Skipped when appearances are off.
    pub fn import_appearance(&mut self, appearance: &Appearance) -> Result<Option<SurrogateId>> {
        if !self.ctx.config.import_appearance {
            return Ok(None);
        }
        self.check_cancelled()?;
        import_appearance(&mut self.ctx, appearance, None).map(Some)
    }

    /// Store a free-standing geometry tree.
    pub fn decompose(&mut self, node: &GeometryNode, owner: Option<SurrogateId>) -> Result<Option<SurrogateId>> {
        self.ctx.decompose(node, owner)
    }

    /// Import a whole model and finish. On error nothing pending is
    /// written and the resolver's output is discarded.
    pub fn import_model(mut self, model: &CityModel) -> Result<ImportSummary> {
        match self.import_all(model) {
            Ok(()) => self.finish(),
            Err(err) => {
                tracing::error!(error = %err, "import aborted");
                self.abort();
                Err(err)
            }
        }
    }

    fn import_all(&mut self, model: &CityModel) -> Result<()> {
        for feature in &model.features {
            self.import_feature(feature)?;
        }
        for appearance in &model.appearances {
            self.import_appearance(appearance)?;
        }
        Ok(())
    }

    /// Flush all buffers, close the resolver queue and commit the
    /// resolver's output.
    pub fn finish(mut self) -> Result<ImportSummary> {
        let flushed = self.ctx.writer.flush_all();
        self.ctx.xlinks.close();
        let mut pool = self.pool.take().ok_or(ImportError::ResolverDisconnected)?;
        if let Err(err) = flushed {
            pool.abort();
            return Err(err);
        }

        let resolver = match pool.drain() {
            Ok(summary) => summary,
            Err(err) => {
                pool.abort();
                return Err(err);
            }
        };

        let summary = ImportSummary {
            features: self.features,
            rows_written: self.ctx.writer.rows_written() + resolver.rows_written,
            resolver,
            diagnostics: self.ctx.report.entries(),
        };
        tracing::info!(
            features = summary.features,
            rows = summary.rows_written,
            patches = summary.resolver.patches_written,
            diagnostics = summary.diagnostics.len(),
            "import finished"
        );
        Ok(summary)
    }

    /// Discard pending rows and stop the resolver without committing.
    pub fn abort(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let dropped = self.ctx.writer.discard_all();
        self.ctx.xlinks.close();
        if let Some(mut pool) = self.pool.take() {
            pool.abort();
            tracing::debug!(dropped, "importer shut down");
        }
    }
}

impl Drop for Importer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
