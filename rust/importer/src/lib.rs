// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityDB-Lite Importer
//!
//! Stores a parsed CityGML model as relational rows.
//!
//! ## Overview
//!
//! - **Dependency scheduling**: every row-producing component has an
//!   [`ImporterKind`]. The [`DependencyScheduler`] orders kinds so that
//!   referenced rows are always written before the rows referencing them.
//! - **Batching**: rows are buffered per kind by the [`BatchWriter`]. A
//!   full buffer flushes itself together with everything it depends on.
//! - **Geometry**: [`GeometryDecomposer`] flattens geometry trees into
//!   surface geometry records sharing a root id.
//! - **References**: `xlink:href`s that cannot be written immediately
//!   become [`DeferredReferenceTask`]s for the [`XlinkPool`], which
//!   resolves them concurrently against the [`IdentityIndex`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use citydb_lite_importer::{Importer, ImporterConfig, MemorySink};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let importer = Importer::new(ImporterConfig::default(), sink.clone())?;
//! let summary = importer.import_model(&model)?;
//! println!("{} rows, {} diagnostics", summary.rows_written, summary.diagnostics.len());
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod context;
pub mod decomposer;
pub mod error;
pub mod identity;
pub mod ids;
pub mod importers;
pub mod kind;
pub mod pipeline;
pub mod report;
pub mod rows;
pub mod scheduler;
pub mod sink;
pub mod xlink;

pub use batch::{BatchBuffer, BatchWriter};
pub use codec::{CodecError, GeometryCodec, PolygonCodec, SpatialGeometry};
pub use config::ImporterConfig;
pub use context::ImportContext;
pub use decomposer::{GeometryDecomposer, RootReference};
pub use error::{ImportError, Result};
pub use identity::{IdentityConflict, IdentityEntry, IdentityIndex, RingIndex, RingSlot};
pub use ids::{AtomicSequenceAllocator, Sequence, SequenceAllocator, SurrogateId};
pub use importers::{FeatureImporter, ImporterRegistry};
pub use kind::ImporterKind;
pub use pipeline::{ImportSummary, Importer};
pub use report::{Diagnostic, DiagnosticKind, ImportReport};
pub use rows::{Column, Patch, Row, SurfaceGeometryRecord};
pub use scheduler::DependencyScheduler;
pub use sink::{MemorySink, StorageSink, WriteError};
pub use xlink::{DeferredReferenceTask, ResolverSummary, XlinkPool, XlinkSender};
