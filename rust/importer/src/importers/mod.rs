// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Feature importers
//!
//! One importer per top-level feature type, selected by type name through
//! the [`ImporterRegistry`]. Each importer writes its feature's rows and
//! those of everything nested inside it.

mod appearance;
mod building;
mod city_object;
mod implicit;
mod relief;
mod vegetation;

pub use building::BuildingImporter;
pub use relief::ReliefImporter;
pub use vegetation::VegetationImporter;

pub(crate) use appearance::import_appearance;

use crate::context::ImportContext;
use crate::error::Result;
use crate::ids::SurrogateId;
use crate::report::DiagnosticKind;
use citydb_lite_core::CityObject;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Stores one kind of top-level feature.
pub trait FeatureImporter: Send + Sync {
    /// Import `feature` and return the id of its city object row.
    fn import(&self, feature: &CityObject, ctx: &mut ImportContext) -> Result<Option<SurrogateId>>;

    /// Feature type names this importer handles.
    fn supported_types(&self) -> &'static [&'static str];
}

/// Dispatches features to importers by type name.
pub struct ImporterRegistry {
    importers: FxHashMap<&'static str, Arc<dyn FeatureImporter>>,
}

impl ImporterRegistry {
    /// Registry with the built-in importers.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(BuildingImporter));
        registry.register(Box::new(ReliefImporter));
        registry.register(Box::new(VegetationImporter));
        registry
    }

    pub fn empty() -> Self {
        Self {
            importers: FxHashMap::default(),
        }
    }

    /// Register an importer for each of its supported types, replacing
    /// any previous one.
    pub fn register(&mut self, importer: Box<dyn FeatureImporter>) {
        let importer: Arc<dyn FeatureImporter> = Arc::from(importer);
        for type_name in importer.supported_types() {
            self.importers.insert(*type_name, Arc::clone(&importer));
        }
    }

    pub fn supports(&self, type_name: &str) -> bool {
        self.importers.contains_key(type_name)
    }

    /// Import a feature. Types without an importer are reported and
    /// skipped.
    pub fn import(&self, feature: &CityObject, ctx: &mut ImportContext) -> Result<Option<SurrogateId>> {
        match self.importers.get(feature.type_name()) {
            Some(importer) => importer.import(feature, ctx),
            None => {
                ctx.warn(
                    DiagnosticKind::UnsupportedFeature,
                    None,
                    format!("no importer registered for {}", feature.type_name()),
                );
                Ok(None)
            }
        }
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
