// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Importer kinds and their declared write dependencies.
//!
//! Every table the importer writes to has one [`ImporterKind`]. A kind
//! depends on another when its rows hold a surrogate-id foreign key into
//! that kind's table, so the dependency's batch must be committed first.
//! The declarations form a DAG; see [`crate::scheduler`] for the order
//! derived from them.

use serde::Serialize;

/// A record-producing component of the import pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ImporterKind {
    SurfaceGeometry,
    ImplicitGeometry,
    CityObject,
    ExternalReference,
    GenericAttribute,
    Address,
    Building,
    Room,
    ThematicSurface,
    Opening,
    OpeningToThematicSurface,
    AddressToBuilding,
    Appearance,
    SurfaceData,
    AppearanceToSurfaceData,
    TextureParam,
    ReliefFeature,
    ReliefComponent,
    ReliefFeatureToComponent,
    SolitaryVegetation,
}

impl ImporterKind {
    /// Number of kinds.
    pub const COUNT: usize = 20;

    /// All kinds in declaration order (the scheduler's tie-break order).
    pub const ALL: [ImporterKind; Self::COUNT] = [
        ImporterKind::SurfaceGeometry,
        ImporterKind::ImplicitGeometry,
        ImporterKind::CityObject,
        ImporterKind::ExternalReference,
        ImporterKind::GenericAttribute,
        ImporterKind::Address,
        ImporterKind::Building,
        ImporterKind::Room,
        ImporterKind::ThematicSurface,
        ImporterKind::Opening,
        ImporterKind::OpeningToThematicSurface,
        ImporterKind::AddressToBuilding,
        ImporterKind::Appearance,
        ImporterKind::SurfaceData,
        ImporterKind::AppearanceToSurfaceData,
        ImporterKind::TextureParam,
        ImporterKind::ReliefFeature,
        ImporterKind::ReliefComponent,
        ImporterKind::ReliefFeatureToComponent,
        ImporterKind::SolitaryVegetation,
    ];

    /// Position in [`ImporterKind::ALL`], usable as an array index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Kinds whose rows must be committed before rows of this kind.
    pub fn dependencies(self) -> &'static [ImporterKind] {
        use ImporterKind::*;
        match self {
            SurfaceGeometry => &[CityObject],
            ImplicitGeometry => &[SurfaceGeometry],
            CityObject => &[],
            ExternalReference => &[CityObject],
            GenericAttribute => &[CityObject, SurfaceGeometry],
            Address => &[],
            Building => &[CityObject, SurfaceGeometry],
            Room => &[CityObject, Building, SurfaceGeometry],
            ThematicSurface => &[CityObject, Building, Room, SurfaceGeometry],
            Opening => &[CityObject, Address, SurfaceGeometry, ImplicitGeometry],
            OpeningToThematicSurface => &[Opening, ThematicSurface],
            AddressToBuilding => &[Address, Building],
            Appearance => &[CityObject],
            SurfaceData => &[],
            AppearanceToSurfaceData => &[Appearance, SurfaceData],
            TextureParam => &[SurfaceGeometry, SurfaceData],
            ReliefFeature => &[CityObject],
            ReliefComponent => &[CityObject, SurfaceGeometry],
            ReliefFeatureToComponent => &[ReliefFeature, ReliefComponent],
            SolitaryVegetation => &[CityObject, SurfaceGeometry, ImplicitGeometry],
        }
    }

    /// Name of the storage table written by this kind.
    pub fn table(self) -> &'static str {
        match self {
            ImporterKind::SurfaceGeometry => "surface_geometry",
            ImporterKind::ImplicitGeometry => "implicit_geometry",
            ImporterKind::CityObject => "cityobject",
            ImporterKind::ExternalReference => "external_reference",
            ImporterKind::GenericAttribute => "cityobject_genericattrib",
            ImporterKind::Address => "address",
            ImporterKind::Building => "building",
            ImporterKind::Room => "room",
            ImporterKind::ThematicSurface => "thematic_surface",
            ImporterKind::Opening => "opening",
            ImporterKind::OpeningToThematicSurface => "opening_to_them_surface",
            ImporterKind::AddressToBuilding => "address_to_building",
            ImporterKind::Appearance => "appearance",
            ImporterKind::SurfaceData => "surface_data",
            ImporterKind::AppearanceToSurfaceData => "appear_to_surface_data",
            ImporterKind::TextureParam => "textureparam",
            ImporterKind::ReliefFeature => "relief_feature",
            ImporterKind::ReliefComponent => "relief_component",
            ImporterKind::ReliefFeatureToComponent => "relief_feat_to_rel_comp",
            ImporterKind::SolitaryVegetation => "solitary_vegetat_object",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImporterKind::SurfaceGeometry => "SurfaceGeometry",
            ImporterKind::ImplicitGeometry => "ImplicitGeometry",
            ImporterKind::CityObject => "CityObject",
            ImporterKind::ExternalReference => "ExternalReference",
            ImporterKind::GenericAttribute => "GenericAttribute",
            ImporterKind::Address => "Address",
            ImporterKind::Building => "Building",
            ImporterKind::Room => "Room",
            ImporterKind::ThematicSurface => "ThematicSurface",
            ImporterKind::Opening => "Opening",
            ImporterKind::OpeningToThematicSurface => "OpeningToThematicSurface",
            ImporterKind::AddressToBuilding => "AddressToBuilding",
            ImporterKind::Appearance => "Appearance",
            ImporterKind::SurfaceData => "SurfaceData",
            ImporterKind::AppearanceToSurfaceData => "AppearanceToSurfaceData",
            ImporterKind::TextureParam => "TextureParam",
            ImporterKind::ReliefFeature => "ReliefFeature",
            ImporterKind::ReliefComponent => "ReliefComponent",
            ImporterKind::ReliefFeatureToComponent => "ReliefFeatureToComponent",
            ImporterKind::SolitaryVegetation => "SolitaryVegetation",
        }
    }
}

impl std::fmt::Display for ImporterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_declaration_order() {
        for (i, kind) in ImporterKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn no_kind_depends_on_itself() {
        for kind in ImporterKind::ALL {
            assert!(!kind.dependencies().contains(&kind), "{kind}");
        }
    }

    #[test]
    fn table_names_are_unique() {
        let mut tables: Vec<_> = ImporterKind::ALL.iter().map(|k| k.table()).collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), ImporterKind::COUNT);
    }
}
