// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch thresholds and write ordering as seen by a storage sink.

mod common;

use citydb_lite_core::{
    Address, AddressProperty, Appearance, BoundarySurface, CityObjectHeader, GeometryProperty,
    Opening, OpeningProperty, OpeningType, SurfaceData, SurfaceDataProperty, ThematicSurfaceType,
    X3DMaterial,
};
use citydb_lite_importer::{
    ImportError, Importer, ImporterConfig, ImporterKind, Patch, Row, StorageSink, SurrogateId,
    WriteError,
};
use common::{building, config, cube, feature, importer, multi_surface, polygon, square};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn with_batch_size(batch_size: usize) -> ImporterConfig {
    ImporterConfig {
        batch_size,
        ..config()
    }
}

#[test]
fn threshold_flushes_exactly_once() {
    let (mut importer, sink) = importer(with_batch_size(3));
    for i in 0..2 {
        importer.import_feature(&feature(building(&format!("b{i}")))).unwrap();
    }
    assert!(sink.write_log().is_empty());

    importer.import_feature(&feature(building("b2"))).unwrap();
    assert_eq!(
        sink.write_log(),
        vec![(ImporterKind::CityObject, 3), (ImporterKind::Building, 3)]
    );

    importer.import_feature(&feature(building("b3"))).unwrap();
    assert_eq!(sink.write_log().len(), 2);

    let summary = importer.finish().unwrap();
    assert_eq!(summary.rows_written, 8);
    assert_eq!(sink.count(ImporterKind::Building), 4);
}

#[test]
fn geometry_is_written_before_the_rows_pointing_at_it() {
    let (mut importer, sink) = importer(with_batch_size(2));
    let mut b = building("solid-owner");
    b.lod2_solid = Some(cube("c").into());
    importer.import_feature(&feature(b)).unwrap();
    importer.import_feature(&feature(building("second"))).unwrap();

    let log = sink.write_log();
    let first_geometry = log
        .iter()
        .position(|(kind, _)| *kind == ImporterKind::SurfaceGeometry)
        .unwrap();
    let first_building = log
        .iter()
        .position(|(kind, _)| *kind == ImporterKind::Building)
        .unwrap();
    assert!(first_geometry < first_building);
    importer.finish().unwrap();
    assert_eq!(sink.count(ImporterKind::SurfaceGeometry), 8);
}

/// Rejects any row or patch whose foreign keys name rows not yet written.
#[derive(Default)]
struct StrictSink {
    written: Mutex<HashSet<(ImporterKind, SurrogateId)>>,
}

fn references(row: &Row) -> Vec<(ImporterKind, SurrogateId)> {
    use ImporterKind as K;
    let opt = |kind: K, id: Option<SurrogateId>| id.map(|id| (kind, id));
    let refs = match row {
        Row::SurfaceGeometry(r) => vec![
            opt(K::SurfaceGeometry, r.parent_id),
            opt(K::CityObject, r.city_object_id),
            (r.root_id != r.id).then_some((K::SurfaceGeometry, r.root_id)),
        ],
        Row::ImplicitGeometry(r) => vec![opt(K::SurfaceGeometry, r.relative_geometry_id)],
        Row::ExternalReference(r) => vec![Some((K::CityObject, r.city_object_id))],
        Row::GenericAttribute(r) => vec![
            Some((K::CityObject, r.city_object_id)),
            opt(K::SurfaceGeometry, r.geometry_id),
        ],
        Row::Building(r) => vec![
            Some((K::CityObject, r.id)),
            opt(K::Building, r.parent_id),
            opt(K::SurfaceGeometry, r.lod2_solid_id),
            opt(K::SurfaceGeometry, r.lod2_multi_surface_id),
        ],
        Row::Room(r) => vec![Some((K::CityObject, r.id)), Some((K::Building, r.building_id))],
        Row::ThematicSurface(r) => vec![
            Some((K::CityObject, r.id)),
            opt(K::Building, r.building_id),
            opt(K::Room, r.room_id),
            opt(K::SurfaceGeometry, r.lod2_multi_surface_id),
        ],
        Row::Opening(r) => vec![
            Some((K::CityObject, r.id)),
            opt(K::Address, r.address_id),
            opt(K::SurfaceGeometry, r.lod3_multi_surface_id),
        ],
        Row::OpeningToThematicSurface(r) => vec![
            Some((K::Opening, r.opening_id)),
            Some((K::ThematicSurface, r.thematic_surface_id)),
        ],
        Row::AddressToBuilding(r) => vec![
            Some((K::Address, r.address_id)),
            Some((K::Building, r.building_id)),
        ],
        Row::Appearance(r) => vec![opt(K::CityObject, r.city_object_id)],
        Row::AppearanceToSurfaceData(r) => vec![
            Some((K::Appearance, r.appearance_id)),
            Some((K::SurfaceData, r.surface_data_id)),
        ],
        Row::TextureParam(r) => vec![
            Some((K::SurfaceGeometry, r.surface_geometry_id)),
            Some((K::SurfaceData, r.surface_data_id)),
        ],
        _ => Vec::new(),
    };
    refs.into_iter().flatten().collect()
}

impl StorageSink for StrictSink {
    fn write(&self, kind: ImporterKind, rows: Vec<Row>) -> Result<(), WriteError> {
        let mut written = self.written.lock().unwrap();
        for row in rows {
            for target in references(&row) {
                if !written.contains(&target) {
                    return Err(WriteError::Rejected(format!(
                        "{kind} row references unwritten {} {}",
                        target.0, target.1
                    )));
                }
            }
            if let Some(id) = row.id() {
                written.insert((kind, id));
            }
        }
        Ok(())
    }

    fn patch(&self, kind: ImporterKind, patches: Vec<Patch>) -> Result<(), WriteError> {
        let written = self.written.lock().unwrap();
        match patches.iter().find(|p| !written.contains(&(kind, p.id))) {
            Some(p) => Err(WriteError::Rejected(format!("patch of unwritten {kind} {}", p.id))),
            None => Ok(()),
        }
    }
}

fn rich_building(id: &str) -> citydb_lite_core::Building {
    let door = Opening {
        header: CityObjectHeader::with_id(format!("{id}-door")),
        opening_type: OpeningType::Door,
        lod3_multi_surface: Some(
            multi_surface(&format!("{id}-door-ms"), vec![polygon(&format!("{id}-door-p"), square(0.5)).into()])
                .into(),
        ),
        lod4_multi_surface: None,
        lod3_implicit: None,
        addresses: vec![AddressProperty::Inline(Address {
            id: Some(format!("{id}-door-addr")),
            house_number: Some("1a".into()),
            ..Default::default()
        })],
    };
    let wall = BoundarySurface {
        header: CityObjectHeader::with_id(format!("{id}-wall")),
        surface_type: ThematicSurfaceType::WallSurface,
        lod2_multi_surface: Some(GeometryProperty::href(format!("#{id}-face-2"))),
        lod3_multi_surface: None,
        lod4_multi_surface: None,
        openings: vec![OpeningProperty::Inline(door)],
    };

    let mut b = building(id);
    b.lod2_solid = Some(cube(id).into());
    b.boundary_surfaces.push(wall);
    b.addresses.push(AddressProperty::Inline(Address {
        id: Some(format!("{id}-addr")),
        street: Some("Main Street".into()),
        ..Default::default()
    }));
    b.header.appearances.push(Appearance {
        id: None,
        theme: Some("rgb".into()),
        surface_data: vec![SurfaceDataProperty::Inline(SurfaceData::X3DMaterial(X3DMaterial {
            targets: vec![format!("#{id}-face-0"), format!("#{id}-face-1")],
            ..Default::default()
        }))],
    });
    b
}

#[test]
fn foreign_keys_never_point_at_unwritten_rows() {
    for batch_size in [1, 2, 7] {
        let sink = Arc::new(StrictSink::default());
        let mut importer = Importer::new(with_batch_size(batch_size), sink.clone()).unwrap();
        for i in 0..3 {
            importer
                .import_feature(&feature(rich_building(&format!("house{i}"))))
                .unwrap();
        }
        let summary = importer.finish().unwrap_or_else(|err| panic!("batch size {batch_size}: {err}"));
        assert_eq!(summary.features, 3);
        assert_eq!(summary.resolver.unresolved, 0);
        assert_eq!(summary.resolver.resolved, 3 * 3);
    }
}

#[test]
fn rejected_write_aborts_the_import() {
    struct Refusing;

    impl StorageSink for Refusing {
        fn write(&self, kind: ImporterKind, _: Vec<Row>) -> Result<(), WriteError> {
            Err(WriteError::Rejected(format!("{kind} is read-only")))
        }

        fn patch(&self, _: ImporterKind, _: Vec<Patch>) -> Result<(), WriteError> {
            Ok(())
        }
    }

    let mut importer = Importer::new(with_batch_size(1), Arc::new(Refusing)).unwrap();
    let err = importer.import_feature(&feature(building("b"))).unwrap_err();
    assert!(err.is_write_failure());
    assert!(matches!(
        err,
        ImportError::Feature { ref feature, .. } if feature == "b"
    ));
    importer.abort();
}
