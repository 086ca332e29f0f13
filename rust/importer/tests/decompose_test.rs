// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry tree decomposition through the public importer API.

mod common;

use citydb_lite_core::{
    Aggregate, GeometryNode, GeometryProperty, OrientableSurface, Orientation, Point, Polygon,
    Solid,
};
use citydb_lite_importer::{Diagnostic, DiagnosticKind, SurfaceGeometryRecord, SurrogateId};
use common::{config, cube, degenerate, importer, multi_surface, polygon, square};
use std::collections::HashMap;

fn count(diagnostics: &[Diagnostic], kind: DiagnosticKind) -> usize {
    diagnostics.iter().filter(|d| d.kind == kind).count()
}

fn rings(record: &SurfaceGeometryRecord) -> Vec<Vec<Point>> {
    record.payload.as_ref().expect("payload").rings.clone()
}

#[test]
fn cube_becomes_solid_shell_and_six_faces() {
    let (mut importer, sink) = importer(config());
    let identities = importer.identities().clone();
    let root = importer.decompose(&cube("a"), None).unwrap().expect("stored");
    let summary = importer.finish().unwrap();
    assert!(summary.diagnostics.is_empty());

    let records = sink.surface_geometries();
    assert_eq!(records.len(), 8);
    assert!(records.iter().all(|r| r.root_id == root));

    let solid = sink.surface_geometry(root).unwrap();
    assert!(solid.is_solid);
    assert!(!solid.is_composite);
    assert_eq!(solid.parent_id, None);
    assert!(solid.payload.is_none());
    assert_eq!(solid.external_id.as_deref(), Some("a-solid"));

    let shell: Vec<_> = records.iter().filter(|r| r.parent_id == Some(root)).collect();
    assert_eq!(shell.len(), 1);
    assert!(shell[0].is_composite);
    assert!(!shell[0].is_solid);
    assert!(shell[0].payload.is_none());

    let faces: Vec<_> = records
        .iter()
        .filter(|r| r.parent_id == Some(shell[0].id))
        .collect();
    assert_eq!(faces.len(), 6);
    for face in faces {
        assert!(!face.is_solid && !face.is_composite && !face.is_triangulated);
        assert!(!face.is_reverse);
        assert_eq!(rings(face).len(), 1);
        assert_eq!(rings(face)[0].len(), 5);
    }

    let face = identities.get("a-face-3").unwrap();
    assert_eq!(face.root_id, Some(root));
    assert_eq!(face.ring_count, Some(1));
    assert_eq!(identities.get("a-shell").unwrap().internal_id, Some(shell[0].id));
}

#[test]
fn parent_chains_end_at_the_root() {
    let (mut importer, sink) = importer(config());
    let nested = GeometryNode::CompositeSurface(
        Aggregate::new([
            polygon("p1", square(0.0)),
            polygon("p2", square(1.0)),
        ])
        .with_id("cs"),
    );
    let wrapped_composite = GeometryNode::OrientableSurface(OrientableSurface::new(
        Orientation::Negative,
        GeometryNode::CompositeSurface(Aggregate::new([polygon("p3", square(2.0))]).with_id("cs2")),
    ));
    let tree = multi_surface(
        "ms",
        vec![
            GeometryProperty::inline(nested),
            GeometryProperty::inline(wrapped_composite),
            GeometryProperty::inline(GeometryNode::OrientableSurface(OrientableSurface::new(
                Orientation::Negative,
                polygon("p4", square(3.0)),
            ))),
        ],
    );
    let root = importer.decompose(&tree, None).unwrap().unwrap();
    importer.finish().unwrap();

    let records: HashMap<SurrogateId, SurfaceGeometryRecord> = sink
        .surface_geometries()
        .into_iter()
        .map(|r| (r.id, r))
        .collect();
    // ms, cs, p1, p2, cs2, p3, p4; wrappers take no record of their own
    assert_eq!(records.len(), 7);

    for record in records.values() {
        assert_eq!(record.root_id, root);
        let mut current = record;
        let mut steps = 0;
        while let Some(parent) = current.parent_id {
            current = &records[&parent];
            steps += 1;
            assert!(steps < records.len(), "parent cycle");
        }
        assert_eq!(current.id, root);
    }

    let by_name = |name: &str| {
        records
            .values()
            .find(|r| r.external_id.as_deref() == Some(name))
            .unwrap()
            .clone()
    };
    assert!(by_name("cs2").is_reverse);
    assert_eq!(by_name("cs2").parent_id, Some(root));
    assert!(by_name("p3").is_reverse);
    assert!(by_name("p4").is_reverse);
    assert!(!by_name("p1").is_reverse);
}

#[test]
fn negative_orientations_cancel_pairwise() {
    let (mut importer, sink) = importer(config());
    let wrap = |orientation, node: GeometryNode| {
        GeometryNode::OrientableSurface(OrientableSurface::new(orientation, node))
    };
    let base = || GeometryNode::Polygon(Polygon::new(square(0.0)));

    let plain = importer.decompose(&base(), None).unwrap().unwrap();
    let cancelled = importer
        .decompose(
            &wrap(Orientation::Negative, wrap(Orientation::Negative, base())),
            None,
        )
        .unwrap()
        .unwrap();
    let flipped = importer
        .decompose(
            &wrap(Orientation::Negative, wrap(Orientation::Positive, base())),
            None,
        )
        .unwrap()
        .unwrap();
    importer.finish().unwrap();

    let plain = sink.surface_geometry(plain).unwrap();
    let cancelled = sink.surface_geometry(cancelled).unwrap();
    let flipped = sink.surface_geometry(flipped).unwrap();

    assert!(!cancelled.is_reverse);
    assert_eq!(rings(&cancelled), rings(&plain));

    assert!(flipped.is_reverse);
    let mut expected = rings(&plain);
    expected[0].reverse();
    assert_eq!(rings(&flipped), expected);
}

#[test]
fn wrapper_id_is_an_alias_of_its_base() {
    let (mut importer, sink) = importer(config());
    let identities = importer.identities().clone();
    let wrapper = OrientableSurface::new(Orientation::Negative, polygon("p-alias", square(0.0)))
        .with_id("os-alias");
    let tree = multi_surface(
        "ms-alias",
        vec![GeometryProperty::inline(GeometryNode::OrientableSurface(wrapper))],
    );
    let root = importer.decompose(&tree, None).unwrap().unwrap();
    importer.finish().unwrap();

    let base = identities.get("p-alias").unwrap();
    let alias = identities.get("os-alias").unwrap();
    assert_eq!(alias.internal_id, base.internal_id);
    assert_eq!(alias.root_id, Some(root));
    assert!(alias.reverse);
    assert_eq!(alias.mapped_to.as_deref(), Some("p-alias"));
    assert_eq!(sink.surface_geometries().len(), 2);
}

#[test]
fn malformed_polygon_is_skipped_with_a_warning() {
    let (mut importer, sink) = importer(config());
    let tree = multi_surface(
        "ms",
        vec![
            polygon("bad", degenerate()).into(),
            polygon("good", square(0.0)).into(),
        ],
    );
    let root = importer.decompose(&tree, None).unwrap();
    let summary = importer.finish().unwrap();

    assert!(root.is_some());
    assert_eq!(sink.surface_geometries().len(), 2);
    assert_eq!(count(&summary.diagnostics, DiagnosticKind::MalformedGeometry), 1);
    assert!(sink
        .surface_geometries()
        .iter()
        .all(|r| r.external_id.as_deref() != Some("bad")));
}

#[test]
fn aggregate_without_storable_members_is_dropped() {
    let (mut importer, sink) = importer(config());
    let identities = importer.identities().clone();
    let tree = multi_surface("empty", vec![polygon("bad", degenerate()).into()]);
    assert_eq!(importer.decompose(&tree, None).unwrap(), None);
    let summary = importer.finish().unwrap();

    assert_eq!(sink.surface_geometries().len(), 0);
    assert_eq!(count(&summary.diagnostics, DiagnosticKind::MalformedGeometry), 2);
    assert!(identities.get("empty").is_none());
}

#[test]
fn bad_interior_ring_drops_only_that_ring() {
    let (mut importer, sink) = importer(config());
    let identities = importer.identities().clone();
    let hole = common::ring(&[[0.2, 0.2, 0.0], [0.4, 0.2, 0.0], [0.4, 0.4, 0.0]]);
    let node = GeometryNode::Polygon(
        polygon("holey", square(0.0))
            .with_interior(degenerate())
            .with_interior(hole),
    );
    let root = importer.decompose(&node, None).unwrap().unwrap();
    let summary = importer.finish().unwrap();

    let record = sink.surface_geometry(root).unwrap();
    assert_eq!(rings(&record).len(), 2);
    assert_eq!(identities.get("holey").unwrap().ring_count, Some(2));
    assert_eq!(count(&summary.diagnostics, DiagnosticKind::MalformedGeometry), 1);
}

#[test]
fn solid_interior_shells_and_unknown_nodes_are_reported() {
    let (mut importer, sink) = importer(config());
    let mut solid = match cube("s") {
        GeometryNode::Solid(solid) => solid,
        _ => unreachable!(),
    };
    solid
        .interiors
        .push(GeometryNode::CompositeSurface(Aggregate::new([polygon("i", square(0.5))])).into());
    let stored = importer.decompose(&GeometryNode::Solid(solid), None).unwrap();

    let with_curve = multi_surface(
        "mixed",
        vec![
            GeometryNode::Unsupported {
                id: None,
                type_name: "Curve".into(),
            }
            .into(),
            polygon("flat", square(0.0)).into(),
        ],
    );
    let mixed = importer.decompose(&with_curve, None).unwrap();

    let bad_shell = GeometryNode::Solid(Solid::new(multi_surface(
        "not-a-shell",
        vec![polygon("x", square(0.0)).into()],
    )));
    let dropped = importer.decompose(&bad_shell, None).unwrap();
    let summary = importer.finish().unwrap();

    assert!(stored.is_some());
    assert!(mixed.is_some());
    assert_eq!(dropped, None);
    // interior shell, curve, non-composite shell
    assert_eq!(count(&summary.diagnostics, DiagnosticKind::UnsupportedGeometry), 3);
    assert_eq!(sink.surface_geometries().len(), 8 + 2);
}
