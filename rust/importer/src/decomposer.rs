// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry decomposition
//!
//! Flattens a GML geometry tree into surface geometry records that share
//! one root id. Every node gets its own record; polygons carry the encoded
//! payload, aggregates carry the solid/composite/triangulated flags.
//!
//! Orientation wrappers (`OrientableSurface`, `TexturedSurface`) are not
//! stored. They flip the orientation of their subtree, and their id is
//! registered as an alias of the base. Two negative wrappers cancel out.
//!
//! Members given by href become placeholder records filled in by the
//! reference resolver once the target is known. A tree that is only a
//! wrapped href has no record of its own: see [`RootReference`].
//!
//! Malformed parts are skipped with a diagnostic: an unusable interior
//! ring is dropped, an unusable exterior ring drops the polygon, and an
//! aggregate left without members is dropped as well.

use crate::context::ImportContext;
use crate::error::Result;
use crate::identity::{IdentityEntry, RingSlot};
use crate::ids::{Sequence, SurrogateId};
use crate::kind::ImporterKind;
use crate::report::DiagnosticKind;
use crate::rows::{Row, SurfaceGeometryRecord};
use crate::xlink::{DeferredReferenceTask, GeometryMemberLink};
use citydb_lite_core::{
    Aggregate, GeometryNode, GeometryProperty, OrientableSurface, Point, Ring, Solid,
};

/// Position of the node being visited.
#[derive(Debug, Clone)]
struct Frame {
    id: SurrogateId,
    parent: Option<SurrogateId>,
    root: SurrogateId,
    reverse: bool,
    path: String,
}

impl Frame {
    fn root(id: SurrogateId, type_name: &str) -> Self {
        Self {
            id,
            parent: None,
            root: id,
            reverse: false,
            path: type_name.to_string(),
        }
    }

    fn child(&self, id: SurrogateId, segment: impl AsRef<str>) -> Self {
        Self {
            id,
            parent: Some(self.id),
            root: self.root,
            reverse: self.reverse,
            path: format!("{}/{}", self.path, segment.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AggregateFlags {
    solid: bool,
    composite: bool,
    triangulated: bool,
}

impl AggregateFlags {
    const NONE: Self = Self {
        solid: false,
        composite: false,
        triangulated: false,
    };
    const COMPOSITE: Self = Self {
        solid: false,
        composite: true,
        triangulated: false,
    };
    const TRIANGULATED: Self = Self {
        solid: false,
        composite: false,
        triangulated: true,
    };
    const COMPOSITE_SOLID: Self = Self {
        solid: true,
        composite: true,
        triangulated: false,
    };
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    records: usize,
    entries: usize,
    rings: usize,
    tasks: usize,
}

/// A geometry property that is nothing but a reference once its
/// orientation wrappers are peeled off.
#[derive(Debug, Clone, PartialEq)]
pub struct RootReference<'a> {
    pub href: &'a str,
    /// Combined orientation of the wrappers.
    pub reverse: bool,
    /// Identifiers of the wrappers, outermost first.
    pub aliases: Vec<&'a str>,
}

impl<'a> RootReference<'a> {
    /// `None` unless `node` is a chain of orientation wrappers ending in
    /// an href.
    pub fn of(node: &'a GeometryNode) -> Option<Self> {
        let mut node = node;
        let mut reverse = false;
        let mut aliases = Vec::new();
        loop {
            let (GeometryNode::OrientableSurface(wrapper) | GeometryNode::TexturedSurface(wrapper)) = node
            else {
                return None;
            };
            reverse ^= wrapper.orientation.is_negative();
            aliases.extend(wrapper.id.as_deref());
            match &wrapper.base {
                GeometryProperty::Href(href) => {
                    return Some(Self {
                        href: href.as_str(),
                        reverse,
                        aliases,
                    })
                }
                GeometryProperty::Inline(base) => node = &**base,
            }
        }
    }
}

/// Collects the output of one geometry tree. Nothing is published until
/// the whole tree has been visited, so a dropped subtree leaves no trace.
pub struct GeometryDecomposer {
    owner: Option<SurrogateId>,
    records: Vec<SurfaceGeometryRecord>,
    entries: Vec<IdentityEntry>,
    rings: Vec<(String, RingSlot)>,
    tasks: Vec<DeferredReferenceTask>,
}

impl GeometryDecomposer {
    /// Store `node` and return its root id, or `None` if nothing in it
    /// could be stored. `owner` is the city object the geometry belongs to
    /// (none for implicit geometry templates).
    pub fn decompose(
        ctx: &mut ImportContext,
        node: &GeometryNode,
        owner: Option<SurrogateId>,
    ) -> Result<Option<SurrogateId>> {
        let root = ctx.next_id(Sequence::SurfaceGeometry)?;
        let frame = Frame::root(root, node.type_name());

        let mut tree = Self {
            owner,
            records: Vec::new(),
            entries: Vec::new(),
            rings: Vec::new(),
            tasks: Vec::new(),
        };
        if !tree.visit(ctx, node, &frame)? {
            return Ok(None);
        }

        tracing::trace!(
            root = %root,
            records = tree.records.len(),
            deferred = tree.tasks.len(),
            "decomposed {}",
            node.type_name()
        );
        tree.commit(ctx)?;
        Ok(Some(root))
    }

    fn mark(&self) -> Mark {
        Mark {
            records: self.records.len(),
            entries: self.entries.len(),
            rings: self.rings.len(),
            tasks: self.tasks.len(),
        }
    }

    fn rollback(&mut self, mark: Mark) {
        self.records.truncate(mark.records);
        self.entries.truncate(mark.entries);
        self.rings.truncate(mark.rings);
        self.tasks.truncate(mark.tasks);
    }

    fn commit(self, ctx: &mut ImportContext) -> Result<()> {
        for entry in self.entries {
            ctx.register(entry);
        }
        for (ring_id, slot) in &self.rings {
            ctx.rings.insert(ring_id, *slot);
        }
        for record in self.records {
            ctx.add_row(Row::SurfaceGeometry(record))?;
        }
        for task in self.tasks {
            ctx.defer(task)?;
        }
        Ok(())
    }

    fn allocate(&self, ctx: &ImportContext, frame: &Frame) -> Result<SurrogateId> {
        ctx.next_id(Sequence::SurfaceGeometry)
            .map_err(|err| err.at_path(&frame.path))
    }

    fn record(&self, ctx: &ImportContext, id: Option<&str>, frame: &Frame) -> SurfaceGeometryRecord {
        SurfaceGeometryRecord {
            id: frame.id,
            external_id: Some(id.map_or_else(|| ctx.generate_id(), str::to_string)),
            parent_id: frame.parent,
            root_id: frame.root,
            is_reverse: frame.reverse,
            city_object_id: self.owner,
            ..Default::default()
        }
    }

    fn identify(&mut self, id: Option<&str>, frame: &Frame) {
        if let Some(id) = id {
            self.entries.push(
                IdentityEntry::resolved(id, frame.id, frame.root, ImporterKind::SurfaceGeometry)
                    .reversed(frame.reverse),
            );
        }
    }

    fn href_member(&mut self, href: &str, record_id: SurrogateId, parent: &Frame, reverse: bool) {
        let link = GeometryMemberLink {
            record_id,
            parent_id: Some(parent.id),
            root_id: parent.root,
            reverse,
            city_object_id: self.owner,
        };
        self.tasks.push(DeferredReferenceTask::geometry_member(link, href));
    }

    fn visit(&mut self, ctx: &ImportContext, node: &GeometryNode, frame: &Frame) -> Result<bool> {
        match node {
            GeometryNode::LinearRing(ring) => {
                self.store_surface(ctx, ring.id.as_deref(), Some(ring), &[], frame)
            }
            GeometryNode::Polygon(polygon) => self.store_surface(
                ctx,
                polygon.id.as_deref(),
                polygon.exterior.as_ref(),
                &polygon.interiors,
                frame,
            ),
            GeometryNode::OrientableSurface(wrapper) | GeometryNode::TexturedSurface(wrapper) => {
                self.wrapper(ctx, wrapper, frame)
            }
            GeometryNode::CompositeSurface(aggregate) => {
                self.aggregate(ctx, node, aggregate, AggregateFlags::COMPOSITE, frame)
            }
            GeometryNode::TriangulatedSurface(aggregate) | GeometryNode::Tin(aggregate) => {
                self.aggregate(ctx, node, aggregate, AggregateFlags::TRIANGULATED, frame)
            }
            GeometryNode::CompositeSolid(aggregate) => {
                self.aggregate(ctx, node, aggregate, AggregateFlags::COMPOSITE_SOLID, frame)
            }
            GeometryNode::Surface(aggregate)
            | GeometryNode::MultiSurface(aggregate)
            | GeometryNode::MultiSolid(aggregate)
            | GeometryNode::MultiPolygon(aggregate)
            | GeometryNode::GeometricComplex(aggregate) => {
                self.aggregate(ctx, node, aggregate, AggregateFlags::NONE, frame)
            }
            GeometryNode::Solid(solid) => self.solid(ctx, solid, frame),
            GeometryNode::Unsupported { type_name, .. } => {
                ctx.warn(
                    DiagnosticKind::UnsupportedGeometry,
                    Some(&frame.path),
                    format!("{type_name} cannot be stored"),
                );
                Ok(false)
            }
        }
    }

    fn store_surface(
        &mut self,
        ctx: &ImportContext,
        id: Option<&str>,
        exterior: Option<&Ring>,
        interiors: &[Ring],
        frame: &Frame,
    ) -> Result<bool> {
        let Some(exterior) = exterior else {
            ctx.warn(
                DiagnosticKind::MalformedGeometry,
                Some(&frame.path),
                "polygon without exterior ring",
            );
            return Ok(false);
        };
        let points = match exterior.points() {
            Ok(points) => points,
            Err(err) => {
                ctx.warn(
                    DiagnosticKind::MalformedGeometry,
                    Some(&frame.path),
                    format!("exterior ring: {err}"),
                );
                return Ok(false);
            }
        };

        let mut rings = vec![(exterior.id.as_deref(), points)];
        for (i, ring) in interiors.iter().enumerate() {
            match ring.points() {
                Ok(points) => rings.push((ring.id.as_deref(), points)),
                Err(err) => ctx.warn(
                    DiagnosticKind::MalformedGeometry,
                    Some(&frame.path),
                    format!("interior ring {} dropped: {err}", i + 1),
                ),
            }
        }

        let ring_count = rings.len();
        let flat = rings
            .iter()
            .map(|(_, points)| flatten(points, frame.reverse))
            .collect();
        let payload = match ctx.codec.encode(flat, ring_count) {
            Ok(payload) => payload,
            Err(err) => {
                ctx.warn(DiagnosticKind::MalformedGeometry, Some(&frame.path), err.to_string());
                return Ok(false);
            }
        };

        let record = SurfaceGeometryRecord {
            payload: Some(payload),
            ..self.record(ctx, id, frame)
        };
        self.records.push(record);
        if let Some(id) = id {
            self.entries.push(
                IdentityEntry::resolved(id, frame.id, frame.root, ImporterKind::SurfaceGeometry)
                    .reversed(frame.reverse)
                    .with_ring_count(ring_count),
            );
        }
        if ctx.config.import_appearance {
            for (ordinal, (ring_id, _)) in rings.iter().enumerate() {
                let Some(ring_id) = ring_id else { continue };
                self.rings.push((
                    ring_id.to_string(),
                    RingSlot {
                        polygon_id: frame.id,
                        root_id: frame.root,
                        ordinal,
                        ring_count,
                        reverse: frame.reverse,
                    },
                ));
            }
        }
        Ok(true)
    }

    fn wrapper(&mut self, ctx: &ImportContext, wrapper: &OrientableSurface, frame: &Frame) -> Result<bool> {
        let reverse = frame.reverse ^ wrapper.orientation.is_negative();
        let alias = |stored: SurrogateId, target: Option<&str>| {
            wrapper.id.as_deref().map(|id| {
                IdentityEntry::resolved(id, stored, frame.root, ImporterKind::SurfaceGeometry)
                    .reversed(reverse)
                    .mapped_to(target)
            })
        };

        match &wrapper.base {
            GeometryProperty::Href(_) if frame.parent.is_none() => {
                // nothing to store; the owning property patches its column
                // instead, see `root_reference`
                ctx.warn(
                    DiagnosticKind::UnsupportedGeometry,
                    Some(&frame.path),
                    "a reference at the tree root needs an owning geometry property",
                );
                Ok(false)
            }
            GeometryProperty::Href(href) => {
                let link = GeometryMemberLink {
                    record_id: frame.id,
                    parent_id: frame.parent,
                    root_id: frame.root,
                    reverse,
                    city_object_id: self.owner,
                };
                self.tasks.push(DeferredReferenceTask::geometry_member(link, href));
                self.entries.extend(alias(frame.id, Some(href.as_str())));
                Ok(true)
            }
            GeometryProperty::Inline(base) => {
                // a primitive base takes the wrapper's slot; an aggregate
                // base gets its own id unless it becomes the tree root
                let id = if base.is_primitive() || frame.parent.is_none() {
                    frame.id
                } else {
                    self.allocate(ctx, frame)?
                };
                let inner = Frame {
                    id,
                    reverse,
                    path: format!("{}/{}", frame.path, base.type_name()),
                    ..frame.clone()
                };
                if !self.visit(ctx, base, &inner)? {
                    return Ok(false);
                }
                self.entries.extend(alias(id, base.id()));
                Ok(true)
            }
        }
    }

    fn aggregate(
        &mut self,
        ctx: &ImportContext,
        node: &GeometryNode,
        aggregate: &Aggregate,
        flags: AggregateFlags,
        frame: &Frame,
    ) -> Result<bool> {
        let mark = self.mark();
        let mut children = 0usize;

        for (i, member) in aggregate.members.iter().enumerate() {
            let child_id = self.allocate(ctx, frame)?;
            match member {
                GeometryProperty::Href(href) => {
                    self.href_member(href, child_id, frame, frame.reverse);
                    children += 1;
                }
                GeometryProperty::Inline(child) => {
                    let child_frame = frame.child(child_id, format!("{}[{i}]", child.type_name()));
                    if self.visit(ctx, child, &child_frame)? {
                        children += 1;
                    }
                }
            }
        }

        if children == 0 {
            self.rollback(mark);
            ctx.warn(
                DiagnosticKind::MalformedGeometry,
                Some(&frame.path),
                format!("{} has no storable members", node.type_name()),
            );
            return Ok(false);
        }

        let record = SurfaceGeometryRecord {
            is_solid: flags.solid,
            is_composite: flags.composite,
            is_triangulated: flags.triangulated,
            ..self.record(ctx, aggregate.id.as_deref(), frame)
        };
        // parents precede their children
        self.records.insert(mark.records, record);
        self.identify(aggregate.id.as_deref(), frame);
        Ok(true)
    }

    fn solid(&mut self, ctx: &ImportContext, solid: &Solid, frame: &Frame) -> Result<bool> {
        for i in 0..solid.interiors.len() {
            ctx.warn(
                DiagnosticKind::UnsupportedGeometry,
                Some(&frame.path),
                format!("interior shell {} dropped", i + 1),
            );
        }
        let Some(exterior) = &solid.exterior else {
            ctx.warn(
                DiagnosticKind::MalformedGeometry,
                Some(&frame.path),
                "solid without exterior shell",
            );
            return Ok(false);
        };

        let mark = self.mark();
        let shell_id = self.allocate(ctx, frame)?;
        let stored = match exterior {
            GeometryProperty::Href(href) => {
                self.href_member(href, shell_id, frame, frame.reverse);
                true
            }
            GeometryProperty::Inline(shell) => match shell.as_ref() {
                GeometryNode::CompositeSurface(_) => {
                    let shell_frame = frame.child(shell_id, "CompositeSurface");
                    self.visit(ctx, shell, &shell_frame)?
                }
                other => {
                    ctx.warn(
                        DiagnosticKind::UnsupportedGeometry,
                        Some(&frame.path),
                        format!("solid shell must be a CompositeSurface, found {}", other.type_name()),
                    );
                    false
                }
            },
        };
        if !stored {
            self.rollback(mark);
            return Ok(false);
        }

        let record = SurfaceGeometryRecord {
            is_solid: true,
            ..self.record(ctx, solid.id.as_deref(), frame)
        };
        self.records.insert(mark.records, record);
        self.identify(solid.id.as_deref(), frame);
        Ok(true)
    }
}

/// Flat `x y z` list in stored order.
fn flatten(points: &[Point], reverse: bool) -> Vec<f64> {
    let mut flat = Vec::with_capacity(points.len() * 3);
    if reverse {
        points.iter().rev().for_each(|p| flat.extend_from_slice(p));
    } else {
        points.iter().for_each(|p| flat.extend_from_slice(p));
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_reverses_point_order() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        let forward = flatten(&points, false);
        let backward = flatten(&points, true);
        assert_eq!(forward.len(), 12);
        assert_eq!(&forward[3..6], &[1.0, 0.0, 0.0]);
        assert_eq!(&backward[3..6], &[1.0, 1.0, 0.0]);
        assert_eq!(&backward[..3], &backward[9..]);
    }

    #[test]
    fn root_reference_peels_wrappers() {
        use citydb_lite_core::Orientation;

        let inner = OrientableSurface::new(Orientation::Negative, GeometryProperty::href("#roof"))
            .with_id("inner");
        let outer = GeometryNode::TexturedSurface(
            OrientableSurface::new(Orientation::Negative, GeometryNode::OrientableSurface(inner))
                .with_id("outer"),
        );
        let reference = RootReference::of(&outer).unwrap();
        assert_eq!(reference.href, "#roof");
        assert!(!reference.reverse);
        assert_eq!(reference.aliases, vec!["outer", "inner"]);

        let single = GeometryNode::OrientableSurface(OrientableSurface::new(
            Orientation::Negative,
            GeometryProperty::href("#roof"),
        ));
        assert!(RootReference::of(&single).unwrap().reverse);

        let aggregate = GeometryNode::MultiSurface(Aggregate::new([GeometryProperty::href("#roof")]));
        assert!(RootReference::of(&aggregate).is_none());
    }

    #[test]
    fn child_frames_inherit_root_and_orientation() {
        let root = Frame {
            reverse: true,
            ..Frame::root(SurrogateId::new(1), "MultiSurface")
        };
        let child = root.child(SurrogateId::new(2), "Polygon[0]");
        assert_eq!(child.parent, Some(SurrogateId::new(1)));
        assert_eq!(child.root, SurrogateId::new(1));
        assert!(child.reverse);
        assert_eq!(child.path, "MultiSurface/Polygon[0]");
    }
}
