//! Spatial indices used by the broad phase.
//!
//! Both implementations are rebuilt from scratch every tick and only ever
//! over-report: a pair they emit may not overlap, but an overlapping pair is
//! never missed.

use std::collections::HashMap;

use glam::{IVec3, Vec3};

use crate::{
    config::SpatialIndexKind,
    core::aabb::Aabb,
    utils::allocator::EntityId,
};

/// Common contract of the interchangeable broad-phase indices.
pub trait SpatialIndex: Send + Sync {
    fn name(&self) -> &'static str;

    /// Drops all membership while keeping reusable buffers.
    fn clear(&mut self);

    fn insert(&mut self, id: EntityId, aabb: &Aabb);

    /// Appends every id that may touch `aabb`. May contain duplicates.
    fn query(&self, aabb: &Aabb, out: &mut Vec<EntityId>);

    /// Appends every pair of ids sharing a region, smaller id first.
    /// May contain duplicates.
    fn candidate_pairs(&self, out: &mut Vec<(EntityId, EntityId)>);

    fn rebuild(&mut self, entries: &[(EntityId, Aabb)]) {
        self.clear();
        for (id, aabb) in entries {
            self.insert(*id, aabb);
        }
    }
}

/// Builds the index described by `kind`. The kind must already be validated.
pub fn build_index(kind: SpatialIndexKind) -> Box<dyn SpatialIndex> {
    match kind {
        SpatialIndexKind::SpatialHash { cell_size } => Box::new(SpatialHash::new(cell_size)),
        SpatialIndexKind::QuadTree {
            world_size,
            max_depth,
            max_objects,
        } => Box::new(QuadTree::new(world_size, max_depth, max_objects)),
    }
}

fn ordered(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Inclusive range of integer cell coordinates covered by a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min: IVec3,
    pub max: IVec3,
}

impl CellRange {
    pub fn len(&self) -> usize {
        let span = (self.max - self.min + IVec3::ONE).max(IVec3::ZERO);
        span.x as usize * span.y as usize * span.z as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = IVec3> {
        let (min, max) = (self.min, self.max);
        (min.x..=max.x).flat_map(move |x| {
            (min.y..=max.y).flat_map(move |y| (min.z..=max.z).map(move |z| IVec3::new(x, y, z)))
        })
    }
}

/// Uniform grid spatial hash keyed by integer cell coordinates.
pub struct SpatialHash {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<EntityId>>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn world_to_cell(&self, pos: Vec3) -> IVec3 {
        (pos / self.cell_size).floor().as_ivec3()
    }

    /// Cells spanned by `aabb`; pure, does not touch the index.
    pub fn cells_overlapping(&self, aabb: &Aabb) -> CellRange {
        CellRange {
            min: self.world_to_cell(aabb.min()),
            max: self.world_to_cell(aabb.max()),
        }
    }

    /// Ids registered in one cell.
    pub fn cell(&self, key: IVec3) -> &[EntityId] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of cells holding at least one body.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|ids| !ids.is_empty()).count()
    }
}

impl SpatialIndex for SpatialHash {
    fn name(&self) -> &'static str {
        "spatial-hash"
    }

    fn clear(&mut self) {
        // Cells used last tick keep their buffers; stale cells are dropped.
        self.cells.retain(|_, ids| {
            let used = !ids.is_empty();
            ids.clear();
            used
        });
    }

    fn insert(&mut self, id: EntityId, aabb: &Aabb) {
        for key in self.cells_overlapping(aabb).iter() {
            self.cells.entry(key).or_default().push(id);
        }
    }

    fn query(&self, aabb: &Aabb, out: &mut Vec<EntityId>) {
        for key in self.cells_overlapping(aabb).iter() {
            out.extend_from_slice(self.cell(key));
        }
    }

    fn candidate_pairs(&self, out: &mut Vec<(EntityId, EntityId)>) {
        for ids in self.cells.values() {
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    if a != b {
                        out.push(ordered(a, b));
                    }
                }
            }
        }
    }
}

/// Quadrant index within a split node: bit 0 is +X, bit 1 is +Z.
///
/// An AABB belongs to a child only when it lies strictly on one side of both
/// split lines. Touching a line keeps it with the parent, because bounds
/// that merely touch still overlap.
fn quadrant(bounds: &Aabb, aabb: &Aabb) -> Option<usize> {
    let (min, max) = (aabb.min(), aabb.max());
    let mid = bounds.center;

    let x_bit = if max.x < mid.x {
        0
    } else if min.x > mid.x {
        1
    } else {
        return None;
    };
    let z_bit = if max.z < mid.z {
        0
    } else if min.z > mid.z {
        2
    } else {
        return None;
    };
    Some(x_bit | z_bit)
}

#[derive(Debug)]
struct QuadNode {
    bounds: Aabb,
    depth: u32,
    objects: Vec<(EntityId, Aabb)>,
    children: Option<[usize; 4]>,
}

impl QuadNode {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            objects: Vec::new(),
            children: None,
        }
    }
}

/// Quad-tree over the X/Z plane.
///
/// Nodes split once they hold more than `max_objects` entries, down to
/// `max_depth`. An entry lives in the deepest node whose quadrant fully
/// contains it; entries straddling a split line stay with the parent.
/// Vertical extent is inherited from the root, so the tree suits roughly
/// planar layouts.
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    max_depth: u32,
    max_objects: usize,
}

impl QuadTree {
    pub fn new(world_size: f32, max_depth: u32, max_objects: usize) -> Self {
        let half = world_size * 0.5;
        let root = QuadNode::new(Aabb::new(Vec3::ZERO, Vec3::splat(half)), 0);
        Self {
            nodes: vec![root],
            max_depth,
            max_objects,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deepest depth currently allocated.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Quadrant path an entry with `aabb` follows from the root.
    pub fn path(&self, aabb: &Aabb) -> Vec<usize> {
        let mut path = Vec::new();
        let mut node = 0;
        while let Some(children) = self.nodes[node].children {
            match quadrant(&self.nodes[node].bounds, aabb) {
                Some(q) => {
                    path.push(q);
                    node = children[q];
                }
                None => break,
            }
        }
        path
    }

    fn split(&mut self, node: usize) -> [usize; 4] {
        let parent = &self.nodes[node];
        let bounds = parent.bounds;
        let depth = parent.depth + 1;
        let quarter = Vec3::new(bounds.half_extents.x * 0.5, 0.0, bounds.half_extents.z * 0.5);
        let half_extents = Vec3::new(quarter.x, bounds.half_extents.y, quarter.z);

        let first = self.nodes.len();
        for q in 0..4 {
            let sx = if q & 1 == 0 { -1.0 } else { 1.0 };
            let sz = if q & 2 == 0 { -1.0 } else { 1.0 };
            let center = bounds.center + Vec3::new(sx * quarter.x, 0.0, sz * quarter.z);
            self.nodes
                .push(QuadNode::new(Aabb::new(center, half_extents), depth));
        }
        let children = [first, first + 1, first + 2, first + 3];
        self.nodes[node].children = Some(children);
        children
    }

    fn insert_at(&mut self, mut node: usize, id: EntityId, aabb: Aabb) {
        while let Some(children) = self.nodes[node].children {
            match quadrant(&self.nodes[node].bounds, &aabb) {
                Some(q) => node = children[q],
                None => break,
            }
        }

        self.nodes[node].objects.push((id, aabb));

        let overfull = self.nodes[node].objects.len() > self.max_objects;
        if !overfull || self.nodes[node].depth >= self.max_depth {
            return;
        }

        let children = match self.nodes[node].children {
            Some(children) => children,
            None => self.split(node),
        };
        let bounds = self.nodes[node].bounds;
        let objects = std::mem::take(&mut self.nodes[node].objects);
        for (other, other_aabb) in objects {
            match quadrant(&bounds, &other_aabb) {
                Some(q) => self.insert_at(children[q], other, other_aabb),
                None => self.nodes[node].objects.push((other, other_aabb)),
            }
        }
    }

    fn retrieve_into(&self, aabb: &Aabb, out: &mut Vec<EntityId>) {
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            out.extend(node.objects.iter().map(|(id, _)| *id));
            if let Some(children) = node.children {
                match quadrant(&node.bounds, aabb) {
                    Some(q) => stack.push(children[q]),
                    None => stack.extend_from_slice(&children),
                }
            }
        }
    }
}

impl SpatialIndex for QuadTree {
    fn name(&self) -> &'static str {
        "quad-tree"
    }

    fn clear(&mut self) {
        self.nodes.truncate(1);
        if let Some(root) = self.nodes.first_mut() {
            root.objects.clear();
            root.children = None;
        }
    }

    fn insert(&mut self, id: EntityId, aabb: &Aabb) {
        self.insert_at(0, id, *aabb);
    }

    fn query(&self, aabb: &Aabb, out: &mut Vec<EntityId>) {
        self.retrieve_into(aabb, out);
    }

    fn candidate_pairs(&self, out: &mut Vec<(EntityId, EntityId)>) {
        let mut found = Vec::new();
        for node in &self.nodes {
            for (id, aabb) in &node.objects {
                found.clear();
                self.retrieve_into(aabb, &mut found);
                out.extend(
                    found
                        .iter()
                        .filter(|&&other| other != *id)
                        .map(|&other| ordered(*id, other)),
                );
            }
        }
    }
}
