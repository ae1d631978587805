use std::collections::HashSet;

use log::trace;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    config::BroadPhaseConfig,
    core::{aabb::Aabb, rigidbody::RigidBody},
    utils::allocator::{Arena, EntityId},
};

use super::{
    contact::ContactKey,
    spatial::{build_index, SpatialIndex},
};

/// Below this many candidates the exact tests stay on the calling thread.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 256;

/// Broad phase driver returning candidate body pairs.
///
/// Owns the spatial index and every scratch buffer, so repeated ticks reuse
/// the same allocations.
pub struct BroadPhase {
    index: Box<dyn SpatialIndex>,
    config: BroadPhaseConfig,
    entries: Vec<(EntityId, Aabb)>,
    raw_pairs: Vec<(EntityId, EntityId)>,
    seen: HashSet<ContactKey>,
    candidates: Vec<ContactKey>,
    pairs: Vec<ContactKey>,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    parallel: bool,
}

impl BroadPhase {
    pub fn new(config: BroadPhaseConfig) -> Self {
        Self {
            index: build_index(config.index),
            config,
            entries: Vec::new(),
            raw_pairs: Vec::new(),
            seen: HashSet::new(),
            candidates: Vec::new(),
            pairs: Vec::new(),
            parallel: cfg!(feature = "parallel"),
        }
    }

    pub fn config(&self) -> &BroadPhaseConfig {
        &self.config
    }

    /// Swaps the index when the configured kind changed.
    pub fn set_config(&mut self, config: BroadPhaseConfig) {
        if config.index != self.config.index {
            self.index = build_index(config.index);
        }
        self.config = config;
    }

    pub fn index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    /// Pairs emitted by the last call to [`BroadPhase::find_pairs`].
    pub fn pairs(&self) -> &[ContactKey] {
        &self.pairs
    }

    fn is_eligible(&self, body: &RigidBody) -> bool {
        body.collider().is_some() && (self.config.include_static_bodies || !body.is_static)
    }

    /// Rebuilds the index from the bodies' cached collider bounds and returns
    /// the deduplicated pairs whose bounds overlap, sorted by key.
    pub fn find_pairs(&mut self, bodies: &Arena<RigidBody>) -> &[ContactKey] {
        self.entries.clear();
        for (id, body) in bodies.iter() {
            if !self.is_eligible(body) {
                continue;
            }
            if let Some(collider) = body.collider() {
                self.entries.push((id, *collider.aabb()));
            }
        }
        self.index.rebuild(&self.entries);

        self.raw_pairs.clear();
        self.index.candidate_pairs(&mut self.raw_pairs);

        self.seen.clear();
        self.candidates.clear();
        for &(x, y) in &self.raw_pairs {
            let key = ContactKey::new(x, y);
            if self.seen.insert(key) && Self::passes_filter(bodies, key) {
                self.candidates.push(key);
            }
        }

        self.pairs.clear();
        self.collect_overlapping(bodies);
        self.pairs.sort_unstable();

        trace!(
            "broad phase ({}): {} bodies, {} raw, {} unique, {} overlapping",
            self.index.name(),
            self.entries.len(),
            self.raw_pairs.len(),
            self.seen.len(),
            self.pairs.len()
        );
        &self.pairs
    }

    #[cfg(feature = "parallel")]
    fn collect_overlapping(&mut self, bodies: &Arena<RigidBody>) {
        if self.parallel && self.candidates.len() >= PARALLEL_THRESHOLD {
            let overlapping: Vec<ContactKey> = self
                .candidates
                .par_iter()
                .copied()
                .filter(|key| Self::bounds_overlap(bodies, *key))
                .collect();
            self.pairs.extend(overlapping);
        } else {
            self.collect_overlapping_sequential(bodies);
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn collect_overlapping(&mut self, bodies: &Arena<RigidBody>) {
        self.collect_overlapping_sequential(bodies);
    }

    fn collect_overlapping_sequential(&mut self, bodies: &Arena<RigidBody>) {
        self.pairs.extend(
            self.candidates
                .iter()
                .copied()
                .filter(|key| Self::bounds_overlap(bodies, *key)),
        );
    }

    fn passes_filter(bodies: &Arena<RigidBody>, key: ContactKey) -> bool {
        let (Some(a), Some(b)) = (bodies.get(key.a()), bodies.get(key.b())) else {
            return false;
        };
        !(a.is_static && b.is_static) && a.filter.allows(&b.filter)
    }

    fn bounds_overlap(bodies: &Arena<RigidBody>, key: ContactKey) -> bool {
        let bounds = |id| bodies.get(id).and_then(RigidBody::collider).map(|c| c.aabb());
        match (bounds(key.a()), bounds(key.b())) {
            (Some(a), Some(b)) => a.overlaps(b),
            _ => false,
        }
    }
}
