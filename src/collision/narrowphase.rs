use std::collections::BTreeMap;

use log::trace;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    core::{
        collider::{CollisionCallbacks, ShapeKind},
        rigidbody::RigidBody,
    },
    utils::{
        allocator::{Arena, EntityId},
        pool::Pool,
    },
};

use super::{
    contact::{Contact, ContactEvent, ContactKey},
    shapes::{self, ContactGeometry, ShapeView},
};

#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 128;

/// Contact generator for one ordered pair of shape kinds.
pub type ContactFn = fn(&ShapeView<'_>, &ShapeView<'_>) -> Option<ContactGeometry>;

/// Table of contact generators indexed by the two shape kinds.
///
/// Missing entries mean the pair is unsupported and never produces a contact.
#[derive(Clone)]
pub struct DispatchTable {
    entries: [[Option<ContactFn>; ShapeKind::COUNT]; ShapeKind::COUNT],
}

impl Default for DispatchTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(ShapeKind::Sphere, ShapeKind::Sphere, shapes::sphere_sphere);
        table.register(ShapeKind::Box, ShapeKind::Box, shapes::box_box);
        table.register(ShapeKind::Box, ShapeKind::Sphere, shapes::box_sphere);
        table.register(ShapeKind::Sphere, ShapeKind::Box, shapes::sphere_box);
        table.register(ShapeKind::Capsule, ShapeKind::Sphere, shapes::capsule_sphere);
        table.register(ShapeKind::Sphere, ShapeKind::Capsule, shapes::sphere_capsule);
        table.register(ShapeKind::Capsule, ShapeKind::Capsule, shapes::capsule_capsule);
        table
    }
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self {
            entries: [[None; ShapeKind::COUNT]; ShapeKind::COUNT],
        }
    }

    pub fn register(&mut self, a: ShapeKind, b: ShapeKind, generator: ContactFn) {
        self.entries[a.index()][b.index()] = Some(generator);
    }

    pub fn get(&self, a: ShapeKind, b: ShapeKind) -> Option<ContactFn> {
        self.entries[a.index()][b.index()]
    }

    pub fn supports(&self, a: ShapeKind, b: ShapeKind) -> bool {
        self.get(a, b).is_some()
    }

    pub fn collide(&self, a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
        let generator = self.get(a.shape.kind(), b.shape.kind())?;
        generator(a, b)
    }
}

/// Geometry produced for one candidate this tick.
#[derive(Debug, Clone, Copy)]
struct Hit {
    key: ContactKey,
    geometry: ContactGeometry,
    is_trigger: bool,
}

/// Exact contact generation plus frame-to-frame contact persistence.
///
/// Live contacts are keyed by [`ContactKey`] in an ordered map so iteration,
/// callbacks and events follow key order on every run. Retired contacts go
/// back to a pool and are reused for the next new pair.
pub struct NarrowPhase {
    table: DispatchTable,
    contacts: BTreeMap<ContactKey, Box<Contact>>,
    pool: Pool<Box<Contact>>,
    events: Vec<ContactEvent>,
    hits: Vec<Hit>,
    stale: Vec<ContactKey>,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    parallel: bool,
}

impl Default for NarrowPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrowPhase {
    pub fn new() -> Self {
        Self::with_table(DispatchTable::default())
    }

    pub fn with_table(table: DispatchTable) -> Self {
        Self {
            table,
            contacts: BTreeMap::new(),
            pool: Pool::new(),
            events: Vec::new(),
            hits: Vec::new(),
            stale: Vec::new(),
            parallel: cfg!(feature = "parallel"),
        }
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    pub fn contact(&self, key: ContactKey) -> Option<&Contact> {
        self.contacts.get(&key).map(|c| &**c)
    }

    /// Live contacts in key order.
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.contacts.values().map(|c| &**c)
    }

    pub fn contacts_mut(&mut self) -> impl Iterator<Item = &mut Contact> + '_ {
        self.contacts.values_mut().map(|c| &mut **c)
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Events recorded by the last [`NarrowPhase::update`].
    pub fn events(&self) -> &[ContactEvent] {
        &self.events
    }

    pub fn pool(&self) -> &Pool<Box<Contact>> {
        &self.pool
    }

    /// Computes contact geometry for one pair, `None` when the bodies are
    /// missing, shapeless, unsupported or apart.
    pub fn generate(&self, bodies: &Arena<RigidBody>, key: ContactKey) -> Option<ContactGeometry> {
        self.hit(bodies, key).map(|hit| hit.geometry)
    }

    fn hit(&self, bodies: &Arena<RigidBody>, key: ContactKey) -> Option<Hit> {
        let body_a = bodies.get(key.a())?;
        let body_b = bodies.get(key.b())?;
        let collider_a = body_a.collider()?;
        let collider_b = body_b.collider()?;

        let view_a = ShapeView::new(&collider_a.shape, collider_a.world_transform(&body_a.transform));
        let view_b = ShapeView::new(&collider_b.shape, collider_b.world_transform(&body_b.transform));
        let geometry = self.table.collide(&view_a, &view_b)?;

        Some(Hit {
            key,
            geometry,
            is_trigger: body_a.is_trigger
                || body_b.is_trigger
                || collider_a.is_trigger
                || collider_b.is_trigger,
        })
    }

    #[cfg(feature = "parallel")]
    fn collect_hits(&mut self, bodies: &Arena<RigidBody>, pairs: &[ContactKey]) {
        self.hits.clear();
        if self.parallel && pairs.len() >= PARALLEL_THRESHOLD {
            let this = &*self;
            let hits: Vec<Hit> = pairs
                .par_iter()
                .filter_map(|key| this.hit(bodies, *key))
                .collect();
            self.hits = hits;
        } else {
            self.collect_hits_sequential(bodies, pairs);
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn collect_hits(&mut self, bodies: &Arena<RigidBody>, pairs: &[ContactKey]) {
        self.hits.clear();
        self.collect_hits_sequential(bodies, pairs);
    }

    fn collect_hits_sequential(&mut self, bodies: &Arena<RigidBody>, pairs: &[ContactKey]) {
        let mut hits = std::mem::take(&mut self.hits);
        hits.extend(pairs.iter().filter_map(|key| self.hit(bodies, *key)));
        self.hits = hits;
    }

    /// Turns this tick's candidate pairs into live contacts.
    ///
    /// New pairs fire `on_enter`, continuing pairs fire `on_stay`, and
    /// tracked pairs without a contact this tick are retired with `on_exit`.
    pub fn update(&mut self, bodies: &mut Arena<RigidBody>, pairs: &[ContactKey]) {
        self.events.clear();
        self.collect_hits(bodies, pairs);
        self.hits.sort_unstable_by_key(|hit| hit.key);

        let hits = std::mem::take(&mut self.hits);
        for hit in &hits {
            match self.contacts.get_mut(&hit.key) {
                Some(contact) => {
                    contact.point = hit.geometry.point;
                    contact.normal = hit.geometry.normal;
                    contact.depth = hit.geometry.depth;
                    contact.is_new = false;
                    contact.is_trigger = hit.is_trigger;
                    self.events.push(ContactEvent::stay(hit.key));
                    notify(bodies, hit.key, |callbacks, other| callbacks.fire_stay(other));
                }
                None => {
                    let mut contact = self.pool.acquire(Box::default);
                    contact.body_a = hit.key.a();
                    contact.body_b = hit.key.b();
                    contact.point = hit.geometry.point;
                    contact.normal = hit.geometry.normal;
                    contact.depth = hit.geometry.depth;
                    contact.is_new = true;
                    contact.is_trigger = hit.is_trigger;
                    self.contacts.insert(hit.key, contact);
                    self.events.push(ContactEvent::enter(hit.key));

                    if !hit.is_trigger {
                        wake(bodies, hit.key);
                    }
                    notify(bodies, hit.key, |callbacks, other| callbacks.fire_enter(other));
                }
            }
        }

        self.stale.clear();
        self.stale.extend(
            self.contacts
                .keys()
                .filter(|key| hits.binary_search_by_key(*key, |hit| hit.key).is_err())
                .copied(),
        );
        let stale = std::mem::take(&mut self.stale);
        for &key in &stale {
            self.retire(key);
            self.events.push(ContactEvent::exit(key));
            notify(bodies, key, |callbacks, other| callbacks.fire_exit(other));
        }
        self.stale = stale;

        trace!(
            "narrow phase: {} candidates, {} contacts, {} events, {} pooled",
            pairs.len(),
            self.contacts.len(),
            self.events.len(),
            self.pool.available()
        );
        self.hits = hits;
    }

    fn retire(&mut self, key: ContactKey) -> bool {
        match self.contacts.remove(&key) {
            Some(mut contact) => {
                contact.reset();
                self.pool.release(contact);
                true
            }
            None => false,
        }
    }

    /// Drops every contact referencing `body` without firing callbacks.
    pub fn forget_body(&mut self, body: EntityId) -> usize {
        let keys: Vec<ContactKey> = self
            .contacts
            .keys()
            .filter(|key| key.involves(body))
            .copied()
            .collect();
        keys.into_iter().filter(|key| self.retire(*key)).count()
    }

    /// Drops all live contacts and pending events without callbacks.
    pub fn clear(&mut self) {
        let keys: Vec<ContactKey> = self.contacts.keys().copied().collect();
        for key in keys {
            self.retire(key);
        }
        self.events.clear();
    }
}

/// Runs `fire` on both participants' callbacks, each receiving the other id.
fn notify(
    bodies: &mut Arena<RigidBody>,
    key: ContactKey,
    mut fire: impl FnMut(&mut CollisionCallbacks, EntityId),
) {
    for (own, other) in [(key.a(), key.b()), (key.b(), key.a())] {
        if let Some(collider) = bodies.get_mut(own).and_then(RigidBody::collider_mut) {
            fire(&mut collider.callbacks, other);
        }
    }
}

fn wake(bodies: &mut Arena<RigidBody>, key: ContactKey) {
    for id in [key.a(), key.b()] {
        if let Some(body) = bodies.get_mut(id) {
            if body.is_sleeping && body.is_dynamic() {
                body.wake();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collider::Collider;
    use glam::Vec3;

    fn sphere_at(bodies: &mut Arena<RigidBody>, position: Vec3) -> EntityId {
        bodies.insert_with(|id| {
            let mut body = RigidBody::builder()
                .position(position)
                .collider(Collider::sphere(1.0))
                .build();
            body.set_id(id);
            body
        })
    }

    fn move_to(bodies: &mut Arena<RigidBody>, id: EntityId, position: Vec3) {
        if let Some(body) = bodies.get_mut(id) {
            body.transform.position = position;
            body.update_aabb();
        }
    }

    #[test]
    fn table_leaves_mesh_pairs_unsupported() {
        let table = DispatchTable::default();
        assert!(table.supports(ShapeKind::Sphere, ShapeKind::Sphere));
        assert!(table.supports(ShapeKind::Sphere, ShapeKind::Box));
        assert!(!table.supports(ShapeKind::Mesh, ShapeKind::Sphere));
        assert!(!table.supports(ShapeKind::Box, ShapeKind::Capsule));
    }

    #[test]
    fn new_contact_is_flagged_then_continues() {
        let mut bodies = Arena::new();
        let a = sphere_at(&mut bodies, Vec3::ZERO);
        let b = sphere_at(&mut bodies, Vec3::new(1.5, 0.0, 0.0));
        let key = ContactKey::new(a, b);
        let mut narrow = NarrowPhase::new();

        narrow.update(&mut bodies, &[key]);
        assert!(narrow.contact(key).is_some_and(|c| c.is_new));
        assert_eq!(narrow.events(), &[ContactEvent::enter(key)]);

        move_to(&mut bodies, b, Vec3::new(1.8, 0.0, 0.0));
        narrow.update(&mut bodies, &[key]);
        let contact = narrow.contact(key).expect("still touching");
        assert!(!contact.is_new);
        assert!((contact.depth - 0.2).abs() < 1e-5);
        assert_eq!(narrow.events(), &[ContactEvent::stay(key)]);
    }

    #[test]
    fn separated_candidate_is_retired() {
        let mut bodies = Arena::new();
        let a = sphere_at(&mut bodies, Vec3::ZERO);
        let b = sphere_at(&mut bodies, Vec3::new(1.5, 0.0, 0.0));
        let key = ContactKey::new(a, b);
        let mut narrow = NarrowPhase::new();
        narrow.update(&mut bodies, &[key]);

        move_to(&mut bodies, b, Vec3::new(2.5, 0.0, 0.0));
        narrow.update(&mut bodies, &[key]);
        assert_eq!(narrow.contact_count(), 0);
        assert_eq!(narrow.events(), &[ContactEvent::exit(key)]);
        assert_eq!(narrow.pool().available(), 1);
    }

    #[test]
    fn pool_is_reused_across_cycles() {
        let mut bodies = Arena::new();
        let a = sphere_at(&mut bodies, Vec3::ZERO);
        let b = sphere_at(&mut bodies, Vec3::new(1.5, 0.0, 0.0));
        let key = ContactKey::new(a, b);
        let mut narrow = NarrowPhase::new();

        for _ in 0..50 {
            narrow.update(&mut bodies, &[key]);
            narrow.update(&mut bodies, &[]);
        }
        assert_eq!(narrow.pool().allocated(), 1);
        assert_eq!(narrow.pool().available(), 1);
    }

    #[test]
    fn forget_body_drops_contacts_silently() {
        let mut bodies = Arena::new();
        let a = sphere_at(&mut bodies, Vec3::ZERO);
        let b = sphere_at(&mut bodies, Vec3::new(1.5, 0.0, 0.0));
        let mut narrow = NarrowPhase::new();
        narrow.update(&mut bodies, &[ContactKey::new(a, b)]);

        assert_eq!(narrow.forget_body(b), 1);
        assert_eq!(narrow.forget_body(b), 0);
        narrow.update(&mut bodies, &[]);
        assert!(narrow.events().is_empty());
    }

    #[test]
    fn generate_evaluates_without_tracking() {
        let mut bodies = Arena::new();
        let a = sphere_at(&mut bodies, Vec3::ZERO);
        let b = sphere_at(&mut bodies, Vec3::new(1.5, 0.0, 0.0));
        let key = ContactKey::new(a, b);
        let narrow = NarrowPhase::new();

        let geometry = narrow.generate(&bodies, key).expect("overlapping");
        assert_eq!(geometry.normal, Vec3::X);
        assert_eq!(geometry.depth, 0.5);
        assert_eq!(narrow.contact_count(), 0);

        bodies.remove(b);
        assert!(narrow.generate(&bodies, key).is_none());
    }

    #[test]
    fn new_contact_wakes_sleepers() {
        let mut bodies = Arena::new();
        let a = sphere_at(&mut bodies, Vec3::ZERO);
        let b = sphere_at(&mut bodies, Vec3::new(1.5, 0.0, 0.0));
        if let Some(body) = bodies.get_mut(a) {
            body.sleep();
        }
        let mut narrow = NarrowPhase::new();
        narrow.update(&mut bodies, &[ContactKey::new(a, b)]);
        assert!(bodies.get(a).is_some_and(|body| !body.is_sleeping));
    }
}
