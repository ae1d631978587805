use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::utils::allocator::EntityId;

/// Unordered body pair, stored smaller id first so both orders map to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactKey {
    a: EntityId,
    b: EntityId,
}

impl ContactKey {
    pub fn new(x: EntityId, y: EntityId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn a(&self) -> EntityId {
        self.a
    }

    pub fn b(&self) -> EntityId {
        self.b
    }

    pub fn involves(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }

    /// The participant that is not `id`.
    pub fn other(&self, id: EntityId) -> EntityId {
        if self.a == id {
            self.b
        } else {
            self.a
        }
    }
}

impl fmt::Display for ContactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}

/// Live contact between two bodies. `normal` points from `body_a` to `body_b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub body_a: EntityId,
    pub body_b: EntityId,
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    /// Set only on the tick the pair started touching.
    pub is_new: bool,
    /// Reported and evented, never solved.
    pub is_trigger: bool,
    /// Accumulated impulses from the last solve.
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
}

impl Default for Contact {
    fn default() -> Self {
        Self {
            body_a: EntityId::NULL,
            body_b: EntityId::NULL,
            point: Vec3::ZERO,
            normal: Vec3::Y,
            depth: 0.0,
            is_new: false,
            is_trigger: false,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        }
    }
}

impl Contact {
    pub fn key(&self) -> ContactKey {
        ContactKey::new(self.body_a, self.body_b)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactEventKind {
    Enter,
    Stay,
    Exit,
}

/// Record of one enter/stay/exit transition produced during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub kind: ContactEventKind,
    pub key: ContactKey,
}

impl ContactEvent {
    pub fn enter(key: ContactKey) -> Self {
        Self {
            kind: ContactEventKind::Enter,
            key,
        }
    }

    pub fn stay(key: ContactKey) -> Self {
        Self {
            kind: ContactEventKind::Stay,
            key,
        }
    }

    pub fn exit(key: ContactKey) -> Self {
        Self {
            kind: ContactEventKind::Exit,
            key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        let x = EntityId::new(4, 0);
        let y = EntityId::new(2, 1);
        let key = ContactKey::new(x, y);
        assert_eq!(key, ContactKey::new(y, x));
        assert_eq!(key.a(), y);
        assert_eq!(key.other(y), x);
        assert!(key.involves(x));
        assert!(!key.involves(EntityId::from_index(9)));
    }

    #[test]
    fn reset_clears_impulses() {
        let mut contact = Contact {
            normal_impulse: 3.0,
            is_new: true,
            ..Contact::default()
        };
        contact.reset();
        assert_eq!(contact, Contact::default());
    }
}
