//! Core types for change observation.

use crate::schema::EntityDescription;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;
use std::sync::Arc;

/// Persistent identity of a managed object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a persistence context.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.0)
    }
}

/// Kind of change reported for an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Deleted,
    Inserted,
    Updated,
    Refreshed,
}

impl EventKind {
    /// Every defined kind.
    pub const ALL: [EventKind; 4] = [
        EventKind::Deleted,
        EventKind::Inserted,
        EventKind::Updated,
        EventKind::Refreshed,
    ];

    fn bit(self) -> u8 {
        match self {
            EventKind::Deleted => 1,
            EventKind::Inserted => 1 << 1,
            EventKind::Updated => 1 << 2,
            EventKind::Refreshed => 1 << 3,
        }
    }

    /// Single-letter code used in diagnostic output.
    pub fn code(self) -> char {
        match self {
            EventKind::Deleted => 'D',
            EventKind::Inserted => 'I',
            EventKind::Updated => 'U',
            EventKind::Refreshed => 'R',
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Deleted => "deleted",
            EventKind::Inserted => "inserted",
            EventKind::Updated => "updated",
            EventKind::Refreshed => "refreshed",
        };
        f.write_str(name)
    }
}

/// A combinable set of event kinds.
///
/// Serialized as the list of contained kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<EventKind>", from = "Vec<EventKind>")]
pub struct EventMask(u8);

impl EventMask {
    /// The empty mask.
    pub const fn empty() -> Self {
        EventMask(0)
    }

    /// Every kind in [`EventKind::ALL`].
    pub fn all() -> Self {
        EventKind::ALL.iter().copied().collect()
    }

    pub fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: EventKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: EventKind) {
        self.0 &= !kind.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Contained kinds, in [`EventKind::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl Default for EventMask {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<EventKind> for EventMask {
    fn from(kind: EventKind) -> Self {
        EventMask(kind.bit())
    }
}

impl FromIterator<EventKind> for EventMask {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        let mut mask = EventMask::empty();
        for kind in iter {
            mask.insert(kind);
        }
        mask
    }
}

impl From<Vec<EventKind>> for EventMask {
    fn from(kinds: Vec<EventKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<EventMask> for Vec<EventKind> {
    fn from(mask: EventMask) -> Self {
        mask.iter().collect()
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl BitOr<EventKind> for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventKind) -> EventMask {
        EventMask(self.0 | rhs.bit())
    }
}

impl BitOr for EventKind {
    type Output = EventMask;

    fn bitor(self, rhs: EventKind) -> EventMask {
        EventMask(self.bit() | rhs.bit())
    }
}

impl BitOrAssign<EventKind> for EventMask {
    fn bitor_assign(&mut self, rhs: EventKind) {
        self.insert(rhs);
    }
}

/// An object tracked by a persistence context.
///
/// Implemented by whatever handle type the persistence layer hands out for
/// changed objects.
pub trait ManagedObject {
    /// Persistent identity.
    fn object_id(&self) -> ObjectId;

    /// Schema descriptor of the object's entity.
    fn entity(&self) -> &Arc<EntityDescription>;

    /// Fields changed in the current transaction.
    ///
    /// Only consulted for objects reported as updated.
    fn changed_fields(&self) -> Vec<String>;

    /// Fields that never count as a change for this object.
    fn ignored_fields_for_observation(&self) -> Vec<String> {
        Vec::new()
    }
}

macro_rules! forward_managed_object {
    ($($wrapper:ty),*) => {
        $(
            impl<T: ManagedObject + ?Sized> ManagedObject for $wrapper {
                fn object_id(&self) -> ObjectId {
                    (**self).object_id()
                }

                fn entity(&self) -> &Arc<EntityDescription> {
                    (**self).entity()
                }

                fn changed_fields(&self) -> Vec<String> {
                    (**self).changed_fields()
                }

                fn ignored_fields_for_observation(&self) -> Vec<String> {
                    (**self).ignored_fields_for_observation()
                }
            }
        )*
    };
}

forward_managed_object!(&T, Box<T>, Rc<T>, Arc<T>);

/// Objects changed by one transaction, split by kind.
///
/// The four collections are disjoint.
#[derive(Clone, Debug)]
pub struct ChangeBatch<O> {
    pub inserted: Vec<O>,
    pub deleted: Vec<O>,
    pub updated: Vec<O>,
    pub refreshed: Vec<O>,
}

impl<O> ChangeBatch<O> {
    pub fn new() -> Self {
        Self {
            inserted: Vec::new(),
            deleted: Vec::new(),
            updated: Vec::new(),
            refreshed: Vec::new(),
        }
    }

    pub fn inserted(mut self, object: O) -> Self {
        self.inserted.push(object);
        self
    }

    pub fn deleted(mut self, object: O) -> Self {
        self.deleted.push(object);
        self
    }

    pub fn updated(mut self, object: O) -> Self {
        self.updated.push(object);
        self
    }

    pub fn refreshed(mut self, object: O) -> Self {
        self.refreshed.push(object);
        self
    }

    /// Objects reported with the given kind.
    pub fn objects(&self, kind: EventKind) -> &[O] {
        match kind {
            EventKind::Inserted => &self.inserted,
            EventKind::Deleted => &self.deleted,
            EventKind::Updated => &self.updated,
            EventKind::Refreshed => &self.refreshed,
        }
    }

    /// Total number of changed objects.
    pub fn len(&self) -> usize {
        self.inserted.len() + self.deleted.len() + self.updated.len() + self.refreshed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<O> Default for ChangeBatch<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// A change batch tagged with the context that produced it.
#[derive(Clone, Debug)]
pub struct ChangeNotification<O> {
    pub context: ContextId,
    pub batch: ChangeBatch<O>,
}

impl<O> ChangeNotification<O> {
    pub fn new(context: ContextId, batch: ChangeBatch<O>) -> Self {
        Self { context, batch }
    }
}
