// Reference-counted object registry shared with native code
//
// Native callbacks and media userdata slots carry only an opaque index; the
// registry resolves an index back to managed data and owns cleanup when the
// last reference is dropped. Lookups happen on dispatch paths, so the map is
// behind a reader/writer lock.

use std::any::Any;
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

use parking_lot::RwLock;

/// Opaque native-visible token for one registry entry.
///
/// Id 0 is reserved: it is what an empty native userdata slot reads back as,
/// and it never resolves to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub const NONE: ObjectId = ObjectId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Reinterprets a pointer-sized native userdata value as an id.
    pub(crate) fn from_token(token: *mut c_void) -> ObjectId {
        ObjectId(token as u64)
    }

    /// The pointer-sized value stored in a native userdata slot.
    pub(crate) fn as_token(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

struct ObjectEntry {
    refs: usize,
    data: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct ObjectRegistryInner {
    entries: HashMap<u64, ObjectEntry>,
    sequence: u64,
}

/// Arena of strong-counted entries keyed by opaque index.
#[derive(Default)]
pub(crate) struct ObjectRegistry {
    inner: RwLock<ObjectRegistryInner>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `data` with an initial reference count of one.
    pub fn insert(&self, data: Arc<dyn Any + Send + Sync>) -> ObjectId {
        let mut inner = self.inner.write();

        inner.sequence += 1;
        let id = inner.sequence;
        inner.entries.insert(id, ObjectEntry { refs: 1, data });

        ObjectId(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<Arc<dyn Any + Send + Sync>> {
        if id.is_none() {
            return None;
        }

        self.inner.read().entries.get(&id.0).map(|entry| entry.data.clone())
    }

    /// Adds a reference to an entry. Absent ids are ignored.
    pub fn inc_refs(&self, id: ObjectId) {
        if id.is_none() {
            return;
        }

        if let Some(entry) = self.inner.write().entries.get_mut(&id.0) {
            entry.refs += 1;
        }
    }

    /// Drops a reference; the entry is removed when the count reaches zero.
    /// Decrementing an absent id is a silent no-op, never an error — the
    /// native side may already have torn down the association.
    pub fn dec_refs(&self, id: ObjectId) {
        if id.is_none() {
            return;
        }

        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(&id.0) {
            entry.refs -= 1;
            if entry.refs == 0 {
                inner.entries.remove(&id.0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
