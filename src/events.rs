// Event subscription registry and native dispatch trampoline
//
// Every subscription gets a numeric identifier; the engine only ever sees an
// opaque heap token wrapping that identifier. Dispatch runs on an
// engine-owned thread, resolves the token back through the registry and
// invokes the registered callbacks with their registered arguments — any
// reentry into the player API from a callback must be marshalled onto the
// owning thread by the caller (see `playback::Scheduler`).

use std::any::Any;
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::{Result, VlcError};
use crate::ffi;

/// An event kind reported by the native media player.
///
/// Discriminants match the engine's media player event type values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Event {
    MediaChanged = 0x100,
    NothingSpecial,
    Opening,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Forward,
    Backward,
    EndReached,
    EncounteredError,
    TimeChanged,
    PositionChanged,
    SeekableChanged,
    PausableChanged,
    TitleChanged,
    SnapshotTaken,
    LengthChanged,
    Vout,
    ScrambledChanged,
    ESAdded,
    ESDeleted,
    ESSelected,
    Corked,
    Uncorked,
    Muted,
    Unmuted,
    AudioVolume,
    AudioDevice,
    ChapterChanged,
}

/// Identifier for one event subscription.
///
/// Id 0 is reserved; lookups treat it as "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventId(pub(crate) u64);

/// User data handed back to callbacks on every dispatch.
pub type EventUserData = Option<Arc<dyn Any + Send + Sync>>;

/// External event notification callback.
pub type EventCallback = Arc<dyn Fn(Event, EventUserData) + Send + Sync>;

/// Bridge-internal callback with access to the raw native event.
pub(crate) type InternalEventCallback =
    Arc<dyn Fn(*const ffi::libvlc_event_t, EventUserData) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct EventContext {
    pub event: Event,
    pub external: Option<EventCallback>,
    pub internal: Option<InternalEventCallback>,
    pub user_data: EventUserData,
    /// Address of the heap `Subscription` handed to the engine. Owned by the
    /// registry entry; freed only after the native detach returns.
    pub token: usize,
}

#[derive(Default)]
struct EventRegistryInner {
    contexts: HashMap<u64, EventContext>,
    sequence: u64,
}

/// Registry of live event subscriptions, keyed by identifier.
#[derive(Default)]
pub(crate) struct EventRegistry {
    inner: RwLock<EventRegistryInner>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a subscription context, allocating the next identifier.
    /// At least one callback is required; no identifier is allocated when
    /// both are absent.
    pub fn register(
        &self,
        event: Event,
        external: Option<EventCallback>,
        internal: Option<InternalEventCallback>,
        user_data: EventUserData,
    ) -> Result<EventId> {
        if external.is_none() && internal.is_none() {
            return Err(VlcError::InvalidEventCallback);
        }

        let mut inner = self.inner.write();

        inner.sequence += 1;
        let id = inner.sequence;
        inner.contexts.insert(
            id,
            EventContext {
                event,
                external,
                internal,
                user_data,
                token: 0,
            },
        );

        Ok(EventId(id))
    }

    /// Records the native-side token for a stored subscription.
    pub fn set_token(&self, id: EventId, token: usize) {
        if let Some(ctx) = self.inner.write().contexts.get_mut(&id.0) {
            ctx.token = token;
        }
    }

    pub fn get(&self, id: EventId) -> Option<EventContext> {
        if id.0 == 0 {
            return None;
        }

        self.inner.read().contexts.get(&id.0).cloned()
    }

    pub fn remove(&self, id: EventId) -> Option<EventContext> {
        if id.0 == 0 {
            return None;
        }

        self.inner.write().contexts.remove(&id.0)
    }

    /// Invoked from the native event context. Unknown identifiers drop the
    /// event silently. The external callback runs before the internal one;
    /// both run outside the registry lock.
    pub fn dispatch(&self, id: EventId, native: *const ffi::libvlc_event_t) {
        let Some(ctx) = self.get(id) else {
            return;
        };

        if let Some(callback) = &ctx.external {
            callback(ctx.event, ctx.user_data.clone());
        }
        if let Some(callback) = &ctx.internal {
            callback(native, ctx.user_data);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.read().contexts.len()
    }

    #[cfg(test)]
    pub fn sequence(&self) -> u64 {
        self.inner.read().sequence
    }
}

/// Per-subscription token passed to the engine as its opaque user data.
///
/// Holds only a weak registry reference, so a dispatch racing instance
/// teardown degrades to a dropped event instead of a dangling access.
pub(crate) struct Subscription {
    pub registry: Weak<EventRegistry>,
    pub id: EventId,
}

/// The single trampoline the engine invokes with (event, token).
pub(crate) unsafe extern "C" fn event_trampoline(
    event: *const ffi::libvlc_event_t,
    user_data: *mut c_void,
) {
    if user_data.is_null() {
        return;
    }

    let subscription = &*(user_data as *const Subscription);
    if let Some(registry) = subscription.registry.upgrade() {
        registry.dispatch(subscription.id, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::ptr;

    fn recording_callback(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> EventCallback {
        let log = log.clone();
        let tag = tag.to_string();
        Arc::new(move |event, _user_data| {
            log.lock().push(format!("{}:{:?}", tag, event));
        })
    }

    #[test]
    fn test_register_requires_a_callback() {
        let registry = EventRegistry::new();

        let err = registry
            .register(Event::EndReached, None, None, None)
            .err()
            .expect("register must fail");
        assert!(matches!(err, VlcError::InvalidEventCallback));

        // No identifier was allocated for the failed registration.
        assert_eq!(registry.sequence(), 0);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_identifiers_increase_monotonically() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry
            .register(Event::Playing, Some(recording_callback(&log, "a")), None, None)
            .unwrap();
        let second = registry
            .register(Event::Stopped, Some(recording_callback(&log, "b")), None, None)
            .unwrap();

        assert!(second.0 > first.0);
    }

    #[test]
    fn test_id_zero_never_resolves() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register(Event::EndReached, Some(recording_callback(&log, "a")), None, None)
            .unwrap();

        assert!(registry.get(EventId(0)).is_none());
        assert!(registry.remove(EventId(0)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dispatch_after_remove_is_silent() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = registry
            .register(Event::EndReached, Some(recording_callback(&log, "cb")), None, None)
            .unwrap();
        registry.remove(id);

        registry.dispatch(id, ptr::null());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_dispatch_invokes_with_registered_arguments() {
        let registry = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_cb = seen.clone();
        let callback: EventCallback = Arc::new(move |event, user_data| {
            let value = user_data
                .and_then(|data| data.downcast::<u32>().ok())
                .map(|v| *v);
            seen_cb.lock().push((event, value));
        });

        let id = registry
            .register(Event::EndReached, Some(callback), None, Some(Arc::new(42u32)))
            .unwrap();
        registry.dispatch(id, ptr::null());

        assert_eq!(seen.lock().as_slice(), &[(Event::EndReached, Some(42))]);
    }

    #[test]
    fn test_external_callback_runs_before_internal() {
        let registry = EventRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let external = recording_callback(&log, "external");
        let log_internal = log.clone();
        let internal: InternalEventCallback = Arc::new(move |_native, _user_data| {
            log_internal.lock().push("internal".to_string());
        });

        let id = registry
            .register(Event::EndReached, Some(external), Some(internal), None)
            .unwrap();

        registry.dispatch(id, ptr::null());
        registry.dispatch(id, ptr::null());

        assert_eq!(
            log.lock().as_slice(),
            &[
                "external:EndReached".to_string(),
                "internal".to_string(),
                "external:EndReached".to_string(),
                "internal".to_string(),
            ]
        );
    }

    #[test]
    fn test_trampoline_resolves_token() {
        let registry = Arc::new(EventRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = registry
            .register(Event::EndReached, Some(recording_callback(&log, "t")), None, None)
            .unwrap();
        let token = Box::new(Subscription {
            registry: Arc::downgrade(&registry),
            id,
        });

        unsafe {
            event_trampoline(ptr::null(), &*token as *const Subscription as *mut c_void);
        }
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_trampoline_tolerates_dead_registry() {
        let registry = Arc::new(EventRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = registry
            .register(Event::EndReached, Some(recording_callback(&log, "t")), None, None)
            .unwrap();
        let token = Box::new(Subscription {
            registry: Arc::downgrade(&registry),
            id,
        });
        drop(registry);

        unsafe {
            event_trampoline(ptr::null(), &*token as *const Subscription as *mut c_void);
        }
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_trampoline_ignores_null_token() {
        unsafe {
            event_trampoline(ptr::null(), ptr::null_mut());
        }
    }
}
