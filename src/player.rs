// Player wrapper and per-player event manager
//
// Every operation follows the same shape: guard that the player is still
// initialized, issue the native call, then translate the engine's advisory
// last-error channel into a structured error (falling back to a named
// sentinel when the channel is empty). Player handles are owning-thread
// affine; the bridge adds no locking around them.

use std::ffi::{c_int, c_uint, c_void, CString};
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use crate::error::{Result, VlcError};
use crate::events::{
    event_trampoline, Event, EventCallback, EventId, EventUserData, InternalEventCallback,
    Subscription,
};
use crate::ffi;
use crate::instance::Instance;
use crate::media::Media;

pub struct Player {
    instance: Arc<Instance>,
    handle: AtomicPtr<ffi::libvlc_media_player_t>,
}

impl Player {
    /// Creates a media player against a live instance.
    pub fn new(instance: &Arc<Instance>) -> Result<Player> {
        let handle = unsafe { (instance.lib().media_player_new)(instance.handle()) };
        if handle.is_null() {
            return Err(instance.lib().err_or(VlcError::PlayerCreate));
        }

        Ok(Player {
            instance: instance.clone(),
            handle: AtomicPtr::new(handle),
        })
    }

    /// The instance this player was created against.
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    fn raw(&self) -> Result<*mut ffi::libvlc_media_player_t> {
        let handle = self.handle.load(Ordering::Acquire);
        if handle.is_null() {
            Err(VlcError::PlayerNotInitialized)
        } else {
            Ok(handle)
        }
    }

    /// Sets the window handle the player renders its video into.
    pub fn set_hwnd(&self, hwnd: usize) -> Result<()> {
        let handle = self.raw()?;
        unsafe { (self.instance.lib().media_player_set_hwnd)(handle, hwnd as *mut c_void) };
        self.instance.lib().check()
    }

    /// Enables or disables key press handling by the video surface.
    pub fn set_key_input(&self, enable: bool) -> Result<()> {
        let handle = self.raw()?;
        unsafe { (self.instance.lib().video_set_key_input)(handle, enable as c_uint) };
        self.instance.lib().check()
    }

    /// Enables or disables mouse click handling by the video surface.
    pub fn set_mouse_input(&self, enable: bool) -> Result<()> {
        let handle = self.raw()?;
        unsafe { (self.instance.lib().video_set_mouse_input)(handle, enable as c_uint) };
        self.instance.lib().check()
    }

    /// Selects the audio output backend. Takes effect on the next playback.
    /// Some engine builds lack the requested backend, so callers commonly
    /// treat a failure here as non-fatal.
    pub fn set_audio_output(&self, output: &str) -> Result<()> {
        let handle = self.raw()?;
        let c_output = CString::new(output).map_err(|_| VlcError::AudioOutputSet)?;

        if unsafe { (self.instance.lib().audio_output_set)(handle, c_output.as_ptr()) } != 0 {
            return Err(self.instance.lib().err_or(VlcError::AudioOutputSet));
        }
        Ok(())
    }

    /// Mutes or unmutes the player's audio output.
    pub fn set_mute(&self, mute: bool) -> Result<()> {
        let handle = self.raw()?;
        unsafe { (self.instance.lib().audio_set_mute)(handle, mute as c_int) };
        self.instance.lib().check()
    }

    /// Loads the media at `path` and makes it the player's current media.
    /// The path is existence-checked before any native object is built; a
    /// binding failure releases the just-constructed media.
    pub fn load_media_from_path(&self, path: impl AsRef<Path>) -> Result<Media> {
        let media = Media::from_path(&self.instance, path)?;

        if let Err(err) = self.set_media(&media) {
            let _ = media.release();
            return Err(err);
        }
        Ok(media)
    }

    /// Binds `media` as the player's current media.
    pub fn set_media(&self, media: &Media) -> Result<()> {
        let handle = self.raw()?;
        let media_handle = media.raw()?;

        unsafe { (self.instance.lib().media_player_set_media)(handle, media_handle) };
        self.instance.lib().check()
    }

    /// Starts playback of the current media. A player that is already
    /// playing is left alone.
    pub fn play(&self) -> Result<()> {
        let handle = self.raw()?;
        if self.is_playing() {
            return Ok(());
        }

        if unsafe { (self.instance.lib().media_player_play)(handle) } < 0 {
            return Err(self
                .instance
                .lib()
                .err_or(VlcError::Playback("could not start playback".to_string())));
        }
        Ok(())
    }

    /// Whether the player is currently playing. An uninitialized player
    /// reports false rather than an error.
    pub fn is_playing(&self) -> bool {
        match self.raw() {
            Ok(handle) => (unsafe { (self.instance.lib().media_player_is_playing)(handle) }) != 0,
            Err(_) => false,
        }
    }

    /// The player's current media. Returns `Ok(None)` when nothing is bound
    /// — no media is not an error.
    pub fn media(&self) -> Result<Option<Media>> {
        let handle = self.raw()?;

        let media = unsafe { (self.instance.lib().media_player_get_media)(handle) };
        if media.is_null() {
            return Ok(None);
        }

        // The native get added a reference; drop it here so the returned
        // wrapper aliases the player's own reference.
        unsafe { (self.instance.lib().media_release)(media) };

        Ok(Some(Media::from_handle(&self.instance, media)))
    }

    /// Stops playback. Tolerated on an already-stopped player.
    pub fn stop(&self) -> Result<()> {
        let handle = self.raw()?;
        unsafe { (self.instance.lib().media_player_stop)(handle) };
        self.instance.lib().check()
    }

    /// Releases the native player. Double release is a no-op and issues no
    /// second native call.
    pub fn release(&self) -> Result<()> {
        let handle = self.handle.swap(ptr::null_mut(), Ordering::AcqRel);
        if handle.is_null() {
            return Ok(());
        }

        unsafe { (self.instance.lib().media_player_release)(handle) };
        self.instance.lib().check()
    }

    #[cfg(test)]
    pub(crate) fn raw_handle(&self) -> usize {
        self.handle.load(Ordering::Acquire) as usize
    }

    /// The native event manager for this player.
    pub fn event_manager(&self) -> Result<EventManager<'_>> {
        let handle = self.raw()?;

        let manager = unsafe { (self.instance.lib().media_player_event_manager)(handle) };
        if manager.is_null() {
            return Err(VlcError::MissingEventManager);
        }

        Ok(EventManager {
            player: self,
            handle: manager,
        })
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        // Safety net; an explicit release has already nulled the handle.
        let _ = self.release();
    }
}

/// Per-player event source, borrowed from the player for its lifetime.
pub struct EventManager<'p> {
    player: &'p Player,
    handle: *mut ffi::libvlc_event_manager_t,
}

impl EventManager<'_> {
    /// Registers `callback` for `event` notifications.
    ///
    /// The callback is invoked synchronously from an engine-owned thread;
    /// work that re-enters the player/media API must be marshalled onto the
    /// owning thread (see `playback::Scheduler`).
    pub fn attach(
        &self,
        event: Event,
        callback: EventCallback,
        user_data: EventUserData,
    ) -> Result<EventId> {
        self.attach_callbacks(event, Some(callback), None, user_data)
    }

    pub(crate) fn attach_callbacks(
        &self,
        event: Event,
        external: Option<EventCallback>,
        internal: Option<InternalEventCallback>,
        user_data: EventUserData,
    ) -> Result<EventId> {
        let instance = &self.player.instance;
        let events = instance.events();

        let id = events.register(event, external, internal, user_data)?;
        let token = Box::into_raw(Box::new(Subscription {
            registry: Arc::downgrade(events),
            id,
        }));
        events.set_token(id, token as usize);

        let rc = unsafe {
            (instance.lib().event_attach)(
                self.handle,
                event as ffi::libvlc_event_type_t,
                event_trampoline,
                token as *mut c_void,
            )
        };
        if rc != 0 {
            // The engine never saw the token; roll the registration back.
            events.remove(id);
            drop(unsafe { Box::from_raw(token) });
            return Err(instance
                .lib()
                .err_or(VlcError::Playback(format!("could not attach {:?}", event))));
        }

        Ok(id)
    }

    /// Unregisters subscriptions. Missing identifiers are skipped. Each
    /// found entry leaves the registry before the native detach, so a late
    /// in-flight dispatch cannot observe a half-removed entry.
    pub fn detach(&self, ids: &[EventId]) {
        let instance = &self.player.instance;

        for &id in ids {
            let Some(ctx) = instance.events().remove(id) else {
                continue;
            };

            unsafe {
                (instance.lib().event_detach)(
                    self.handle,
                    ctx.event as ffi::libvlc_event_type_t,
                    event_trampoline,
                    ctx.token as *mut c_void,
                );
                // No dispatch can hold this token once the native detach has
                // returned.
                drop(Box::from_raw(ctx.token as *mut Subscription));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::stub;
    use parking_lot::Mutex;

    fn noop_callback() -> EventCallback {
        Arc::new(|_event, _user_data| {})
    }

    #[test]
    fn test_fresh_player_has_no_media() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();

        // No media, no error.
        assert!(player.media().unwrap().is_none());
    }

    #[test]
    fn test_double_release_is_noop() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let handle = player.raw().unwrap() as usize;

        player.release().unwrap();
        player.release().unwrap();
        drop(player);

        assert_eq!(stub::player_release_count(handle), 1);
    }

    #[test]
    fn test_released_player_fails_fast_but_queries_degrade() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        player.release().unwrap();

        assert!(matches!(
            player.set_mute(true),
            Err(VlcError::PlayerNotInitialized)
        ));
        assert!(matches!(
            player.event_manager().err(),
            Some(VlcError::PlayerNotInitialized)
        ));
        // A query, not an action: degrades to false.
        assert!(!player.is_playing());
    }

    #[test]
    fn test_play_is_idempotent_while_playing() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let handle = player.raw().unwrap() as usize;

        player.play().unwrap();
        player.play().unwrap();
        assert_eq!(stub::play_call_count(handle), 1);

        player.stop().unwrap();
        player.play().unwrap();
        assert_eq!(stub::play_call_count(handle), 2);
    }

    #[test]
    fn test_load_media_from_missing_path_builds_nothing() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let before = stub::last_created_media();

        let err = player
            .load_media_from_path("/missing/video.mp4")
            .err()
            .expect("must fail");
        assert!(matches!(err, VlcError::Io(_)));
        assert_eq!(stub::last_created_media(), before);
        assert!(player.media().unwrap().is_none());
    }

    #[test]
    fn test_load_media_releases_media_when_binding_fails() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        player.release().unwrap();

        // Existence check passes, native media is built, but binding to the
        // released player fails; the fresh media must not leak.
        let file = std::env::temp_dir().join(format!("vlc-bridge-bind-{}", std::process::id()));
        std::fs::write(&file, b"x").unwrap();

        let err = player.load_media_from_path(&file).err().expect("must fail");
        assert!(matches!(err, VlcError::PlayerNotInitialized));
        assert_eq!(stub::media_release_count(stub::last_created_media()), 1);

        std::fs::remove_file(&file).ok();
    }

    #[test]
    fn test_media_returns_bound_media() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let media = Media::from_location(&instance, "file:///tmp/a.mp4").unwrap();

        player.set_media(&media).unwrap();

        let current = player.media().unwrap().expect("media must be bound");
        assert_eq!(current.raw().unwrap(), media.raw().unwrap());
    }

    #[test]
    fn test_attach_registers_and_detach_unregisters() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let manager = player.event_manager().unwrap();

        let id = manager
            .attach(Event::EndReached, noop_callback(), None)
            .unwrap();
        let token = instance.events().get(id).unwrap().token;
        assert!(stub::token_attached(token));

        manager.detach(&[id]);
        assert!(!stub::token_attached(token));
        assert!(instance.events().get(id).is_none());

        // Detaching an unknown id is skipped silently.
        manager.detach(&[id, EventId(0)]);
    }

    #[test]
    fn test_attach_without_callback_allocates_nothing() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let manager = player.event_manager().unwrap();

        let err = manager
            .attach_callbacks(Event::EndReached, None, None, None)
            .err()
            .expect("must fail");
        assert!(matches!(err, VlcError::InvalidEventCallback));
        assert_eq!(instance.events().len(), 0);
    }

    #[test]
    fn test_attach_rolls_back_on_native_failure() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let manager = player.event_manager().unwrap();

        stub::fail_next_attach();
        let err = manager
            .attach(Event::EndReached, noop_callback(), None)
            .err()
            .expect("must fail");
        assert!(matches!(err, VlcError::Playback(_)));
        assert_eq!(instance.events().len(), 0);
    }

    #[test]
    fn test_dispatch_through_trampoline_end_to_end() {
        let instance = Instance::new_stub();
        let player = Player::new(&instance).unwrap();
        let manager = player.event_manager().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let callback: EventCallback = Arc::new(move |event, _user_data| {
            seen_cb.lock().push(event);
        });

        let id = manager.attach(Event::EndReached, callback, None).unwrap();
        let token = instance.events().get(id).unwrap().token;

        // Simulate the engine firing the event with the attached token.
        unsafe { event_trampoline(std::ptr::null(), token as *mut c_void) };
        assert_eq!(seen.lock().as_slice(), &[Event::EndReached]);

        manager.detach(&[id]);
        // A dispatch for a detached id finds nothing. The token is freed at
        // this point, which is exactly why the engine must never fire it
        // after detach; use a fresh subscription to prove the id is gone.
        instance.events().dispatch(id, std::ptr::null());
        assert_eq!(seen.lock().len(), 1);
    }
}
