// Safe bridge over a dynamically loaded libVLC engine
//
// Turns the engine's callback-driven, reference-counted C API into wrappers
// with explicit lifetimes: one Instance per engine, Players and Media that
// fail fast after release, an event registry that resolves native callback
// tokens back to managed subscriptions, and an object registry for userdata
// shared with native code. Decoding and rendering are entirely inside the
// engine; only the calls the bridge issues are modelled here.

pub mod error;
pub mod events;
pub(crate) mod ffi;
pub mod instance;
pub mod media;
pub mod objects;
pub mod playback;
pub mod player;
pub mod playlist;

// Re-exports
pub use error::{Result, VlcError};
pub use events::{Event, EventCallback, EventId, EventUserData};
pub use instance::Instance;
pub use media::Media;
pub use playback::{MediaSource, PlaybackSession, Scheduler};
pub use player::{EventManager, Player};
pub use playlist::DirectoryMediaSource;

/// Initialize logging for hosts that do not install their own logger.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
