// Screensaver playback session
//
// Wires a player to a media source: pick a file, render it into the given
// window, and when the engine reports end of stream pick the next one.
// End-of-stream callbacks arrive on an engine-owned thread, so the next-pick
// work is always handed to the caller-supplied scheduler instead of touching
// the player inline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::events::{Event, EventCallback, EventId};
use crate::instance::Instance;
use crate::player::Player;

/// Marshals work onto the thread that owns the player.
///
/// The bridge never re-enters the player/media API from the engine's event
/// context; implementations typically post to the UI message loop.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, task: Box<dyn FnOnce() + Send>);
}

/// Yields the next media file to play.
pub trait MediaSource: Send + Sync {
    fn next_media(&self) -> Result<PathBuf>;
}

/// One fullscreen playback loop: a muted player bound to a window, fed from
/// a media source until the session is shut down.
pub struct PlaybackSession {
    player: Arc<Player>,
    end_reached: EventId,
}

impl PlaybackSession {
    /// Creates a player bound to `hwnd`, starts the first media and arranges
    /// for the next pick on every end-of-stream.
    pub fn start(
        instance: &Arc<Instance>,
        hwnd: usize,
        source: Arc<dyn MediaSource>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<PlaybackSession> {
        log::info!("Creating and initialising playback session");

        let player = Arc::new(Player::new(instance)?);
        player.set_hwnd(hwnd)?;
        player.set_key_input(false)?;
        player.set_mouse_input(false)?;

        // Not every engine build carries the dummy output; playback works
        // without it, so log and move on.
        if let Err(err) = player.set_audio_output("adummy") {
            log::warn!("Audio output selection failed: {}", err);
        }
        player.set_mute(true)?;

        let first = source.next_media()?;
        player.load_media_from_path(&first)?;

        let weak = Arc::downgrade(&player);
        let callback: EventCallback = Arc::new(move |_event, _user_data| {
            // Engine event context: not safe for player reentry. Defer the
            // next pick to the owning thread.
            let weak = weak.clone();
            let source = source.clone();
            scheduler.schedule(Box::new(move || {
                let Some(player) = weak.upgrade() else {
                    return;
                };
                match source.next_media() {
                    Ok(path) => {
                        log::info!("End of stream, playing next: {}", path.display());
                        if let Err(err) = player
                            .load_media_from_path(&path)
                            .and_then(|_| player.play())
                        {
                            log::error!("Could not start next media: {}", err);
                        }
                    }
                    Err(err) => log::error!("No next media available: {}", err),
                }
            }));
        });

        let end_reached = player
            .event_manager()?
            .attach(Event::EndReached, callback, None)?;

        player.play()?;
        log::info!("Playback session started");

        Ok(PlaybackSession {
            player,
            end_reached,
        })
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Tears the session down: detach the end-of-stream subscription,
    /// release the current media, stop and release the player. Safe to call
    /// more than once.
    pub fn shutdown(&self) {
        if let Ok(manager) = self.player.event_manager() {
            manager.detach(&[self.end_reached]);
        }

        if let Ok(Some(media)) = self.player.media() {
            let _ = media.release();
        }

        let _ = self.player.stop();
        let _ = self.player.release();
    }
}
