// Media wrapper
//
// Wraps one native media handle. Releasing a media walks its userdata
// reference chain before the native release, so anything registered on its
// behalf in the object registry is dropped exactly once. After release the
// wrapper is inert: the handle is null and every operation fails fast.

use std::any::Any;
use std::ffi::CString;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use crate::error::{Result, VlcError};
use crate::ffi;
use crate::instance::Instance;
use crate::objects::ObjectId;

/// Managed data associated with a media through the object registry.
pub(crate) struct MediaData {
    /// Token of a chained reader object, decremented alongside this entry.
    pub reader_id: ObjectId,
    pub user_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct Media {
    instance: Arc<Instance>,
    handle: AtomicPtr<ffi::libvlc_media_t>,
}

impl Media {
    /// Creates a media for a local file. The path is existence-checked
    /// before any native object is constructed.
    pub fn from_path(instance: &Arc<Instance>, path: impl AsRef<Path>) -> Result<Media> {
        let path = path.as_ref();
        std::fs::metadata(path)?;

        Media::create(instance, &path.to_string_lossy(), true)
    }

    /// Creates a media for a location string (URL or MRL). The location is
    /// not checked.
    pub fn from_location(instance: &Arc<Instance>, location: &str) -> Result<Media> {
        Media::create(instance, location, false)
    }

    fn create(instance: &Arc<Instance>, target: &str, local: bool) -> Result<Media> {
        let c_target = CString::new(target).map_err(|_| VlcError::MediaCreate)?;
        let lib = instance.lib();

        let handle = unsafe {
            if local {
                (lib.media_new_path)(instance.handle(), c_target.as_ptr())
            } else {
                (lib.media_new_location)(instance.handle(), c_target.as_ptr())
            }
        };
        if handle.is_null() {
            return Err(lib.err_or(VlcError::MediaCreate));
        }

        Ok(Media {
            instance: instance.clone(),
            handle: AtomicPtr::new(handle),
        })
    }

    /// Wraps an already-referenced native handle (see `Player::media`).
    pub(crate) fn from_handle(instance: &Arc<Instance>, handle: *mut ffi::libvlc_media_t) -> Media {
        Media {
            instance: instance.clone(),
            handle: AtomicPtr::new(handle),
        }
    }

    pub(crate) fn raw(&self) -> Result<*mut ffi::libvlc_media_t> {
        let handle = self.handle.load(Ordering::Acquire);
        if handle.is_null() {
            Err(VlcError::MediaNotInitialized)
        } else {
            Ok(handle)
        }
    }

    /// Associates managed user data with this media. The data is parked in
    /// the instance's object registry; releasing the media releases it.
    pub fn set_user_data(&self, user_data: Arc<dyn Any + Send + Sync>) -> Result<()> {
        self.set_media_data(MediaData {
            reader_id: ObjectId::NONE,
            user_data: Some(user_data),
        })
    }

    pub(crate) fn set_media_data(&self, data: MediaData) -> Result<()> {
        let handle = self.raw()?;

        // Tear down any previous association before overwriting the slot.
        self.delete_user_data(handle);

        let id = self.instance.objects().insert(Arc::new(data));
        unsafe { (self.instance.lib().media_set_user_data)(handle, id.as_token()) };
        Ok(())
    }

    /// Managed user data previously associated with this media, if any.
    pub fn user_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        let handle = self.handle.load(Ordering::Acquire);
        if handle.is_null() {
            return None;
        }

        let (_, data) = self.media_data(handle)?;
        data.user_data.clone()
    }

    fn media_data(&self, handle: *mut ffi::libvlc_media_t) -> Option<(ObjectId, Arc<MediaData>)> {
        let token = unsafe { (self.instance.lib().media_get_user_data)(handle) };
        let id = ObjectId::from_token(token);

        let data = self.instance.objects().get(id)?;
        let data = data.downcast::<MediaData>().ok()?;
        Some((id, data))
    }

    // Walks the media's strong-reference edges: the chained reader token
    // first, then the media-data entry itself.
    fn delete_user_data(&self, handle: *mut ffi::libvlc_media_t) {
        let Some((id, data)) = self.media_data(handle) else {
            return;
        };

        let objects = self.instance.objects();
        objects.dec_refs(data.reader_id);
        objects.dec_refs(id);
    }

    /// Releases the native media. Double release is a no-op; the wrapper is
    /// inert afterwards.
    pub fn release(&self) -> Result<()> {
        let handle = self.handle.swap(ptr::null_mut(), Ordering::AcqRel);
        if handle.is_null() {
            return Ok(());
        }

        self.delete_user_data(handle);
        unsafe { (self.instance.lib().media_release)(handle) };
        self.instance.lib().check()
    }
}

// No Drop: a wrapper returned by `Player::media` aliases the player's own
// native reference, so automatic release would double-free. Release is
// explicit and idempotent instead.
