// Engine instance lifecycle
//
// An Instance owns the dynamically loaded engine library, the native engine
// handle and the bridge registries. Players and media hold Arc clones of it,
// so the native handle cannot be destroyed while any wrapper is live. The
// process-wide slot the screensaver windows share sits on top and is
// serialized by a mutex.

use std::ffi::{c_char, c_int, CStr, CString};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::{Result, VlcError};
use crate::events::EventRegistry;
use crate::ffi::{self, LibVlc};
use crate::objects::ObjectRegistry;

/// One live engine instance with its registries.
pub struct Instance {
    lib: LibVlc,
    handle: *mut ffi::libvlc_instance_t,
    events: Arc<EventRegistry>,
    objects: ObjectRegistry,
}

// The engine instance handle may be used from any thread; player and media
// handles are the thread-affine ones. Registries are lock-guarded.
unsafe impl Send for Instance {}
unsafe impl Sync for Instance {}

impl Instance {
    /// Loads the engine's shared library from `search_path` and creates a
    /// native instance with the given startup arguments.
    pub fn new(search_path: &Path, args: &[&str]) -> Result<Arc<Instance>> {
        let lib = LibVlc::open(search_path)?;

        let cstrings = args
            .iter()
            .map(|arg| CString::new(*arg))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| VlcError::ModuleInitialize)?;
        let argv: Vec<*const c_char> = cstrings.iter().map(|arg| arg.as_ptr()).collect();

        let handle = unsafe { (lib.new)(argv.len() as c_int, argv.as_ptr()) };
        if handle.is_null() {
            return Err(lib.err_or(VlcError::ModuleInitialize));
        }

        log::info!("Engine instance created with args {:?}", args);

        Ok(Arc::new(Instance {
            lib,
            handle,
            events: Arc::new(EventRegistry::new()),
            objects: ObjectRegistry::new(),
        }))
    }

    pub(crate) fn lib(&self) -> &LibVlc {
        &self.lib
    }

    pub(crate) fn handle(&self) -> *mut ffi::libvlc_instance_t {
        self.handle
    }

    pub(crate) fn events(&self) -> &Arc<EventRegistry> {
        &self.events
    }

    pub(crate) fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    /// Names of the audio output backends compiled into this engine build.
    pub fn audio_outputs(&self) -> Vec<String> {
        let mut outputs = Vec::new();

        unsafe {
            let list = (self.lib.audio_output_list_get)(self.handle);
            let mut node = list;
            while !node.is_null() {
                outputs.push(CStr::from_ptr((*node).psz_name).to_string_lossy().into_owned());
                node = (*node).p_next;
            }
            if !list.is_null() {
                (self.lib.audio_output_list_release)(list);
            }
        }

        outputs
    }

    #[cfg(test)]
    pub(crate) fn new_stub() -> Arc<Instance> {
        let lib = LibVlc::stub();
        let handle = unsafe { (lib.new)(0, std::ptr::null()) };
        Arc::new(Instance {
            lib,
            handle,
            events: Arc::new(EventRegistry::new()),
            objects: ObjectRegistry::new(),
        })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe { (self.lib.release)(self.handle) };
        log::debug!("Engine instance released");
    }
}

static GLOBAL: Lazy<Mutex<Option<Arc<Instance>>>> = Lazy::new(|| Mutex::new(None));

/// Initializes the process-wide engine instance.
///
/// Idempotent: every screensaver window attempts this and only the first
/// call loads the engine. Lifecycle is serialized, so a racing init/release
/// pair cannot interleave.
pub fn init(search_path: &Path, args: &[&str]) -> Result<()> {
    let mut slot = GLOBAL.lock();
    if slot.is_some() {
        return Ok(());
    }

    *slot = Some(Instance::new(search_path, args)?);
    Ok(())
}

/// The process-wide instance. Fails fast when the module has not been
/// initialized or has already been released.
pub fn get() -> Result<Arc<Instance>> {
    GLOBAL.lock().clone().ok_or(VlcError::ModuleNotInitialized)
}

/// Drops the process-wide instance. No-op when never initialized. Wrappers
/// still holding an Arc keep the engine alive until they are released.
pub fn release() {
    if GLOBAL.lock().take().is_some() {
        log::info!("Module released");
    }
}
