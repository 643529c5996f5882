// Raw FFI surface of the dynamically loaded libVLC engine
//
// The engine is not linked at build time; the shared library is resolved at
// runtime from a caller-supplied search path so it need not be installed
// system-wide. Symbols are resolved eagerly at load time and the Library
// handle is kept alive next to the fn pointers so they stay valid.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::path::Path;

use libloading::Library;

use crate::error::{Result, VlcError};

macro_rules! opaque_types {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque_types!(
    libvlc_instance_t,
    libvlc_media_player_t,
    libvlc_media_t,
    libvlc_event_manager_t,
    libvlc_event_t,
);

/// One node of the engine's audio output backend list.
#[repr(C)]
pub struct libvlc_audio_output_t {
    pub psz_name: *mut c_char,
    pub psz_description: *mut c_char,
    pub p_next: *mut libvlc_audio_output_t,
}

pub type libvlc_event_type_t = c_int;

/// Signature of the trampoline the engine invokes with (event, token).
pub type libvlc_callback_t = unsafe extern "C" fn(*const libvlc_event_t, *mut c_void);

#[cfg(target_os = "windows")]
const LIBRARY_FILE: &str = "libvlc.dll";
#[cfg(target_os = "macos")]
const LIBRARY_FILE: &str = "libvlc.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LIBRARY_FILE: &str = "libvlc.so";

// Declares the symbol table struct and its loader in one place, mirroring
// the engine's exported names (each field resolves "libvlc_<field>").
macro_rules! libvlc_symbols {
    ($(fn $field:ident($($arg:ty),* $(,)?) $(-> $ret:ty)?;)*) => {
        /// Resolved entry points of one loaded engine library.
        pub(crate) struct LibVlc {
            _lib: Option<Library>,
            $(pub $field: unsafe extern "C" fn($($arg),*) $(-> $ret)?,)*
        }

        impl LibVlc {
            fn resolve(lib: Library) -> std::result::Result<LibVlc, libloading::Error> {
                unsafe {
                    $(
                        let $field = *lib.get::<unsafe extern "C" fn($($arg),*) $(-> $ret)?>(
                            concat!("libvlc_", stringify!($field), "\0").as_bytes(),
                        )?;
                    )*
                    Ok(LibVlc {
                        _lib: Some(lib),
                        $($field,)*
                    })
                }
            }
        }

        #[cfg(test)]
        impl LibVlc {
            /// Builds a table backed by the in-process stub engine.
            pub(crate) fn stub() -> LibVlc {
                LibVlc {
                    _lib: None,
                    $($field: stub::$field,)*
                }
            }
        }
    };
}

libvlc_symbols! {
    fn new(c_int, *const *const c_char) -> *mut libvlc_instance_t;
    fn release(*mut libvlc_instance_t);
    fn errmsg() -> *const c_char;
    fn clearerr();
    fn media_new_path(*mut libvlc_instance_t, *const c_char) -> *mut libvlc_media_t;
    fn media_new_location(*mut libvlc_instance_t, *const c_char) -> *mut libvlc_media_t;
    fn media_release(*mut libvlc_media_t);
    fn media_get_user_data(*mut libvlc_media_t) -> *mut c_void;
    fn media_set_user_data(*mut libvlc_media_t, *mut c_void);
    fn media_player_new(*mut libvlc_instance_t) -> *mut libvlc_media_player_t;
    fn media_player_release(*mut libvlc_media_player_t);
    fn media_player_set_media(*mut libvlc_media_player_t, *mut libvlc_media_t);
    fn media_player_get_media(*mut libvlc_media_player_t) -> *mut libvlc_media_t;
    fn media_player_play(*mut libvlc_media_player_t) -> c_int;
    fn media_player_stop(*mut libvlc_media_player_t);
    fn media_player_is_playing(*mut libvlc_media_player_t) -> c_int;
    fn media_player_set_hwnd(*mut libvlc_media_player_t, *mut c_void);
    fn media_player_event_manager(*mut libvlc_media_player_t) -> *mut libvlc_event_manager_t;
    fn video_set_key_input(*mut libvlc_media_player_t, c_uint);
    fn video_set_mouse_input(*mut libvlc_media_player_t, c_uint);
    fn audio_set_mute(*mut libvlc_media_player_t, c_int);
    fn audio_output_set(*mut libvlc_media_player_t, *const c_char) -> c_int;
    fn audio_output_list_get(*mut libvlc_instance_t) -> *mut libvlc_audio_output_t;
    fn audio_output_list_release(*mut libvlc_audio_output_t);
    fn event_attach(
        *mut libvlc_event_manager_t,
        libvlc_event_type_t,
        libvlc_callback_t,
        *mut c_void,
    ) -> c_int;
    fn event_detach(
        *mut libvlc_event_manager_t,
        libvlc_event_type_t,
        libvlc_callback_t,
        *mut c_void,
    );
}

impl LibVlc {
    /// Loads the engine's shared library from `search_path` and resolves the
    /// full symbol table. Any failure is a LibraryLoad error; there is no
    /// retry or fallback search.
    pub fn open(search_path: &Path) -> Result<LibVlc> {
        let path = search_path.join(LIBRARY_FILE);
        log::debug!("Loading engine library from {}", path.display());

        let lib = unsafe { Library::new(&path) }
            .map_err(|err| VlcError::LibraryLoad(format!("{}: {}", path.display(), err)))?;

        LibVlc::resolve(lib).map_err(|err| VlcError::LibraryLoad(err.to_string()))
    }

    /// Reads and clears the engine's advisory last-error channel.
    pub fn last_error(&self) -> Option<VlcError> {
        let msg = unsafe { (self.errmsg)() };
        if msg.is_null() {
            return None;
        }

        let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
        unsafe { (self.clearerr)() };
        Some(VlcError::Native(text))
    }

    /// The last-error message if one is pending, otherwise `default`.
    pub fn err_or(&self, default: VlcError) -> VlcError {
        self.last_error().unwrap_or(default)
    }

    /// Ok when the engine left no message after a call that cannot signal
    /// failure through its return value.
    pub fn check(&self) -> Result<()> {
        match self.last_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
