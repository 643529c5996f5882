// Error handling for the libVLC bridge

use std::fmt;

/// Bridge error types
#[derive(Debug, Clone)]
pub enum VlcError {
    /// The module-wide engine instance was used before init or after release
    ModuleNotInitialized,

    /// The engine refused to construct an instance
    ModuleInitialize,

    /// The native shared library could not be located or loaded
    LibraryLoad(String),

    /// Player used before creation or after release
    PlayerNotInitialized,

    /// The engine refused to construct a player
    PlayerCreate,

    /// Media used before creation or after release
    MediaNotInitialized,

    /// The engine refused to construct a media object
    MediaCreate,

    /// The player has no native event manager
    MissingEventManager,

    /// Attach called with no callback at all
    InvalidEventCallback,

    /// The selected audio output backend was rejected
    AudioOutputSet,

    /// Playback command failure with no engine detail available
    Playback(String),

    /// Failure detail reported by the engine's last-error channel
    Native(String),

    /// IO error
    Io(String),
}

impl fmt::Display for VlcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VlcError::ModuleNotInitialized => write!(f, "module not initialized"),
            VlcError::ModuleInitialize => write!(f, "could not initialize module"),
            VlcError::LibraryLoad(msg) => write!(f, "could not load shared library: {}", msg),
            VlcError::PlayerNotInitialized => write!(f, "player not initialized"),
            VlcError::PlayerCreate => write!(f, "could not create player"),
            VlcError::MediaNotInitialized => write!(f, "media not initialized"),
            VlcError::MediaCreate => write!(f, "could not create media"),
            VlcError::MissingEventManager => write!(f, "player has no event manager"),
            VlcError::InvalidEventCallback => write!(f, "no event callback supplied"),
            VlcError::AudioOutputSet => write!(f, "could not set audio output"),
            VlcError::Playback(msg) => write!(f, "playback error: {}", msg),
            VlcError::Native(msg) => write!(f, "engine error: {}", msg),
            VlcError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for VlcError {}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, VlcError>;

impl From<std::io::Error> for VlcError {
    fn from(err: std::io::Error) -> Self {
        VlcError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            VlcError::ModuleNotInitialized.to_string(),
            "module not initialized"
        );
        assert_eq!(
            VlcError::LibraryLoad("no such file".to_string()).to_string(),
            "could not load shared library: no such file"
        );
        assert_eq!(
            VlcError::Native("main libvlc error".to_string()).to_string(),
            "engine error: main libvlc error"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VlcError = io.into();
        assert!(matches!(err, VlcError::Io(_)));
    }
}
