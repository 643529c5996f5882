// Pseudo-random media selection from a directory

use std::path::PathBuf;

use rand::Rng;

use crate::error::{Result, VlcError};
use crate::playback::MediaSource;

/// Picks a uniformly random file from a directory on every request.
///
/// The directory is re-read per pick, so files added or removed while the
/// screensaver runs are picked up without a restart.
pub struct DirectoryMediaSource {
    dir: PathBuf,
}

impl DirectoryMediaSource {
    pub fn new(dir: impl Into<PathBuf>) -> DirectoryMediaSource {
        DirectoryMediaSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl MediaSource for DirectoryMediaSource {
    fn next_media(&self) -> Result<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();

        if files.is_empty() {
            return Err(VlcError::Io(format!(
                "no media files in {}",
                self.dir.display()
            )));
        }

        let index = rand::rng().random_range(0..files.len());
        let pick = files.swap_remove(index);
        log::info!("{}: playing file {}", self.dir.display(), pick.display());

        Ok(pick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;

    fn temp_media_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "vlc-bridge-playlist-{}-{}",
            tag,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_picks_only_existing_files() {
        let dir = temp_media_dir("picks");
        let names: HashSet<PathBuf> = ["a.mp4", "b.mp4", "c.mp4"]
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, b"video").unwrap();
                path
            })
            .collect();
        fs::create_dir_all(dir.join("subdir")).unwrap();

        let source = DirectoryMediaSource::new(&dir);
        for _ in 0..20 {
            let pick = source.next_media().unwrap();
            // Directories are never picked.
            assert!(names.contains(&pick), "unexpected pick {:?}", pick);
        }

        cleanup(&dir);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = temp_media_dir("empty");

        let err = DirectoryMediaSource::new(&dir)
            .next_media()
            .err()
            .expect("must fail");
        assert!(matches!(err, VlcError::Io(_)));

        cleanup(&dir);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let source = DirectoryMediaSource::new("/definitely/not/a/media/dir");
        assert!(matches!(source.next_media(), Err(VlcError::Io(_))));
    }
}
