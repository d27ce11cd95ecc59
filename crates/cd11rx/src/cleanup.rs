//! Best-effort file removal

use std::fs;
use std::io;
use std::path::Path;

use log::warn;

/// Delete `path`, logging any failure
///
/// Returns true if the file is gone, including when it never
/// existed.
pub(crate) fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            warn!("unable to delete \"{}\": {}", path.display(), err);
            false
        }
    }
}

/// Deletes a file when dropped, even on unwind
pub(crate) struct RemoveOnDrop<'a>(pub(crate) &'a Path);

impl<'a> Drop for RemoveOnDrop<'a> {
    fn drop(&mut self) {
        remove_quietly(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, "{}").unwrap();

        assert!(remove_quietly(&path));
        assert!(!path.exists());
        assert!(remove_quietly(&path));

        // directories are not files
        assert!(!remove_quietly(dir.path()));
        assert!(dir.path().exists());
    }

    #[test]
    fn test_remove_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, "{}").unwrap();

        {
            let _guard = RemoveOnDrop(&path);
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
