//! Manifest discovery and consumption
//!
//! A manifest is a small text file which lists, one per line, the
//! names of data files that a transfer agent will deliver into the
//! same directory. Manifests are consumed destructively: every
//! manifest is deleted once it has been read, even if reading it
//! failed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::cleanup::remove_quietly;

/// Default file name suffix for manifests
pub const DEFAULT_MANIFEST_SUFFIX: &str = ".inv";

/// Result of scanning a directory for manifests
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestScan {
    /// Manifests found, whether or not they could be read
    pub manifests: usize,

    /// File names announced by all manifests, in order
    pub names: Vec<String>,
}

/// Finds and consumes manifests
///
/// ```
/// use cd11rx::ManifestReader;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("batch1.inv"), "a.json\n\n  b.json  \n").unwrap();
///
/// let scan = ManifestReader::default().scan(dir.path()).unwrap();
/// assert_eq!(1, scan.manifests);
/// assert_eq!(vec!["a.json", "b.json"], scan.names);
/// assert!(!dir.path().join("batch1.inv").exists());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestReader {
    suffix: String,
}

impl ManifestReader {
    /// Reader for manifests whose names end with `suffix`
    pub fn new<S>(suffix: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Manifest file name suffix
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Read and delete every manifest in `dir`
    ///
    /// Manifests are processed in file name order. A manifest which
    /// cannot be read is logged and contributes no names. Every
    /// manifest found is deleted afterward; failure to delete is
    /// logged only.
    ///
    /// Fails only if `dir` itself cannot be listed.
    pub fn scan<P>(&self, dir: P) -> io::Result<ManifestScan>
    where
        P: AsRef<Path>,
    {
        let manifests = self.list(dir.as_ref())?;

        let mut out = ManifestScan {
            manifests: manifests.len(),
            names: Vec::new(),
        };

        for path in &manifests {
            match read_manifest(path) {
                Ok(names) => {
                    debug!(
                        "manifest \"{}\": announces {} file(s)",
                        path.display(),
                        names.len()
                    );
                    out.names.extend(names);
                }
                Err(err) => error!("unable to read manifest \"{}\": {}", path.display(), err),
            }

            remove_quietly(path);
        }

        Ok(out)
    }

    // Paths of regular files in `dir` with our suffix, sorted
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_manifest = entry
                .file_name()
                .to_str()
                .map(|name| name.ends_with(self.suffix.as_str()))
                .unwrap_or(false);
            if is_manifest && entry.file_type()?.is_file() {
                out.push(entry.path());
            }
        }
        out.sort_unstable();
        Ok(out)
    }
}

impl Default for ManifestReader {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_SUFFIX)
    }
}

// Non-empty, trimmed lines of the manifest at `path`
fn read_manifest(path: &Path) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_manifest(&text))
}

fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        assert!(parse_manifest("").is_empty());
        assert!(parse_manifest("\n \n\t\n").is_empty());
        assert_eq!(
            vec!["a.json", "b.json", "c d.json"],
            parse_manifest("a.json\r\n  b.json\t\n\nc d.json")
        );
    }

    #[test]
    fn test_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2.inv"), "c.json\n").unwrap();
        fs::write(dir.path().join("1.inv"), "a.json\nb.json\n").unwrap();
        fs::write(dir.path().join("empty.inv"), "").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x.json").unwrap();

        let scan = ManifestReader::default().scan(dir.path()).unwrap();
        assert_eq!(3, scan.manifests);
        assert_eq!(vec!["a.json", "b.json", "c.json"], scan.names);

        // manifests consumed, data files untouched
        assert!(!dir.path().join("1.inv").exists());
        assert!(!dir.path().join("2.inv").exists());
        assert!(!dir.path().join("empty.inv").exists());
        assert!(dir.path().join("a.json").exists());
        assert!(dir.path().join("notes.txt").exists());

        let scan = ManifestReader::default().scan(dir.path()).unwrap();
        assert_eq!(ManifestScan::default(), scan);
    }

    #[test]
    fn test_custom_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.inv"), "a.json\n").unwrap();
        fs::write(dir.path().join("x.manifest"), "b.json\n").unwrap();

        let reader = ManifestReader::new(".manifest");
        assert_eq!(".manifest", reader.suffix());
        let scan = reader.scan(dir.path()).unwrap();
        assert_eq!(vec!["b.json"], scan.names);
        assert!(dir.path().join("x.inv").exists());
    }

    #[test]
    fn test_unreadable_manifest_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.inv"), [0xffu8, 0xfe, 0x00, b'\n']).unwrap();
        fs::write(dir.path().join("good.inv"), "a.json\n").unwrap();

        let scan = ManifestReader::default().scan(dir.path()).unwrap();
        assert_eq!(2, scan.manifests);
        assert_eq!(vec!["a.json"], scan.names);
        assert!(!dir.path().join("bad.inv").exists());
    }

    #[test]
    fn test_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ManifestReader::default()
            .scan(dir.path().join("nope"))
            .is_err());
    }
}
