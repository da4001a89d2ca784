//! Archive collaborator contract.
//!
//! The core never opens raw file handles while operating inside a container:
//! S3D/EQG archives, loose directories, and test fixtures all present the
//! same named-byte-blob surface. Container internals (compression, directory
//! layout) live behind this trait and are out of scope here.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Named byte-blob store the codecs read from and write into.
pub trait Archive {
    /// Fetch the contents of a named file.
    fn file(&self, name: &str) -> Result<Vec<u8>>;

    /// Store (or replace) a named file.
    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Names of all contained files.
    fn file_names(&self) -> Vec<String>;

    /// Whether a named file exists.
    fn contains(&self, name: &str) -> bool {
        self.file(name).is_ok()
    }
}

/// Directory-backed archive. File names map directly to paths under the
/// root; nested names like `"textures/wall.bmp"` create subdirectories.
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    /// Open an existing directory, or create it (and parents) if absent.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }
}

impl Archive for DirArchive {
    fn file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(Error::FileNotFound(name.to_string()));
        }
        Ok(fs::read(path)?)
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }

    fn file_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.root) {
                    names.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        names.sort();
        names
    }

    fn contains(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }
}

/// In-memory archive, used by tests and by callers that own the container
/// format themselves and only want the conversion core.
#[derive(Debug, Default, Clone)]
pub struct MemArchive {
    files: IndexMap<String, Vec<u8>>,
}

impl MemArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Archive for MemArchive {
    fn file(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(name.to_string()))
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn file_names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_archive_round_trip() {
        let mut arc = MemArchive::new();
        arc.write_file("a.wce", b"hello").unwrap();
        assert_eq!(arc.file("a.wce").unwrap(), b"hello");
        assert!(arc.contains("a.wce"));
        assert!(matches!(arc.file("b.wce"), Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_dir_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut arc = DirArchive::new(dir.path()).unwrap();
        arc.write_file("sub/x.wld", &[1, 2, 3]).unwrap();
        assert_eq!(arc.file("sub/x.wld").unwrap(), vec![1, 2, 3]);
        assert_eq!(arc.file_names(), vec!["sub/x.wld".to_string()]);
    }
}
