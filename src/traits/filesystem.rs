use anyhow::{Context, Result};
#[cfg(test)]
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::RwLock;

/// Filesystem access used for seeds, layer snapshots, exports and plans.
///
/// Kept behind a trait so commands can run against an in-memory store in tests.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Writes `contents`, creating missing parent directories first
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// Direct children of `path`, sorted
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Backed by `std::fs`
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }

        std::fs::write(path, contents).with_context(|| format!("Cannot write {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Cannot create {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Cannot list {}", path.display()))?;

        let mut paths = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("Cannot list {}", path.display()))?;
        paths.sort();
        Ok(paths)
    }
}

/// Files and directories held in memory; paths are compared verbatim
#[cfg(test)]
#[derive(Default)]
pub struct MockFileSystem {
    files: RwLock<BTreeMap<PathBuf, String>>,
    directories: RwLock<BTreeSet<PathBuf>>,
}

#[cfg(test)]
impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_file_contents(&self, path: &Path) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }
}

#[cfg(test)]
impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .with_context(|| format!("No such file: {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }

        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut directories = self.directories.write().unwrap();
        let mut current = Some(path);
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            directories.insert(dir.to_path_buf());
            current = dir.parent();
        }

        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
            || self.directories.read().unwrap().contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.read().unwrap();
        let directories = self.directories.read().unwrap();

        let mut entries: Vec<PathBuf> = files
            .keys()
            .chain(directories.iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();

        entries.sort();
        entries.dedup();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_write_creates_parents() {
        let fs = MockFileSystem::new();
        let path = Path::new("/state/graph/source.json");

        fs.write(path, "{}").unwrap();

        assert!(fs.exists(Path::new("/state/graph")));
        assert!(fs.is_file(path));
        assert_eq!(fs.read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn test_mock_read_dir_lists_direct_children_only() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("/archive/a.json"), "a").unwrap();
        fs.write(Path::new("/archive/b.json"), "b").unwrap();
        fs.write(Path::new("/archive/nested/c.json"), "c").unwrap();

        let entries = fs.read_dir(Path::new("/archive")).unwrap();

        assert_eq!(
            entries,
            vec![
                PathBuf::from("/archive/a.json"),
                PathBuf::from("/archive/b.json"),
                PathBuf::from("/archive/nested"),
            ]
        );
    }

    #[test]
    fn test_real_filesystem_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds").join("tenant.seed");
        let fs = RealFileSystem;

        fs.write(&path, "abcd").unwrap();

        assert!(fs.is_file(&path));
        assert_eq!(fs.read_to_string(&path).unwrap(), "abcd");
        assert_eq!(fs.read_dir(&dir.path().join("seeds")).unwrap(), vec![path]);
    }
}
