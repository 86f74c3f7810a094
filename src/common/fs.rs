//! Filesystem abstraction used by the space probes
//!
//! Volumes never touch `std::fs` directly. Production code uses [`LocalFs`];
//! tests build a [`MemFs`] tree and inject failures into it.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// What a path refers to, without following symbolic links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File { len: u64 },
    Directory,
    /// Symlinks, sockets, devices: they occupy no accounted space
    Other,
}

/// Trait for the filesystem queries a volume needs
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// Bytes available to this process on the filesystem holding `path`
    fn available_space(&self, path: &Path) -> io::Result<u64>;
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn available_space(&self, path: &Path) -> io::Result<u64> {
        fs4::available_space(path)
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = std::fs::symlink_metadata(path)?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else if meta.is_file() {
            EntryKind::File { len: meta.len() }
        } else {
            EntryKind::Other
        };
        Ok(kind)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

#[derive(Debug, Default)]
struct MemTree {
    entries: BTreeMap<PathBuf, EntryKind>,
    unreadable: HashSet<PathBuf>,
    free: BTreeMap<PathBuf, u64>,
    failing_free: HashSet<PathBuf>,
}

/// In-memory filesystem tree
#[derive(Debug, Default)]
pub struct MemFs {
    tree: Mutex<MemTree>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> std::sync::MutexGuard<'_, MemTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a directory and any missing parents
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut tree = self.tree();
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            tree.entries
                .entry(ancestor.to_path_buf())
                .or_insert(EntryKind::Directory);
        }
    }

    /// Create (or resize) a file, creating its parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, len: u64) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.tree()
            .entries
            .insert(path.to_path_buf(), EntryKind::File { len });
    }

    /// Remove a path and everything below it
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.tree().entries.retain(|p, _| !p.starts_with(path));
    }

    /// Make listing `path` fail with a permission error
    pub fn deny_listing(&self, path: impl AsRef<Path>) {
        self.tree().unreadable.insert(path.as_ref().to_path_buf());
    }

    /// Set the free bytes reported for the filesystem holding `path`
    pub fn set_free(&self, path: impl AsRef<Path>, bytes: u64) {
        let mut tree = self.tree();
        let path = path.as_ref().to_path_buf();
        tree.failing_free.remove(&path);
        tree.free.insert(path, bytes);
    }

    /// Make free-space queries on `path` fail with an I/O error
    pub fn fail_free(&self, path: impl AsRef<Path>) {
        self.tree().failing_free.insert(path.as_ref().to_path_buf());
    }
}

impl Filesystem for MemFs {
    fn exists(&self, path: &Path) -> bool {
        self.tree().entries.contains_key(path)
    }

    fn available_space(&self, path: &Path) -> io::Result<u64> {
        let tree = self.tree();
        if tree.failing_free.contains(path) {
            return Err(io::Error::new(io::ErrorKind::Other, "statvfs failed"));
        }
        Ok(tree.free.get(path).copied().unwrap_or(u64::MAX / 2))
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        self.tree()
            .entries
            .get(path)
            .copied()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let tree = self.tree();
        if tree.unreadable.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        match tree.entries.get(path) {
            Some(EntryKind::Directory) => Ok(tree
                .entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            Some(_) => Err(io::Error::new(io::ErrorKind::Other, "not a directory")),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}
