//! Disk space accounting
//!
//! Two probes feed a volume's [`SpaceSnapshot`]:
//! - the free-space probe asks the filesystem how many bytes are usable
//!   under the index and store directories
//! - the used-space probe walks both trees and sums file sizes
//!
//! Probes never fail outwardly. A missing directory leaves the snapshot
//! untouched, a failing query is reported to the caller as [`FreeSpace::Failed`]
//! so the volume can suspend checking.

use crate::common::{EntryKind, Error, Filesystem};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

/// Free space assumed before the first measurement
pub const UNMEASURED_FREE_SPACE: u64 = u64::MAX;

/// Last committed space measurements of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpaceSnapshot {
    pub free_index_space: u64,
    pub free_archive_space: u64,
    pub used_index_space: u64,
    pub used_archive_space: u64,
    /// False while probing is disabled or the last probe failed
    pub disk_space_checking: bool,
    /// True once a full refresh has completed
    pub space_check_performed: bool,
}

impl SpaceSnapshot {
    pub fn new(disk_space_checking: bool) -> Self {
        Self {
            free_index_space: UNMEASURED_FREE_SPACE,
            free_archive_space: UNMEASURED_FREE_SPACE,
            used_index_space: 0,
            used_archive_space: 0,
            disk_space_checking,
            space_check_performed: false,
        }
    }

    /// Bytes consumed across both directories
    pub fn used_space(&self) -> u64 {
        self.used_index_space.saturating_add(self.used_archive_space)
    }
}

impl Default for SpaceSnapshot {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Outcome of a free-space probe
#[derive(Debug)]
pub enum FreeSpace {
    Measured { index: u64, archive: u64 },
    /// One of the directories does not exist yet
    NotReady,
    Failed(Error),
}

/// Query usable bytes on the filesystems holding both directories
pub fn probe_free_space(fs: &dyn Filesystem, index_path: &Path, archive_path: &Path) -> FreeSpace {
    if !fs.exists(index_path) {
        tracing::debug!(
            "cannot determine disk space (index path does not exist): {}",
            index_path.display()
        );
        return FreeSpace::NotReady;
    }
    if !fs.exists(archive_path) {
        tracing::debug!(
            "cannot determine disk space (store path does not exist): {}",
            archive_path.display()
        );
        return FreeSpace::NotReady;
    }

    let query = |path: &Path| {
        fs.available_space(path).map_err(|source| Error::Probe {
            path: path.to_path_buf(),
            source,
        })
    };

    match query(index_path).and_then(|index| Ok((index, query(archive_path)?))) {
        Ok((index, archive)) => FreeSpace::Measured { index, archive },
        Err(e) => FreeSpace::Failed(e),
    }
}

/// Recursive size of a file or directory tree.
///
/// Returns `None` when any directory in the tree cannot be listed: the total
/// is then unknown rather than an undercount. Entries that vanish between
/// listing and inspection contribute nothing. Symbolic links are not followed.
pub fn tree_size(fs: &dyn Filesystem, path: &Path) -> Option<u64> {
    match fs.entry_kind(path) {
        Ok(EntryKind::File { len }) => Some(len),
        Ok(EntryKind::Other) => Some(0),
        Ok(EntryKind::Directory) => {
            let entries = match fs.list_dir(path) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("cannot list {}: {}", path.display(), e);
                    return None;
                }
            };
            entries.iter().try_fold(0u64, |total, entry| {
                Some(total.saturating_add(tree_size(fs, entry)?))
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Some(0),
        Err(e) => {
            tracing::debug!("cannot inspect {}: {}", path.display(), e);
            None
        }
    }
}

/// Bytes consumed under each directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedSpace {
    pub index: u64,
    pub archive: u64,
}

/// Sum file sizes under both directories.
///
/// A tree whose size is unknown is recorded as 0 for this probe and logged.
pub fn probe_used_space(fs: &dyn Filesystem, index_path: &Path, archive_path: &Path) -> UsedSpace {
    let measure = |path: &Path| {
        tree_size(fs, path).unwrap_or_else(|| {
            tracing::warn!(
                "used space under {} is unknown (unreadable directory); recording 0",
                path.display()
            );
            0
        })
    };

    UsedSpace {
        archive: measure(archive_path),
        index: measure(index_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MemFs;

    fn sample_tree() -> MemFs {
        let fs = MemFs::new();
        fs.add_file("/vol/store/2024/01/a.blob", 100);
        fs.add_file("/vol/store/2024/02/b.blob", 250);
        fs.add_file("/vol/store/c.blob", 50);
        fs.add_file("/vol/index/segments_1", 30);
        fs
    }

    #[test]
    fn test_tree_size() {
        let fs = sample_tree();
        assert_eq!(tree_size(&fs, Path::new("/vol/store")), Some(400));
        assert_eq!(tree_size(&fs, Path::new("/vol/store/2024")), Some(350));
        assert_eq!(tree_size(&fs, Path::new("/vol/store/c.blob")), Some(50));
        assert_eq!(tree_size(&fs, Path::new("/vol/missing")), Some(0));
    }

    #[test]
    fn test_unreadable_subtree_is_unknown() {
        let fs = sample_tree();
        fs.deny_listing("/vol/store/2024/02");

        // Unknown propagates through every ancestor
        assert_eq!(tree_size(&fs, Path::new("/vol/store/2024/02")), None);
        assert_eq!(tree_size(&fs, Path::new("/vol/store/2024")), None);
        assert_eq!(tree_size(&fs, Path::new("/vol/store")), None);
        // Siblings are unaffected
        assert_eq!(tree_size(&fs, Path::new("/vol/store/2024/01")), Some(100));

        // At the top level unknown degrades to 0
        let used = probe_used_space(&fs, Path::new("/vol/index"), Path::new("/vol/store"));
        assert_eq!(used, UsedSpace { index: 30, archive: 0 });
    }

    #[test]
    fn test_free_space_not_ready() {
        let fs = MemFs::new();
        fs.add_dir("/vol/index");
        let outcome = probe_free_space(&fs, Path::new("/vol/index"), Path::new("/vol/store"));
        assert!(matches!(outcome, FreeSpace::NotReady));

        let outcome = probe_free_space(&fs, Path::new("/vol/other"), Path::new("/vol/index"));
        assert!(matches!(outcome, FreeSpace::NotReady));
    }

    #[test]
    fn test_free_space_measured_and_failed() {
        let fs = sample_tree();
        fs.set_free("/vol/index", 1000);
        fs.set_free("/vol/store", 2000);
        let outcome = probe_free_space(&fs, Path::new("/vol/index"), Path::new("/vol/store"));
        assert!(matches!(
            outcome,
            FreeSpace::Measured {
                index: 1000,
                archive: 2000
            }
        ));

        fs.fail_free("/vol/store");
        let outcome = probe_free_space(&fs, Path::new("/vol/index"), Path::new("/vol/store"));
        match outcome {
            FreeSpace::Failed(Error::Probe { path, .. }) => {
                assert_eq!(path, Path::new("/vol/store"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot = SpaceSnapshot::new(true);
        assert_eq!(snapshot.free_index_space, UNMEASURED_FREE_SPACE);
        assert_eq!(snapshot.free_archive_space, UNMEASURED_FREE_SPACE);
        assert_eq!(snapshot.used_space(), 0);
        assert!(!snapshot.space_check_performed);
    }
}
