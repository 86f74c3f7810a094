//! A single storage volume: an index directory and a store directory
//! sharing one capacity and one lifecycle.

use crate::common::{legacy_id, normalize_path, Error, Filesystem, LocalFs, Result};
use crate::volume::admission::{self, Admission, AdmissionReport, SpaceLimits};
use crate::volume::policy::DiskSpacePolicy;
use crate::volume::space::{self, FreeSpace, SpaceSnapshot, UsedSpace};
use crate::volume::status::VolumeStatus;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    status: VolumeStatus,
    modified: DateTime<Utc>,
}

/// A managed storage volume.
///
/// All methods take `&self`; a volume is meant to be shared behind an `Arc`.
/// Space refreshes are serialized per volume, status changes go through a
/// separate lock, and admission checks only read the last committed snapshot.
pub struct Volume {
    id: Option<String>,
    path: PathBuf,
    index_path: PathBuf,
    max_size_mb: u64,
    created: DateTime<Utc>,
    policy: Arc<dyn DiskSpacePolicy>,
    fs: Arc<dyn Filesystem>,
    lifecycle: Mutex<Lifecycle>,
    space: RwLock<SpaceSnapshot>,
    refresh: Mutex<()>,
}

impl Volume {
    /// Create a volume on the local filesystem
    pub fn new(
        policy: Arc<dyn DiskSpacePolicy>,
        path: &str,
        index_path: &str,
        max_size_mb: u64,
    ) -> Result<Self> {
        Self::with_filesystem(policy, Arc::new(LocalFs), path, index_path, max_size_mb)
    }

    /// Create a volume backed by the given filesystem.
    ///
    /// Free space is probed immediately when the policy enables checking; a
    /// failed probe only suspends checking and never aborts construction.
    pub fn with_filesystem(
        policy: Arc<dyn DiskSpacePolicy>,
        fs: Arc<dyn Filesystem>,
        path: &str,
        index_path: &str,
        max_size_mb: u64,
    ) -> Result<Self> {
        if max_size_mb == 0 {
            return Err(Error::InvalidConfig(format!(
                "volume {} must have a positive max size",
                path
            )));
        }

        let path = PathBuf::from(normalize_path(path)?);
        let index_path = PathBuf::from(normalize_path(index_path)?);
        let checking = policy.disk_space_checking_enabled();
        let now = Utc::now();

        let volume = Self {
            id: None,
            path,
            index_path,
            max_size_mb,
            created: now,
            policy,
            fs,
            lifecycle: Mutex::new(Lifecycle {
                status: VolumeStatus::New,
                modified: now,
            }),
            space: RwLock::new(SpaceSnapshot::new(checking)),
            refresh: Mutex::new(()),
        };

        if checking {
            volume.refresh_free_space();
        }

        Ok(volume)
    }

    /// Assign an explicit identity
    pub fn with_id(mut self, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidConfig("volume id cannot be empty".into()));
        }
        self.id = Some(id);
        Ok(self)
    }

    /// Restore a persisted creation time
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Restore a persisted modification time
    pub fn with_modified(self, modified: DateTime<Utc>) -> Self {
        self.set_modified(modified);
        self
    }

    /// Identity of the volume, derived from the creation time if none was assigned
    pub fn id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => legacy_id(&self.created),
        }
    }

    /// Was an identity assigned, rather than derived from the creation time?
    pub fn has_explicit_id(&self) -> bool {
        self.id.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn max_size_mb(&self) -> u64 {
        self.max_size_mb
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.lifecycle().modified
    }

    pub fn set_modified(&self, modified: DateTime<Utc>) {
        self.lifecycle().modified = modified;
    }

    pub fn status(&self) -> VolumeStatus {
        self.lifecycle().status
    }

    /// Request a lifecycle transition.
    ///
    /// Illegal transitions leave the status untouched.
    pub fn request_status(&self, next: VolumeStatus) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        let current = lifecycle.status;
        if let Err(e) = current.check_transition(next) {
            tracing::warn!("failed to change volume status: {} ({})", e, self.path.display());
            return Err(e);
        }
        if current != next {
            lifecycle.status = next;
            tracing::info!(
                "volume {} status changed: {} -> {}",
                self.path.display(),
                current,
                next
            );
        }
        Ok(())
    }

    /// Set the status without consulting the transition rules.
    ///
    /// Reserved for restoring persisted state and recovery tooling.
    pub fn set_status_unchecked(&self, status: VolumeStatus) {
        let mut lifecycle = self.lifecycle();
        tracing::debug!(
            "volume {} status forced: {} -> {}",
            self.path.display(),
            lifecycle.status,
            status
        );
        lifecycle.status = status;
    }

    /// Copy of the last committed space measurements
    pub fn snapshot(&self) -> SpaceSnapshot {
        *self.space.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-measure free space under both directories
    pub fn refresh_free_space(&self) {
        let _guard = self.refresh_guard();
        let outcome = self.probe_free();
        let mut snapshot = self.space_mut();
        self.apply_free(&mut snapshot, outcome);
    }

    /// Re-measure space consumed under both directories
    pub fn refresh_used_space(&self) {
        let _guard = self.refresh_guard();
        let used = self.probe_used();
        self.apply_used(&mut self.space_mut(), used);
    }

    /// Re-measure free and used space, committing both together
    pub fn refresh_space(&self) {
        let _guard = self.refresh_guard();
        let free = self.probe_free();
        let used = self.probe_used();

        let mut snapshot = self.space_mut();
        self.apply_free(&mut snapshot, free);
        self.apply_used(&mut snapshot, used);
        snapshot.space_check_performed = true;
    }

    /// Evaluate admission against the last snapshot, logging warnings
    pub fn admission(&self) -> AdmissionReport {
        let snapshot = self.snapshot();
        let limits = SpaceLimits::from_policy(self.policy.as_ref());
        tracing::debug!(
            "admission check: used_index={} used_store={} free_index={} free_store={} warn={} threshold={} ({})",
            snapshot.used_index_space,
            snapshot.used_archive_space,
            snapshot.free_index_space,
            snapshot.free_archive_space,
            limits.warn_bytes,
            limits.threshold_bytes,
            self
        );

        let report = admission::evaluate(&snapshot, self.max_size_mb, limits);
        for warning in &report.warnings {
            tracing::warn!("{} {{{}}}", warning, self);
        }
        match report.decision {
            Admission::CheckingDisabled => tracing::warn!(
                "disk space checking is disabled. check file permissions on volume index and store path {{{}}}",
                self
            ),
            Admission::NotMeasured => tracing::info!(
                "disk space checks have not been performed. reporting enough disk space {{{}}}",
                self
            ),
            Admission::Allowed => {}
            denied => {
                if let Some(message) = denied.error_message() {
                    tracing::warn!("{} {{{}}}", message, self);
                }
            }
        }
        report
    }

    /// Can this volume accept more writes?
    pub fn has_sufficient_space(&self) -> bool {
        self.admission().is_allowed()
    }

    /// Selection order: by status, then closed volumes oldest first
    pub fn compare(&self, other: &Volume) -> Ordering {
        if std::ptr::eq(self, other) {
            return Ordering::Equal;
        }
        self.sort_key().cmp(&other.sort_key())
    }

    /// Key behind [`Volume::compare`], read under a single lock.
    ///
    /// The modification time only takes part for closed volumes.
    pub fn sort_key(&self) -> (VolumeStatus, Option<DateTime<Utc>>) {
        let lifecycle = *self.lifecycle();
        let modified = (lifecycle.status == VolumeStatus::Closed).then_some(lifecycle.modified);
        (lifecycle.status, modified)
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_guard(&self) -> MutexGuard<'_, ()> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn space_mut(&self) -> std::sync::RwLockWriteGuard<'_, SpaceSnapshot> {
        self.space.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn probe_free(&self) -> Option<FreeSpace> {
        if !self.policy.disk_space_checking_enabled() {
            tracing::debug!(
                "disk space checking disabled by pool policy. skipping free space probe {{{}}}",
                self
            );
            return None;
        }
        Some(space::probe_free_space(
            self.fs.as_ref(),
            &self.index_path,
            &self.path,
        ))
    }

    fn probe_used(&self) -> UsedSpace {
        space::probe_used_space(self.fs.as_ref(), &self.index_path, &self.path)
    }

    fn apply_free(&self, snapshot: &mut SpaceSnapshot, outcome: Option<FreeSpace>) {
        match outcome {
            None => snapshot.disk_space_checking = false,
            Some(FreeSpace::NotReady) => {}
            Some(FreeSpace::Measured { index, archive }) => {
                snapshot.free_index_space = index;
                snapshot.free_archive_space = archive;
                snapshot.disk_space_checking = true;
                tracing::debug!("available index disk space: {} bytes ({})", index, self);
                tracing::debug!("available store disk space: {} bytes ({})", archive, self);
            }
            Some(FreeSpace::Failed(e)) => {
                tracing::error!(
                    "unable to retrieve free space on volume and/or index path. file permissions? {} ({})",
                    e,
                    self
                );
                snapshot.disk_space_checking = false;
            }
        }
    }

    fn apply_used(&self, snapshot: &mut SpaceSnapshot, used: UsedSpace) {
        snapshot.used_index_space = used.index;
        snapshot.used_archive_space = used.archive;
        tracing::debug!("used index disk space: {} bytes ({})", used.index, self);
        tracing::debug!("used store disk space: {} bytes ({})", used.archive, self);
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lifecycle = *self.lifecycle();
        write!(
            f,
            "volumepath='{}',indexpath='{}',volumestatus='{}',modified='{}',created='{}'",
            self.path.display(),
            self.index_path.display(),
            lifecycle.status,
            lifecycle.modified.to_rfc3339(),
            self.created.to_rfc3339()
        )
    }
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("id", &self.id())
            .field("path", &self.path)
            .field("index_path", &self.index_path)
            .field("max_size_mb", &self.max_size_mb)
            .field("status", &self.status())
            .field("space", &self.snapshot())
            .finish_non_exhaustive()
    }
}
