//! Volume pool: owns the configured volumes and supplies their policy
//!
//! The pool is the only writer of volume status. It routes writes to the
//! active volume and rotates to the next unused volume once the active one
//! can no longer accept writes.

use crate::common::{normalize_path, Error, Filesystem, LocalFs, PoolConfig, Result};
use crate::volume::{DiskSpacePolicy, SpacePolicy, Volume, VolumeStatus};
use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

pub struct VolumePool {
    policy: Arc<SpacePolicy>,
    fs: Arc<dyn Filesystem>,
    volumes: RwLock<Vec<Arc<Volume>>>,
    rotation: Mutex<()>,
}

impl VolumePool {
    /// Create an empty pool on the local filesystem
    pub fn new(policy: SpacePolicy) -> Self {
        Self::with_filesystem(policy, Arc::new(LocalFs))
    }

    pub fn with_filesystem(policy: SpacePolicy, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            policy: Arc::new(policy),
            fs,
            volumes: RwLock::new(Vec::new()),
            rotation: Mutex::new(()),
        }
    }

    /// Build a pool and every configured volume
    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        Self::from_config_with_filesystem(config, Arc::new(LocalFs))
    }

    pub fn from_config_with_filesystem(config: &PoolConfig, fs: Arc<dyn Filesystem>) -> Result<Self> {
        config.validate()?;
        let pool = Self::with_filesystem(SpacePolicy::from(config), fs);

        for entry in &config.volumes {
            let mut volume = pool.build_volume(&entry.path, &entry.index_path, entry.max_size_mb)?;
            if let Some(id) = &entry.id {
                volume = volume.with_id(id.clone())?;
            }
            if let Some(created) = entry.created {
                volume = volume.with_created(created);
            }
            if let Some(modified) = entry.modified {
                volume.set_modified(modified);
            }
            if let Some(status) = entry.status {
                volume.set_status_unchecked(status);
            }
            pool.insert(volume)?;
        }

        tracing::info!("volume pool loaded with {} volume(s)", pool.len());
        Ok(pool)
    }

    pub fn policy(&self) -> &SpacePolicy {
        &self.policy
    }

    /// Register a new volume in status `new`
    pub fn add_volume(&self, path: &str, index_path: &str, max_size_mb: u64) -> Result<Arc<Volume>> {
        let volume = self.build_volume(path, index_path, max_size_mb)?;
        self.insert(volume)
    }

    /// All volumes in selection order.
    ///
    /// Each volume's sort key is read once, so concurrent status changes
    /// cannot reorder keys while the sort runs.
    pub fn volumes(&self) -> Vec<Arc<Volume>> {
        let mut volumes = self.read().clone();
        volumes.sort_by_cached_key(|v| v.sort_key());
        volumes
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Is `path` already used by a volume in the pool (after normalization)?
    pub fn is_claimed(&self, path: &str) -> Result<bool> {
        let normalized = normalize_path(path)?;
        let normalized = Path::new(&normalized);
        Ok(self
            .read()
            .iter()
            .any(|v| v.path() == normalized || v.index_path() == normalized))
    }

    pub fn get(&self, id: &str) -> Option<Arc<Volume>> {
        self.read().iter().find(|v| v.id() == id).cloned()
    }

    /// Request a status change on a volume.
    ///
    /// Closing a volume stamps its modification time, which orders closed
    /// volumes oldest first.
    pub fn set_status(&self, id: &str, status: VolumeStatus) -> Result<()> {
        let volume = self
            .get(id)
            .ok_or_else(|| Error::VolumeNotFound(id.to_string()))?;
        Self::transition(&volume, status)
    }

    /// Refresh space accounting on every volume
    pub fn refresh_all(&self) {
        for volume in self.volumes() {
            volume.refresh_space();
        }
    }

    /// First active volume that can still accept writes
    pub fn writable_volume(&self) -> Option<Arc<Volume>> {
        self.volumes()
            .into_iter()
            .find(|v| v.status().is_writable() && v.has_sufficient_space())
    }

    /// Closed volume that has been closed the longest
    pub fn oldest_closed(&self) -> Option<Arc<Volume>> {
        self.volumes()
            .into_iter()
            .find(|v| v.status() == VolumeStatus::Closed)
    }

    /// Make sure a volume is accepting writes.
    ///
    /// If the active volume lacks space it is closed and the next unused
    /// volume (or, failing that, a new one) is activated. Returns the volume
    /// now accepting writes, or `None` when no candidate is left.
    pub fn rotate(&self) -> Result<Option<Arc<Volume>>> {
        let _guard = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        let volumes = self.volumes();

        if let Some(active) = volumes.iter().find(|v| v.status() == VolumeStatus::Active) {
            if active.has_sufficient_space() {
                return Ok(Some(active.clone()));
            }
            tracing::info!("closing full volume {}", active.id());
            Self::transition(active, VolumeStatus::Closed)?;
        }

        let candidate = volumes
            .iter()
            .find(|v| v.status() == VolumeStatus::Unused)
            .or_else(|| volumes.iter().find(|v| v.status() == VolumeStatus::New));

        let Some(next) = candidate else {
            tracing::warn!("no unused volume available to accept writes");
            return Ok(None);
        };

        if next.status() == VolumeStatus::New {
            Self::transition(next, VolumeStatus::Unused)?;
        }
        Self::transition(next, VolumeStatus::Active)?;
        tracing::info!("volume {} is now active", next.id());
        Ok(Some(next.clone()))
    }

    fn transition(volume: &Volume, status: VolumeStatus) -> Result<()> {
        volume.request_status(status)?;
        if status == VolumeStatus::Closed {
            volume.set_modified(Utc::now());
        }
        Ok(())
    }

    fn build_volume(&self, path: &str, index_path: &str, max_size_mb: u64) -> Result<Volume> {
        let policy: Arc<dyn DiskSpacePolicy> = self.policy.clone();
        Volume::with_filesystem(policy, self.fs.clone(), path, index_path, max_size_mb)
    }

    fn insert(&self, volume: Volume) -> Result<Arc<Volume>> {
        let mut volumes = self.volumes.write().unwrap_or_else(PoisonError::into_inner);

        let claimed = |p: &Path| {
            volumes
                .iter()
                .any(|v| v.path() == p || v.index_path() == p)
        };
        for path in [volume.path(), volume.index_path()] {
            if claimed(path) {
                return Err(Error::DuplicateVolume(path.display().to_string()));
            }
        }
        let id = volume.id();
        if volume.has_explicit_id() && volumes.iter().any(|v| v.id() == id) {
            return Err(Error::DuplicateVolume(id));
        }

        tracing::debug!("registered volume {} ({})", id, volume);
        let volume = Arc::new(volume);
        volumes.push(volume.clone());
        Ok(volume)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Volume>>> {
        self.volumes.read().unwrap_or_else(PoisonError::into_inner)
    }
}
