//! Pool-wide disk space policy consumed by volumes

use crate::common::PoolConfig;
use serde::{Deserialize, Serialize};

/// Read-only policy a volume consults for admission decisions.
///
/// Implemented by whatever owns the volumes; a volume holds it behind an
/// `Arc` instead of reaching for global configuration.
pub trait DiskSpacePolicy: Send + Sync {
    fn disk_space_checking_enabled(&self) -> bool;
    /// Margin at which a running-low warning is logged
    fn disk_space_warn_bytes(&self) -> u64;
    /// Margin at which writes are denied
    fn disk_space_threshold_bytes(&self) -> u64;
}

/// Fixed policy values, usually taken from [`PoolConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacePolicy {
    pub disk_space_checking: bool,
    pub warn_bytes: u64,
    pub threshold_bytes: u64,
}

impl SpacePolicy {
    pub fn new(disk_space_checking: bool, warn_bytes: u64, threshold_bytes: u64) -> Self {
        Self {
            disk_space_checking,
            warn_bytes,
            threshold_bytes,
        }
    }
}

impl From<&PoolConfig> for SpacePolicy {
    fn from(config: &PoolConfig) -> Self {
        Self::new(
            config.disk_space_checking,
            config.disk_space_warn_bytes,
            config.disk_space_threshold_bytes,
        )
    }
}

impl DiskSpacePolicy for SpacePolicy {
    fn disk_space_checking_enabled(&self) -> bool {
        self.disk_space_checking
    }

    fn disk_space_warn_bytes(&self) -> u64 {
        self.warn_bytes
    }

    fn disk_space_threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }
}
