//! Volume lifecycle states
//!
//! Volumes rotate through `new -> unused -> active -> closed -> unmounted`.
//! Ejection is a physical event and is accepted from any state.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a volume.
///
/// The declaration order is the sort order used when picking volumes:
/// closed volumes sort first, then active, unused, new and the offline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeStatus {
    Closed,
    Active,
    Unused,
    New,
    Unmounted,
    Ejected,
    Remote,
}

impl VolumeStatus {
    pub const ALL: [VolumeStatus; 7] = [
        VolumeStatus::Closed,
        VolumeStatus::Active,
        VolumeStatus::Unused,
        VolumeStatus::New,
        VolumeStatus::Unmounted,
        VolumeStatus::Ejected,
        VolumeStatus::Remote,
    ];

    /// The only state reachable from `self` through a normal transition
    pub fn successor(&self) -> Option<VolumeStatus> {
        match self {
            VolumeStatus::New => Some(VolumeStatus::Unused),
            VolumeStatus::Unused => Some(VolumeStatus::Active),
            VolumeStatus::Active => Some(VolumeStatus::Closed),
            VolumeStatus::Closed => Some(VolumeStatus::Unmounted),
            VolumeStatus::Unmounted => Some(VolumeStatus::Closed),
            VolumeStatus::Ejected | VolumeStatus::Remote => None,
        }
    }

    /// Can a volume move from `self` to `next`?
    pub fn can_transition_to(&self, next: VolumeStatus) -> bool {
        *self == next || next == VolumeStatus::Ejected || self.successor() == Some(next)
    }

    /// Validate a requested transition without applying it
    pub fn check_transition(&self, next: VolumeStatus) -> Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(Error::IllegalTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Can writes be routed to a volume in this state?
    pub fn is_writable(&self) -> bool {
        matches!(self, VolumeStatus::Active)
    }
}

impl std::fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeStatus::Closed => write!(f, "closed"),
            VolumeStatus::Active => write!(f, "active"),
            VolumeStatus::Unused => write!(f, "unused"),
            VolumeStatus::New => write!(f, "new"),
            VolumeStatus::Unmounted => write!(f, "unmounted"),
            VolumeStatus::Ejected => write!(f, "ejected"),
            VolumeStatus::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for VolumeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        VolumeStatus::ALL
            .iter()
            .copied()
            .find(|status| status.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown volume status: {}", s)))
    }
}
