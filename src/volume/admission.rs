//! Write admission based on the last space snapshot
//!
//! Three resources are checked in order: the volume's own capacity, free
//! space under the index directory, and free space under the store
//! directory. Each has a warn margin (log only) and a hard threshold (deny).
//! When measurements cannot be trusted the decision fails open.

use crate::volume::policy::DiskSpacePolicy;
use crate::volume::space::SpaceSnapshot;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Margins applied during one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceLimits {
    pub warn_bytes: u64,
    pub threshold_bytes: u64,
}

impl SpaceLimits {
    pub fn from_policy(policy: &dyn DiskSpacePolicy) -> Self {
        Self {
            warn_bytes: policy.disk_space_warn_bytes(),
            threshold_bytes: policy.disk_space_threshold_bytes(),
        }
    }
}

/// A resource crossed its warn margin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceWarning {
    CapacityLow { used: u64, capacity: u64 },
    IndexSpaceLow { free: u64 },
    ArchiveSpaceLow { free: u64 },
}

impl std::fmt::Display for SpaceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpaceWarning::CapacityLow { used, capacity } => write!(
                f,
                "storage space is running low (max volume size nearly exceeded: used={} of {} bytes)",
                used, capacity
            ),
            SpaceWarning::IndexSpaceLow { free } => write!(
                f,
                "storage space is running low on index filesystem (free={} bytes)",
                free
            ),
            SpaceWarning::ArchiveSpaceLow { free } => write!(
                f,
                "storage space is running low on store filesystem (free={} bytes)",
                free
            ),
        }
    }
}

/// Result of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Probing is disabled or failed; allowed
    CheckingDisabled,
    /// No refresh has completed yet; allowed
    NotMeasured,
    CapacityExceeded { used: u64, capacity: u64 },
    IndexSpaceExhausted { free: u64 },
    ArchiveSpaceExhausted { free: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            Admission::Allowed | Admission::CheckingDisabled | Admission::NotMeasured
        )
    }

    /// Convert to an error message if not allowed
    pub fn error_message(&self) -> Option<String> {
        match self {
            Admission::Allowed | Admission::CheckingDisabled | Admission::NotMeasured => None,
            Admission::CapacityExceeded { used, capacity } => Some(format!(
                "no storage space left on volume (max volume size exceeded: used={} of {} bytes)",
                used, capacity
            )),
            Admission::IndexSpaceExhausted { free } => Some(format!(
                "no storage space left on index filesystem (free={} bytes)",
                free
            )),
            Admission::ArchiveSpaceExhausted { free } => Some(format!(
                "no storage space left on store filesystem (free={} bytes)",
                free
            )),
        }
    }
}

/// Decision plus every warning raised before it was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionReport {
    pub decision: Admission,
    pub warnings: Vec<SpaceWarning>,
}

impl AdmissionReport {
    fn decided(decision: Admission, warnings: Vec<SpaceWarning>) -> Self {
        Self { decision, warnings }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

/// Evaluate the admission table against a snapshot.
///
/// Evaluation stops at the first denial, so warnings for resources checked
/// later are not reported.
pub fn evaluate(snapshot: &SpaceSnapshot, max_size_mb: u64, limits: SpaceLimits) -> AdmissionReport {
    if !snapshot.disk_space_checking {
        return AdmissionReport::decided(Admission::CheckingDisabled, Vec::new());
    }
    if !snapshot.space_check_performed {
        return AdmissionReport::decided(Admission::NotMeasured, Vec::new());
    }

    let mut warnings = Vec::new();
    let used = snapshot.used_space();
    let capacity = max_size_mb.saturating_mul(BYTES_PER_MB);

    if used.saturating_add(limits.warn_bytes) >= capacity {
        warnings.push(SpaceWarning::CapacityLow { used, capacity });
    }
    if used.saturating_add(limits.threshold_bytes) >= capacity {
        return AdmissionReport::decided(Admission::CapacityExceeded { used, capacity }, warnings);
    }

    let free = snapshot.free_index_space;
    if free <= limits.warn_bytes {
        warnings.push(SpaceWarning::IndexSpaceLow { free });
    }
    if free <= limits.threshold_bytes {
        return AdmissionReport::decided(Admission::IndexSpaceExhausted { free }, warnings);
    }

    let free = snapshot.free_archive_space;
    if free <= limits.warn_bytes {
        warnings.push(SpaceWarning::ArchiveSpaceLow { free });
    }
    if free <= limits.threshold_bytes {
        return AdmissionReport::decided(Admission::ArchiveSpaceExhausted { free }, warnings);
    }

    AdmissionReport::decided(Admission::Allowed, warnings)
}
