//! Volume lifecycle and disk space admission
//!
//! - `status`: the rotation state machine
//! - `space`: free/used space probes and the space snapshot
//! - `admission`: warn/threshold evaluation against a snapshot
//! - `policy`: pool-wide values a volume consults
//! - `volume`: the volume entity tying these together

pub mod admission;
pub mod policy;
pub mod space;
pub mod status;
#[allow(clippy::module_inception)]
pub mod volume;

pub use admission::{Admission, AdmissionReport, SpaceLimits, SpaceWarning};
pub use policy::{DiskSpacePolicy, SpacePolicy};
pub use space::{SpaceSnapshot, UNMEASURED_FREE_SPACE};
pub use status::VolumeStatus;
pub use volume::Volume;
