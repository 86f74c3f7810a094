//! Common utilities and types shared across volkeeper

pub mod config;
pub mod error;
pub mod fs;
pub mod utils;

pub use config::{PoolConfig, VolumeEntry};
pub use error::{Error, Result};
pub use fs::{EntryKind, Filesystem, LocalFs, MemFs};
pub use utils::{format_bytes, legacy_id, normalize_path, parse_duration};
