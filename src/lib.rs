//! # volkeeper
//!
//! Volume lifecycle management and disk-space admission control for an
//! archive that writes indexed content and raw data onto a pool of volumes.
//!
//! Each volume pairs a search-index directory with a store directory under
//! one capacity and one lifecycle:
//! - a rotation state machine (`new -> unused -> active -> closed -> unmounted`)
//! - free/used space accounting against the underlying filesystems
//! - a two-stage admission policy: warn first, deny at the hard threshold
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              VolumePool                  │
//! │  policy: checking / warn / threshold     │
//! │  routing, rotation, ordering             │
//! └──────────┬───────────────────────────────┘
//!            │ Arc<dyn DiskSpacePolicy>
//!   ┌────────┴─────────┬─────────────────┐
//! ┌─▼──────────┐  ┌────▼───────┐   ┌─────▼──────┐
//! │ Volume     │  │ Volume     │   │ Volume     │
//! │ (closed)   │  │ (active)   │   │ (unused)   │
//! │ index+store│  │ index+store│   │ index+store│
//! └────────────┘  └────────────┘   └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Show every volume with its space snapshot and admission verdict
//! volkeeper --config pool.toml status
//!
//! # Exit non-zero when no volume can accept writes
//! volkeeper --config pool.toml check
//!
//! # Refresh space accounting periodically
//! volkeeper --config pool.toml watch --interval 30s
//! ```

pub mod common;
pub mod pool;
pub mod volume;

// Re-export commonly used types
pub use common::{Error, PoolConfig, Result};
pub use pool::VolumePool;
pub use volume::{DiskSpacePolicy, SpacePolicy, Volume, VolumeStatus};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
