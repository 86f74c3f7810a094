//! Error types for volkeeper

use crate::volume::VolumeStatus;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Probe Errors ===
    #[error("Disk space probe failed on {}: {source}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Lifecycle Errors ===
    #[error("Failed to change volume status from {from} to {to}")]
    IllegalTransition {
        from: VolumeStatus,
        to: VolumeStatus,
    },

    // === Pool Errors ===
    #[error("Volume already registered: {0}")]
    DuplicateVolume(String),

    #[error("Volume not found: {0}")]
    VolumeNotFound(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration source error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl Error {
    /// Is this a configuration error (rejected request, state untouched)?
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::IllegalTransition { .. }
                | Error::DuplicateVolume(_)
                | Error::Config(_)
        )
    }
}
