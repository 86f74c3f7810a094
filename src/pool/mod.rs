//! Volume pool: registry, routing and rotation of volumes

pub mod registry;

pub use registry::VolumePool;
