//! Error types for PCI discovery and mapping

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// PCI access errors
#[derive(Debug, Error)]
pub enum PciError {
    /// sysfs PCI hierarchy missing
    #[error("PCI sysfs interface not available at {0}")]
    NoSysfs(PathBuf),

    /// Failed to enumerate devices
    #[error("Failed to scan PCI bus: {0}")]
    Scan(#[source] io::Error),

    /// No matching controller at the requested index
    #[error("PCI device {vendor_id:04x}:{device_id:04x} #{index} not found")]
    DeviceNotFound {
        vendor_id: u16,
        device_id: u16,
        index: usize,
    },

    /// Failed to read a sysfs attribute
    #[error("Failed to read sysfs attribute '{path}': {source}")]
    SysfsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to parse a sysfs attribute
    #[error("Failed to parse sysfs attribute '{path}': {value}")]
    SysfsParse { path: PathBuf, value: String },

    /// BAR not populated
    #[error("PCI BAR{bar} not available on {bdf}")]
    BarUnavailable { bar: usize, bdf: String },

    /// BAR too small to hold the controller registers
    #[error("PCI BAR{bar} on {bdf} is only {size:#x} bytes, need {needed:#x}")]
    BarTooSmall {
        bar: usize,
        bdf: String,
        size: u64,
        needed: u64,
    },

    /// mmap failed
    #[error("Could not map PCI device memory at {address:#x} (size {size:#x}): {source}")]
    MemoryMap {
        address: u64,
        size: usize,
        #[source]
        source: io::Error,
    },

    /// Not available on this platform
    #[error("Not supported: {0}")]
    NotSupported(&'static str),
}

/// Result type for PCI operations
pub type Result<T> = std::result::Result<T, PciError>;
