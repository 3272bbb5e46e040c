//! Error type for image operations

use std::io;
use thiserror::Error;

use crate::error::Error;

/// Errors from program/verify/dump
#[derive(Debug, Error)]
pub enum ImageError {
    /// Reading the image or writing the dump failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Image does not fit between the configured offset and the end of the chip
    #[error("File too big: {size} bytes at offset {offset:#x} (max {max} bytes)")]
    TooLarge {
        /// Image size in bytes
        size: u64,
        /// Configured flash offset
        offset: u32,
        /// Largest image that fits at this offset
        max: u64,
    },

    /// Flash contents differ from the image
    #[error("Verifying failed at {offset:08X}h (first difference at {addr:08X}h)")]
    VerifyMismatch {
        /// Device offset of the first mismatching chunk
        offset: u32,
        /// Device address of the first mismatching byte
        addr: u32,
    },

    /// The mapped BAR does not cover the detected chip
    #[error("Mapped window is {window:#x} bytes, chip needs {needed:#x}")]
    WindowTooSmall {
        /// Size of the register window
        window: u64,
        /// Bytes needed to reach the end of the flash
        needed: u64,
    },

    /// The controller reported an error
    #[error(transparent)]
    Hardware(#[from] Error),
}

/// Result type for image operations
pub type ImageResult<T> = std::result::Result<T, ImageError>;
