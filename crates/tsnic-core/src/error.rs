//! Error types for tsnic-core
//!
//! This module provides a no_std compatible error type for the register
//! level driver. File-backed image operations wrap it in
//! [`crate::flash::ImageError`].

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The capacity/identifier register reported a chip not in the catalog
    ChipNotFound {
        /// Raw value of the identifier register
        id: u32,
    },
    /// Buffer length or device offset is not a multiple of the 8-byte transfer unit
    InvalidAlignment,
    /// Transfer extends past the end of the flash window
    AddressOutOfBounds,
    /// The busy bit did not clear within the poll policy's limit
    HardwareUnresponsive {
        /// Device address of the operation that was being waited on
        addr: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChipNotFound { id } => {
                write!(f, "no supported flash chip found (id {:#x})", id)
            }
            Self::InvalidAlignment => write!(f, "transfer not aligned to 8 bytes"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::HardwareUnresponsive { addr } => write!(
                f,
                "flash controller still busy at address 0x{:08X}, giving up",
                addr
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
