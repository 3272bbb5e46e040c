//! CLI command implementations
//!
//! Each command operates on a [`tsnic_core::flash::FlashSession`] that
//! `main` creates after opening the target and detecting the chip.

pub mod dump;
mod list;
pub mod probe;
pub mod program;
mod progress;

pub use list::list_chips;
