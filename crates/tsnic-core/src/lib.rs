//! tsnic-core - Core library for programming the TSNIC configuration flash
//!
//! The network controller exposes its SPI NOR configuration flash through
//! PCI BAR5: a small CSR block drives the flash controller and a memory
//! window maps the flash contents. This crate holds everything above the
//! raw mapping:
//!
//! - [`regs`] - register map and the [`RegisterWindow`] access trait
//! - [`mirror`] - the bit-order reversal applied to every data byte
//! - [`chip`] - catalog of supported EPCQ parts
//! - [`controller`] - the SPI controller driver (erase, buffer transfer, detect)
//! - [`flash`] - program/verify/dump workflows (requires `std`)
//!
//! # Features
//!
//! - `std` - Enable the image operations and `std::error::Error` impls
//!
//! # Example
//!
//! ```ignore
//! use tsnic_core::controller::SpiController;
//! use tsnic_core::flash::{FlashSession, NoProgress};
//!
//! let mut session = FlashSession::detect(SpiController::new(window), 0)?;
//! let mut image = std::fs::File::open("image.rpd")?;
//! session.program_and_verify(&mut image, &mut NoProgress)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod controller;
pub mod error;
#[cfg(feature = "std")]
pub mod flash;
pub mod mirror;
pub mod regs;

pub use chip::FlashChip;
pub use controller::{PollPolicy, SpiController};
pub use error::{Error, Result};
pub use regs::RegisterWindow;
