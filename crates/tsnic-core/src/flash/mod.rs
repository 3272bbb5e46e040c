//! Flash image operations
//!
//! This module drives complete workflows on top of the
//! [`SpiController`](crate::controller::SpiController):
//!
//! - [`FlashSession::program`] - bounds check, erase, mirrored write
//! - [`FlashSession::verify`] - re-read and compare against the image
//! - [`FlashSession::dump`] - read the whole chip back into a file
//!
//! Progress is reported through a [`ProgressSink`] so the workflows stay
//! free of console output.

mod error;
mod progress;
mod session;
mod transfer;

pub use error::{ImageError, ImageResult};
pub use progress::{NoProgress, Phase, ProgressSink};
pub use session::FlashSession;
pub use transfer::{sectors_for_range, Chunk, TransferSession, CHUNK_SIZE, OFFSET_ALIGN};
