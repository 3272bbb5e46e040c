//! Progress reporting for long-running operations

use core::fmt;

/// Operation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Erasing sectors. Progress is counted in sectors.
    Erase,
    /// Writing the image. Progress is counted in bytes.
    Write,
    /// Comparing flash against the image. Progress is counted in bytes.
    Verify,
    /// Reading the whole chip. Progress is counted in bytes.
    Dump,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Erase => "Erasing",
            Self::Write => "Writing",
            Self::Verify => "Verifying",
            Self::Dump => "Dumping",
        };
        f.write_str(name)
    }
}

/// Receiver for progress events
///
/// `start` is called once per phase, `update` after every unit of work
/// with the amount completed so far, and `finish` once the phase has
/// succeeded. A failed phase gets no `finish`.
pub trait ProgressSink {
    /// A phase with `total` units of work is starting
    fn start(&mut self, phase: Phase, total: u64);

    /// `done` of `total` units are complete
    fn update(&mut self, phase: Phase, done: u64, total: u64);

    /// The phase completed successfully
    fn finish(&mut self, phase: Phase);
}

/// A no-op progress reporter
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&mut self, _phase: Phase, _total: u64) {}
    fn update(&mut self, _phase: Phase, _done: u64, _total: u64) {}
    fn finish(&mut self, _phase: Phase) {}
}
