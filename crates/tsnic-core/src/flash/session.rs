//! Program, verify and dump workflows

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::error::{ImageError, ImageResult};
use super::progress::{Phase, ProgressSink};
use super::transfer::{TransferSession, CHUNK_SIZE, OFFSET_ALIGN};
use crate::chip::FlashChip;
use crate::controller::SpiController;
use crate::error::Error;
use crate::mirror::mirror_in_place;
use crate::regs::{RegisterWindow, MEM_OFFSET};

/// Context for operating on one detected chip
///
/// Created once after the BAR is mapped and the chip identified; every
/// operation borrows it mutably, so there is exactly one user of the
/// register window at a time.
pub struct FlashSession<W: RegisterWindow> {
    controller: SpiController<W>,
    chip: &'static FlashChip,
    offset: u32,
}

impl<W: RegisterWindow> FlashSession<W> {
    /// Create a session for a known chip
    ///
    /// `offset` is the device offset programs and verifies start at. It is
    /// aligned down to 16 bytes.
    pub fn new(controller: SpiController<W>, chip: &'static FlashChip, offset: u32) -> Self {
        let aligned = offset & !(OFFSET_ALIGN - 1);
        if aligned != offset {
            log::warn!(
                "Flash offset {:#x} is not 16-byte aligned, using {:#x}",
                offset,
                aligned
            );
        }
        Self {
            controller,
            chip,
            offset: aligned,
        }
    }

    /// Detect the installed chip and create a session for it
    pub fn detect(mut controller: SpiController<W>, offset: u32) -> ImageResult<Self> {
        match controller.detect_chip() {
            Some(chip) => {
                log::info!("Found flash chip {}, size {} kB.", chip.name, chip.size_kib());
                check_window(controller.window(), chip)?;
                Ok(Self::new(controller, chip, offset))
            }
            None => Err(Error::ChipNotFound {
                id: controller.read_chip_id(),
            }
            .into()),
        }
    }

    /// The detected chip
    pub fn chip(&self) -> &'static FlashChip {
        self.chip
    }

    /// The configured flash offset
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Borrow the controller
    pub fn controller_mut(&mut self) -> &mut SpiController<W> {
        &mut self.controller
    }

    /// Release the controller
    pub fn into_controller(self) -> SpiController<W> {
        self.controller
    }

    /// Check that an image of `size` bytes fits at the configured offset
    pub fn transfer(&self, size: u64) -> ImageResult<TransferSession> {
        let capacity = u64::from(self.chip.total_size);
        let max = capacity.saturating_sub(u64::from(self.offset));

        if u64::from(self.offset) + size > capacity {
            return Err(ImageError::TooLarge {
                size,
                offset: self.offset,
                max,
            });
        }

        // Fits below a u32 capacity, so the cast is lossless
        Ok(TransferSession::new(self.offset, size as u32))
    }

    /// Erase, then write an image at the configured offset
    ///
    /// Nothing is erased if the image does not fit. Run [`Self::verify`]
    /// afterwards; programming alone does not check the result.
    pub fn program<R: Read + Seek>(
        &mut self,
        image: &mut R,
        progress: &mut dyn ProgressSink,
    ) -> ImageResult<()> {
        let size = image_size(image)?;
        log::info!("Filesize is {} bytes.", size);
        log::info!("Internal offset is {:X}h.", self.offset);

        let xfer = self.transfer(size)?;

        // Leave the write enable latch cleared whichever phase fails
        let result = match self.erase(&xfer, progress) {
            Ok(()) => {
                self.controller.write_enable();
                self.write(xfer, image, progress)
            }
            Err(e) => Err(e),
        };
        self.controller.write_disable();
        result?;

        log::info!("Writing done.");
        Ok(())
    }

    /// Compare flash contents at the configured offset against an image
    ///
    /// Stops at the first mismatching chunk.
    pub fn verify<R: Read + Seek>(
        &mut self,
        image: &mut R,
        progress: &mut dyn ProgressSink,
    ) -> ImageResult<()> {
        let size = image_size(image)?;
        let xfer = self.transfer(size)?;
        let total = u64::from(xfer.length());

        let mut expected = [0xFFu8; CHUNK_SIZE];
        let mut actual = [0xFFu8; CHUNK_SIZE];

        progress.start(Phase::Verify, total);
        for chunk in xfer {
            expected.fill(0xFF);
            read_chunk(image, &mut expected[..chunk.image_len])?;
            mirror_in_place(&mut expected[..chunk.transfer_len]);

            self.controller
                .read_buffer(&mut actual[..chunk.transfer_len], chunk.offset)?;

            let n = chunk.image_len;
            if let Some(pos) = expected[..n]
                .iter()
                .zip(&actual[..n])
                .position(|(e, a)| e != a)
            {
                let addr = chunk.offset + pos as u32;
                log::debug!(
                    "Verifying failed at {:08X}h, first difference at {:08X}h: expected {:02X}, found {:02X} (device order)",
                    chunk.offset,
                    addr,
                    expected[pos],
                    actual[pos]
                );
                return Err(ImageError::VerifyMismatch {
                    offset: chunk.offset,
                    addr,
                });
            }

            let done = u64::from(chunk.offset - self.offset) + chunk.image_len as u64;
            progress.update(Phase::Verify, done, total);
        }
        progress.finish(Phase::Verify);

        log::info!("Verifying done.");
        Ok(())
    }

    /// Program an image, then verify it
    pub fn program_and_verify<R: Read + Seek>(
        &mut self,
        image: &mut R,
        progress: &mut dyn ProgressSink,
    ) -> ImageResult<()> {
        self.program(image, progress)?;
        self.verify(image, progress)
    }

    /// Read the entire chip into `out`
    ///
    /// The configured offset does not apply; the dump always covers the
    /// whole chip.
    pub fn dump<O: Write>(
        &mut self,
        out: &mut O,
        progress: &mut dyn ProgressSink,
    ) -> ImageResult<()> {
        let total = self.chip.total_size;
        let mut buf = [0u8; CHUNK_SIZE];

        progress.start(Phase::Dump, u64::from(total));
        let mut offset = 0u32;
        while offset < total {
            let len = CHUNK_SIZE.min((total - offset) as usize);
            let chunk = &mut buf[..len];

            self.controller.read_buffer(chunk, offset)?;
            mirror_in_place(chunk);
            out.write_all(chunk)?;

            offset += len as u32;
            progress.update(Phase::Dump, u64::from(offset), u64::from(total));
        }
        out.flush()?;
        progress.finish(Phase::Dump);

        log::info!("Dumped {} bytes.", total);
        Ok(())
    }

    fn erase(
        &mut self,
        xfer: &TransferSession,
        progress: &mut dyn ProgressSink,
    ) -> ImageResult<()> {
        let sectors = xfer.sectors();
        let count = u64::from(sectors.end - sectors.start);

        progress.start(Phase::Erase, count);
        for (done, sector) in sectors.enumerate() {
            log::debug!("Erasing sector {:03}", sector);
            self.controller.erase_sector(sector)?;
            progress.update(Phase::Erase, done as u64 + 1, count);
        }
        progress.finish(Phase::Erase);

        log::info!("Erasing done.");
        Ok(())
    }

    fn write<R: Read>(
        &mut self,
        xfer: TransferSession,
        image: &mut R,
        progress: &mut dyn ProgressSink,
    ) -> ImageResult<()> {
        let total = u64::from(xfer.length());
        let mut buf = [0xFFu8; CHUNK_SIZE];

        progress.start(Phase::Write, total);
        for chunk in xfer {
            buf.fill(0xFF);
            read_chunk(image, &mut buf[..chunk.image_len])?;
            mirror_in_place(&mut buf[..chunk.transfer_len]);

            log::trace!("Writing at address {:08X}h", chunk.offset);
            self.controller
                .write_buffer(&buf[..chunk.transfer_len], chunk.offset)?;

            let done = u64::from(chunk.offset - self.offset) + chunk.image_len as u64;
            progress.update(Phase::Write, done, total);
        }
        progress.finish(Phase::Write);

        Ok(())
    }
}

/// Refuse a chip whose data window would not fit in the mapping
fn check_window<W: RegisterWindow>(window: &W, chip: &FlashChip) -> ImageResult<()> {
    let Some(size) = window.size() else {
        return Ok(());
    };
    let needed = MEM_OFFSET as u64 + u64::from(chip.total_size);
    if needed > size as u64 {
        return Err(ImageError::WindowTooSmall {
            window: size as u64,
            needed,
        });
    }
    Ok(())
}

/// Size of a seekable image; leaves the cursor at the start
fn image_size<R: Seek>(image: &mut R) -> io::Result<u64> {
    let size = image.seek(SeekFrom::End(0))?;
    image.seek(SeekFrom::Start(0))?;
    Ok(size)
}

/// Fill `buf` from the image, stopping early at end of file
///
/// Bytes past the end keep their previous value (0xFF padding).
fn read_chunk<R: Read>(image: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match image.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    if filled < buf.len() {
        log::warn!(
            "Image ended early: got {} of {} bytes, padding with 0xFF",
            filled,
            buf.len()
        );
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip;
    use crate::flash::NoProgress;
    use std::io::Cursor;
    use std::vec;
    use std::vec::Vec;

    /// Window that records every write and reports an idle controller
    #[derive(Default)]
    struct RecordingWindow {
        writes32: Vec<(usize, u32)>,
        writes64: usize,
        busy: bool,
        chip_id: u32,
        size: Option<usize>,
    }

    impl RegisterWindow for RecordingWindow {
        fn read32(&mut self, offset: usize) -> u32 {
            match offset {
                crate::regs::RD_STATUS if self.busy => 1,
                crate::regs::RD_MEMORY_CAPACITY_ID => self.chip_id,
                _ => 0,
            }
        }
        fn write32(&mut self, offset: usize, value: u32) {
            self.writes32.push((offset, value));
        }
        fn read64(&mut self, _offset: usize) -> u64 {
            u64::MAX
        }
        fn write64(&mut self, _offset: usize, _value: u64) {
            self.writes64 += 1;
        }
        fn delay_us(&mut self, _us: u32) {}
        fn size(&self) -> Option<usize> {
            self.size
        }
    }

    fn session(offset: u32) -> FlashSession<RecordingWindow> {
        let chip = chip::find_by_id(0x15).unwrap(); // 2 MiB
        FlashSession::new(SpiController::new(RecordingWindow::default()), chip, offset)
    }

    #[test]
    fn test_offset_aligned_down() {
        assert_eq!(session(0x1234_7).offset(), 0x1234_0);
        assert_eq!(session(0x10).offset(), 0x10);
    }

    #[test]
    fn test_too_large_touches_no_registers() {
        let mut s = session(0x10);
        let mut image = Cursor::new(vec![0u8; 2 * 1024 * 1024]);

        let err = s.program(&mut image, &mut NoProgress).unwrap_err();
        match err {
            ImageError::TooLarge { size, offset, max } => {
                assert_eq!(size, 2 * 1024 * 1024);
                assert_eq!(offset, 0x10);
                assert_eq!(max, 2 * 1024 * 1024 - 0x10);
            }
            other => panic!("unexpected error: {}", other),
        }

        let win = s.into_controller().into_inner();
        assert!(win.writes32.is_empty());
        assert_eq!(win.writes64, 0);
    }

    #[test]
    fn test_verify_too_large() {
        let mut s = session(0);
        let mut image = Cursor::new(vec![0u8; 2 * 1024 * 1024 + 1]);
        assert!(matches!(
            s.verify(&mut image, &mut NoProgress),
            Err(ImageError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_image_fills_chip_exactly() {
        let s = session(0x100);
        assert!(s.transfer(2 * 1024 * 1024 - 0x100).is_ok());
        assert!(s.transfer(2 * 1024 * 1024 - 0xF0).is_err());
    }

    #[test]
    fn test_program_register_sequence() {
        let mut s = session(0);
        let mut image = Cursor::new(vec![0u8; 70_000]);

        s.program(&mut image, &mut NoProgress).unwrap();

        let win = s.into_controller().into_inner();
        use crate::regs::{SECTOR_ERASE, WR_DISABLE, WR_ENABLE};
        assert_eq!(
            win.writes32,
            [
                (WR_ENABLE, 1),
                (SECTOR_ERASE, 0),
                (WR_ENABLE, 1),
                (SECTOR_ERASE, 0x10000),
                (WR_ENABLE, 1),
                (WR_DISABLE, 1),
            ]
        );
        assert_eq!(win.writes64, 70_000 / 8);
    }

    #[test]
    fn test_erase_failure_clears_write_enable() {
        use crate::controller::PollPolicy;
        use crate::regs::{SECTOR_ERASE, WR_DISABLE, WR_ENABLE};

        let win = RecordingWindow {
            busy: true,
            ..RecordingWindow::default()
        };
        let ctrl = SpiController::with_poll_policy(win, PollPolicy::new(10, 100));
        let chip = chip::find_by_id(0x15).unwrap();
        let mut s = FlashSession::new(ctrl, chip, 0);

        let err = s
            .program(&mut Cursor::new(vec![0u8; 1000]), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            ImageError::Hardware(Error::HardwareUnresponsive { addr: 0 })
        ));

        let win = s.into_controller().into_inner();
        assert_eq!(
            win.writes32,
            [(WR_ENABLE, 1), (SECTOR_ERASE, 0), (WR_DISABLE, 1)]
        );
        assert_eq!(win.writes64, 0);
    }

    #[test]
    fn test_detect_rejects_small_window() {
        let win = RecordingWindow {
            chip_id: 0x17, // EPCQ64, 8 MiB
            size: Some(4 * 1024 * 1024),
            ..RecordingWindow::default()
        };
        match FlashSession::detect(SpiController::new(win), 0) {
            Err(ImageError::WindowTooSmall { window, needed }) => {
                assert_eq!(window, 4 * 1024 * 1024);
                assert_eq!(needed, 8 * 1024 * 1024);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("accepted a chip larger than the window"),
        }

        let win = RecordingWindow {
            chip_id: 0x17,
            size: Some(8 * 1024 * 1024),
            ..RecordingWindow::default()
        };
        let s = FlashSession::detect(SpiController::new(win), 0).unwrap();
        assert_eq!(s.chip().name, "EPCQ64");
    }

    #[test]
    fn test_detect_unknown_chip() {
        let ctrl = SpiController::new(RecordingWindow::default());
        match FlashSession::detect(ctrl, 0) {
            Err(ImageError::Hardware(Error::ChipNotFound { id })) => assert_eq!(id, 0),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("detected a chip on an empty window"),
        }
    }

    #[test]
    fn test_read_chunk_short_image() {
        let mut buf = [0xFFu8; 8];
        let mut image = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(read_chunk(&mut image, &mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
