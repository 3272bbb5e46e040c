//! Chunking of a single program/verify transfer

use core::ops::Range;

use crate::chip::SECTOR_SIZE;
use crate::controller::TRANSFER_UNIT;

/// Bytes moved per buffer transfer
pub const CHUNK_SIZE: usize = 1024;

/// Required alignment of the flash offset
pub const OFFSET_ALIGN: u32 = 16;

/// One chunk of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Device offset of the first byte
    pub offset: u32,
    /// Number of image bytes in this chunk
    pub image_len: usize,
    /// Number of bytes moved over the bus (image bytes plus 0xFF padding
    /// up to the 8-byte transfer unit)
    pub transfer_len: usize,
}

/// State of one program or verify pass
///
/// Created after the bounds check succeeded, so `offset + length` always
/// lies within the chip.
#[derive(Debug, Clone)]
pub struct TransferSession {
    offset: u32,
    length: u32,
    cursor: u32,
}

impl TransferSession {
    /// Start a transfer of `length` bytes at device offset `offset`
    pub fn new(offset: u32, length: u32) -> Self {
        Self {
            offset,
            length,
            cursor: 0,
        }
    }

    /// Device offset of the transfer
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Total image length
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Image bytes consumed so far
    pub fn position(&self) -> u32 {
        self.cursor
    }

    /// Sectors that must be erased before this transfer can be written
    pub fn sectors(&self) -> Range<u32> {
        sectors_for_range(self.offset, self.length)
    }

    /// Advance to the next chunk
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        let remaining = (self.length - self.cursor) as usize;
        if remaining == 0 {
            return None;
        }

        let image_len = remaining.min(CHUNK_SIZE);
        let chunk = Chunk {
            offset: self.offset + self.cursor,
            image_len,
            transfer_len: image_len.next_multiple_of(TRANSFER_UNIT),
        };
        self.cursor += image_len as u32;

        Some(chunk)
    }
}

impl Iterator for TransferSession {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.next_chunk()
    }
}

/// Sector indices covering the byte range `[offset, offset + len)`
///
/// For `offset == 0` this is `0..ceil(len / 64 KiB)`.
pub fn sectors_for_range(offset: u32, len: u32) -> Range<u32> {
    if len == 0 {
        return 0..0;
    }
    let first = offset / SECTOR_SIZE;
    let last = (offset + (len - 1)) / SECTOR_SIZE;
    first..last + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[test]
    fn test_sector_count_from_zero() {
        assert_eq!(sectors_for_range(0, 0), 0..0);
        assert_eq!(sectors_for_range(0, 1), 0..1);
        assert_eq!(sectors_for_range(0, 65536), 0..1);
        assert_eq!(sectors_for_range(0, 65537), 0..2);
        assert_eq!(sectors_for_range(0, 3 * 65536 - 16), 0..3);
    }

    #[test]
    fn test_sector_count_matches_ceil() {
        for size in [1u32, 1000, 65535, 65536, 65537, 131072, 200_000, 2 * 1024 * 1024] {
            let range = sectors_for_range(0, size);
            assert_eq!(range.start, 0);
            assert_eq!(range.end, size.div_ceil(65536));
        }
    }

    #[test]
    fn test_sectors_with_offset() {
        // Starts inside sector 0, spills into sector 1
        assert_eq!(sectors_for_range(0xFFF0, 0x20), 0..2);
        // Entirely inside sector 2
        assert_eq!(sectors_for_range(0x20010, 0x100), 2..3);
        // Ends exactly at a sector boundary
        assert_eq!(sectors_for_range(0x10000, 0x10000), 1..2);
    }

    #[test]
    fn test_chunks_cover_transfer() {
        let chunks: Vec<Chunk> = TransferSession::new(0x100, 2500).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], Chunk { offset: 0x100, image_len: 1024, transfer_len: 1024 });
        assert_eq!(chunks[1].offset, 0x100 + 1024);
        assert_eq!(chunks[2], Chunk { offset: 0x100 + 2048, image_len: 452, transfer_len: 456 });
    }

    #[test]
    fn test_empty_transfer_has_no_chunks() {
        let mut xfer = TransferSession::new(0, 0);
        assert!(xfer.next_chunk().is_none());
        assert!(xfer.sectors().is_empty());
    }

    #[test]
    fn test_cursor_advances() {
        let mut xfer = TransferSession::new(0, 1030);
        xfer.next_chunk();
        assert_eq!(xfer.position(), 1024);
        let last = xfer.next_chunk().unwrap();
        assert_eq!(last.image_len, 6);
        assert_eq!(last.transfer_len, 8);
        assert_eq!(xfer.position(), 1030);
        assert!(xfer.next_chunk().is_none());
    }
}
