//! Bit-order reversal for the flash data path
//!
//! The controller stores every byte with its bit order reversed relative
//! to the image byte stream, so each byte is mirrored on its way to the
//! flash and again on its way back.

/// Lookup table: `MIRROR_LUT[b]` is `b` with bit 0 and bit 7 swapped, 1 and 6, etc.
pub const MIRROR_LUT: [u8; 256] = build_lut();

const fn build_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        lut[i] = (i as u8).reverse_bits();
        i += 1;
    }
    lut
}

/// Mirror the bits of a single byte
#[inline]
pub fn mirror_byte(val: u8) -> u8 {
    MIRROR_LUT[val as usize]
}

/// Mirror every byte of a buffer in place
pub fn mirror_in_place(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = mirror_byte(*b);
    }
}
