//! Byte and bit ordering for pixel data handed to window systems.
//!
//! Everything that depends on how a 32-bit ARGB word or a packed 1-bit row is
//! laid out in memory lives here, so the compositor and the mask scanner stay
//! endianness-agnostic.

/// Byte order of a 32-bit ARGB pixel in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// B, G, R, A in ascending addresses.
    Little,
    /// A, R, G, B in ascending addresses.
    Big,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Lay out one ARGB pixel as four bytes.
    pub fn pack_argb(self, a: u8, r: u8, g: u8, b: u8) -> [u8; 4] {
        match self {
            ByteOrder::Little => [b, g, r, a],
            ByteOrder::Big => [a, r, g, b],
        }
    }

    /// Bit order used for 1-bit rasters on a machine of this byte order.
    pub fn bitmap_bit_order(self) -> BitOrder {
        match self {
            ByteOrder::Little => BitOrder::LsbFirst,
            ByteOrder::Big => BitOrder::MsbFirst,
        }
    }
}

/// Order of pixels within one byte of a packed 1-bit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// Leftmost pixel is bit 0.
    LsbFirst,
    /// Leftmost pixel is bit 7.
    MsbFirst,
}

impl BitOrder {
    pub fn native() -> Self {
        ByteOrder::native().bitmap_bit_order()
    }

    /// Mask selecting pixel `index` (0..8, left to right) within a byte.
    #[inline]
    pub fn mask(self, index: usize) -> u8 {
        debug_assert!(index < 8);
        match self {
            BitOrder::LsbFirst => 1 << index,
            BitOrder::MsbFirst => 0x80 >> index,
        }
    }
}

/// Fast `c * a / 255` with rounding, as used for 8-bit premultiplication.
#[inline]
pub fn mul_div_255(c: u8, a: u8) -> u8 {
    let t = c as u32 * a as u32 + 0x80;
    (((t >> 8) + t) >> 8) as u8
}
