//! Single-bit access inside fixed-width unsigned words.
//!
//! Terminal status words, alarm masks and GNSS attribute bytes are all
//! bit-packed.  These helpers read or write one bit by its ordinal position
//! (bit 0 is the least significant bit).
//!
//! Positions outside the word's width are tolerated: [`get_bit`] answers
//! `false` and [`set_bit`] leaves the word untouched.  Terminal firmware in
//! the field routinely sends attribute words wider or narrower than the
//! platform expects, and downstream decoders rely on this leniency.

/// An unsigned integer that can be addressed bit by bit.
///
/// Implemented for `u8`, `u16` and `u32`, the three word widths used on the
/// wire.
pub trait BitWord: Copy {
    /// Width of the word in bits.
    const BITS: u32;

    /// Returns the bit at `position`, or `false` when out of range.
    fn bit(self, position: u32) -> bool;

    /// Sets or clears the bit at `position`.  Out-of-range positions are a no-op.
    fn set_bit(&mut self, position: u32, on: bool);
}

macro_rules! impl_bit_word {
    ($($ty:ty),*) => {
        $(
            impl BitWord for $ty {
                const BITS: u32 = <$ty>::BITS;

                #[inline]
                fn bit(self, position: u32) -> bool {
                    position < Self::BITS && (self >> position) & 1 == 1
                }

                #[inline]
                fn set_bit(&mut self, position: u32, on: bool) {
                    if position >= Self::BITS {
                        return;
                    }
                    let mask: $ty = 1 << position;
                    if on {
                        *self |= mask;
                    } else {
                        *self &= !mask;
                    }
                }
            }
        )*
    };
}

impl_bit_word!(u8, u16, u32);

/// Returns the bit of `word` at `position`.
///
/// # Examples
///
/// ```rust
/// use jtt_core::bits::get_bit;
///
/// assert!(get_bit(0b0000_0010u8, 1));
/// assert!(!get_bit(0xFFu8, 8)); // out of range
/// ```
#[inline]
pub fn get_bit<W: BitWord>(word: W, position: u32) -> bool {
    word.bit(position)
}

/// Sets (`on == true`) or clears the bit of `word` at `position`, leaving
/// every other bit unchanged.
///
/// # Examples
///
/// ```rust
/// use jtt_core::bits::set_bit;
///
/// let mut word = 0u16;
/// set_bit(&mut word, 13, true);
/// assert_eq!(word, 0x2000);
/// set_bit(&mut word, 16, true); // out of range, ignored
/// assert_eq!(word, 0x2000);
/// ```
#[inline]
pub fn set_bit<W: BitWord>(word: &mut W, position: u32, on: bool) {
    word.set_bit(position, on);
}
