//! Bit-level helpers for the serial wire format.
//!
//! Data lines shift words out least-significant bit first, while I2S puts the
//! most-significant bit on the wire first. Every word crossing the wire
//! boundary is therefore bit-reversed. On Armv7 targets [`bitrev`] compiles to
//! a single `RBIT` instruction; elsewhere the portable fallback is used.

use crate::constants::{MAX_RATIO_LOG2, WORD_BITS};

/// Reverse the bit order of a 32-bit word (bit 0 ⇄ bit 31).
///
/// Maps to ARM `RBIT`.
#[inline(always)]
pub fn bitrev(word: u32) -> u32 {
    #[cfg(all(target_arch = "arm", target_feature = "v7"))]
    {
        let out: u32;
        unsafe {
            core::arch::asm!(
                "rbit {out}, {word}",
                out = out(reg) out,
                word = in(reg) word,
                options(pure, nomem, nostack),
            );
        }
        out
    }
    #[cfg(not(all(target_arch = "arm", target_feature = "v7")))]
    {
        word.reverse_bits()
    }
}

/// Derive the divide shift from a master-to-bit clock ratio.
///
/// Returns `log2(ratio)` as the leading-zero count of the reversed ratio, or
/// `None` if `ratio` is zero or not a power of two.
#[inline]
pub fn ratio_log2(ratio: u32) -> Option<u32> {
    if !ratio.is_power_of_two() {
        return None;
    }
    Some(bitrev(ratio).leading_zeros())
}

/// Number of master-clock-rate words the bit-clock line consumes per
/// half-frame when the bit clock is generated in software.
///
/// A half-frame is 32 bit clocks of `1 << shift` master ticks each, and each
/// line word covers 32 master ticks.
#[inline]
pub const fn bclk_words_per_half_frame(shift: u32) -> u32 {
    1 << shift
}

/// Square-wave word `index` (within a half-frame) for a software bit clock
/// running at `mclk >> shift`.
///
/// Each bit clock period starts with its low level. `shift` must be in
/// `1..=MAX_RATIO_LOG2`.
pub fn bclk_pattern(shift: u32, index: u32) -> u32 {
    debug_assert!(shift >= 1 && shift <= MAX_RATIO_LOG2);

    let half = 1u32 << (shift - 1);
    if half >= WORD_BITS {
        if (index * WORD_BITS / half) & 1 == 0 {
            0
        } else {
            u32::MAX
        }
    } else {
        let ones = (1u32 << half) - 1;
        let mut word = 0;
        let mut bit = half;
        while bit < WORD_BITS {
            word |= ones << bit;
            bit += 2 * half;
        }
        word
    }
}
