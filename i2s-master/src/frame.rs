//! Frame buffers and wire word conversion.
//!
//! A frame holds two samples per data line, interleaved by line:
//!
//! ```text
//! index:   0        1        2        3       ...  2i+0     2i+1
//!        line0/E  line0/O  line1/E  line1/O   ...  linei/E  linei/O
//! ```
//!
//! `E`/`O` are the even and odd half-frames. Samples are stored in ordinary
//! integer order and converted to wire order with [`bitrev`] on the way out
//! and back on the way in.

use crate::bits::bitrev;
use crate::constants::{FRAME_WORDS, MAX_FRAME_SAMPLES, MAX_LINES};

/// A signed 32-bit sample. Codecs with fewer bits use the most significant
/// ones; the remaining low bits are don't-care.
pub type Sample = i32;

/// Half of a frame; one frame-clock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// First half-frame (frame clock low).
    Even,
    /// Second half-frame (frame clock high).
    Odd,
}

impl Phase {
    /// Offset of this half-frame within a line's sample pair.
    pub const fn index(self) -> usize {
        match self {
            Phase::Even => 0,
            Phase::Odd => 1,
        }
    }
}

/// Position of `line`'s `phase` sample within a frame.
#[inline(always)]
pub const fn sample_index(line: usize, phase: Phase) -> usize {
    line * FRAME_WORDS + phase.index()
}

/// One direction of a frame: `2 × lines` interleaved samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    samples: [Sample; MAX_FRAME_SAMPLES],
    len: usize,
}

impl Frame {
    /// Create a silent frame for `lines` data lines.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `lines <= MAX_LINES`.
    pub const fn new(lines: usize) -> Self {
        debug_assert!(lines <= MAX_LINES);
        Frame {
            samples: [0; MAX_FRAME_SAMPLES],
            len: lines * FRAME_WORDS,
        }
    }

    /// Number of data lines the frame covers.
    pub const fn lines(&self) -> usize {
        self.len / FRAME_WORDS
    }

    /// Number of samples in the frame.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the frame has no samples (no lines in this direction).
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The frame's samples.
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples[..self.len]
    }

    /// The frame's samples, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.samples[..self.len]
    }

    /// Set every sample to zero.
    pub fn silence(&mut self) {
        self.as_mut_slice().fill(0);
    }

    /// Word to put on `line`'s wire for `phase`.
    #[inline(always)]
    pub fn wire_word(&self, line: usize, phase: Phase) -> u32 {
        bitrev(self.samples[sample_index(line, phase)] as u32)
    }

    /// Store a word captured from `line`'s wire during `phase`.
    #[inline(always)]
    pub fn store_wire_word(&mut self, line: usize, phase: Phase, word: u32) {
        self.samples[sample_index(line, phase)] = bitrev(word) as Sample;
    }
}
