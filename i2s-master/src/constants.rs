/// Words per frame on each data line (one even, one odd half-frame).
pub const FRAME_WORDS: usize = 2;

/// Bits per serial word.
pub const WORD_BITS: u32 = 32;

/// Maximum number of data lines per direction.
pub const MAX_LINES: usize = 4;

/// Maximum number of samples in one direction of a frame.
pub const MAX_FRAME_SAMPLES: usize = MAX_LINES * FRAME_WORDS;

/// Largest supported `log2(mclk_bclk_ratio)`; the ratio range is `1..=256`.
pub const MAX_RATIO_LOG2: u32 = 8;

/// Bit clocks per frame (two 32-bit half-frames).
pub const BCLKS_PER_FRAME: u32 = WORD_BITS * FRAME_WORDS as u32;
