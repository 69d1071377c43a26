//! Driver errors.
//!
//! Every variant is fatal: the driver stops and hands the error back instead
//! of running a misconfigured bus.

use core::fmt;

/// Line direction, used to report line count errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Data out of the master.
    Output,
    /// Data into the master.
    Input,
}

/// I2S master errors, generic over the hardware error type `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// A line or clock operation failed.
    Hardware(E),
    /// Neither output nor input data lines were provided.
    NoLines,
    /// More data lines than [`MAX_LINES`](crate::constants::MAX_LINES).
    TooManyLines {
        /// Direction that overflowed.
        direction: Direction,
    },
    /// The master-to-bit clock ratio is not a supported power of two.
    InvalidRatio(u32),
    /// The application asked for a bus type this driver does not run (TDM).
    UnsupportedSetup,
    /// A restart was requested on the hardware divider clock path.
    RestartNotImplemented,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Hardware(e) => write!(f, "hardware error: {e:?}"),
            Error::NoLines => f.write_str("must provide at least one data output or input line"),
            Error::TooManyLines { direction } => {
                write!(f, "too many {direction:?} lines")
            }
            Error::InvalidRatio(ratio) => {
                write!(f, "mclk/bclk ratio {ratio} is not a supported power of two")
            }
            Error::UnsupportedSetup => f.write_str("only I2S bus configurations are supported"),
            Error::RestartNotImplemented => {
                f.write_str("restart is not implemented for the hardware divider clock")
            }
        }
    }
}
