//! Hardware line abstraction consumed by the I2S master.
//!
//! A *line* is a buffered 32-bit serial port: output lines shift words out
//! least-significant bit first on every tick of their clock, input lines shift
//! words in the same way. Each line keeps a tick counter (its *time*) so that
//! several lines clocked from the same source can be started at exactly the
//! same tick.
//!
//! Blocking calls ([`OutputLine::write_word`], [`InputLine::read_word`],
//! [`OutputLine::sync`]) are the only suspension points of the driver; they
//! return on the hardware clock edge that completes the transfer.
//!
//! Errors follow `embedded-hal`: every trait extends
//! [`ErrorType`](embedded_hal::digital::ErrorType), so a HAL can reuse its
//! existing pin error type.

pub use embedded_hal::digital::{Error, ErrorKind, ErrorType};

/// Clock that shifts a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClock {
    /// Shift on bit-clock edges (data and frame-clock lines).
    BitClock,
    /// Shift on master-clock edges (software-generated bit clock).
    MasterClock,
    /// Drive the bit clock itself onto the line (hardware divider).
    BitClockOutput,
}

/// A serial output line.
pub trait OutputLine: ErrorType {
    /// Set the line's clock and drive `initial` until the first word.
    fn configure(&mut self, clock: LineClock, initial: bool) -> Result<(), Self::Error>;

    /// Discard any buffered, not yet transmitted data.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Queue `word` so that its first bit goes out at tick `time`.
    fn write_word_at(&mut self, time: u16, word: u32) -> Result<(), Self::Error>;

    /// Queue `word` directly after the previous one, blocking while the
    /// transfer buffer is full.
    fn write_word(&mut self, word: u32) -> Result<(), Self::Error>;

    /// Block until all queued data has left the line.
    fn sync(&mut self) -> Result<(), Self::Error>;
}

/// A serial input line.
pub trait InputLine: ErrorType {
    /// Set the line's clock.
    fn configure(&mut self, clock: LineClock) -> Result<(), Self::Error>;

    /// Discard any captured, not yet read data.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Start capturing with the bit sampled at tick `time`.
    fn arm_at(&mut self, time: u16) -> Result<(), Self::Error>;

    /// Block until the next 32-bit word has been captured and return it.
    fn read_word(&mut self) -> Result<u32, Self::Error>;
}

/// The clock block that produces the bit clock shared by all lines.
pub trait ClockBlock: ErrorType {
    /// Start the master clock input used as the source of a generated bit
    /// clock.
    fn start_master(&mut self) -> Result<(), Self::Error>;

    /// Stop the master clock input.
    fn stop_master(&mut self) -> Result<(), Self::Error>;

    /// Produce the bit clock by dividing the master clock by `ratio`.
    fn divide_master(&mut self, ratio: u32) -> Result<(), Self::Error>;

    /// Take the bit clock from the signal driven on the bit-clock line.
    fn source_from_line(&mut self) -> Result<(), Self::Error>;

    /// Start the bit clock. Tick zero of every line clocked from it is the
    /// first edge after this call.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Stop the bit clock.
    fn stop(&mut self) -> Result<(), Self::Error>;
}
