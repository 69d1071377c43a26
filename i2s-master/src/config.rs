//! Bus configuration negotiated with the application.
//!
//! A fresh [`BusSetup`] is obtained from
//! [`I2sCallback::init()`](crate::callback::I2sCallback::init) at the start of
//! every negotiation cycle, including after a restart. The accepted
//! [`BusConfig`] is immutable for the lifetime of one engine run.

use crate::bits::ratio_log2;
use crate::constants::{BCLKS_PER_FRAME, MAX_RATIO_LOG2};
use crate::error::Error;

/// Frame clock to data alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// The frame clock transitions one bit clock ahead of the data.
    #[default]
    Standard,
    /// The frame clock and data are phase aligned.
    LeftJustified,
}

impl Mode {
    /// Bit clocks by which every data line lags the frame clock.
    pub const fn data_offset(self) -> u16 {
        match self {
            Mode::Standard => 1,
            Mode::LeftJustified => 0,
        }
    }
}

/// How the bit clock is derived from the master clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockGeneration {
    /// A hardware divider produces the bit clock.
    ///
    /// Restarting the bus on this path is not implemented.
    Divider,
    /// The bit-clock line is clocked by the master clock and fed a
    /// square-wave pattern; the bit clock is taken from that line.
    #[default]
    Generated,
}

/// I2S bus configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Ratio between the master clock and the bit clock. Must be a power of two.
    pub mclk_bclk_ratio: u32,
    /// Frame clock mode.
    pub mode: Mode,
}

impl BusConfig {
    /// Create a configuration.
    pub const fn new(mclk_bclk_ratio: u32, mode: Mode) -> Self {
        BusConfig {
            mclk_bclk_ratio,
            mode,
        }
    }

    /// Check the ratio against the clock path and return its divide shift.
    ///
    /// The ratio must be a power of two no larger than `1 << MAX_RATIO_LOG2`.
    /// A software-generated bit clock needs at least two master ticks per
    /// bit clock.
    pub fn validate<E>(&self, generation: ClockGeneration) -> Result<u32, Error<E>> {
        let shift = ratio_log2(self.mclk_bclk_ratio)
            .ok_or(Error::InvalidRatio(self.mclk_bclk_ratio))?;
        if shift > MAX_RATIO_LOG2 {
            return Err(Error::InvalidRatio(self.mclk_bclk_ratio));
        }
        if generation == ClockGeneration::Generated && shift == 0 {
            return Err(Error::InvalidRatio(self.mclk_bclk_ratio));
        }
        Ok(shift)
    }

    /// Bit clock frequency for a given master clock.
    pub const fn bclk_hz(&self, mclk_hz: u32) -> u32 {
        mclk_hz / self.mclk_bclk_ratio
    }

    /// Frame (sample) rate for a given master clock.
    pub const fn sample_rate_hz(&self, mclk_hz: u32) -> u32 {
        self.bclk_hz(mclk_hz) / BCLKS_PER_FRAME
    }
}

impl Default for BusConfig {
    /// 256×Fs master clock with a 64×Fs bit clock.
    fn default() -> Self {
        BusConfig::new(4, Mode::Standard)
    }
}

/// TDM bus configuration.
///
/// Accepted from the application so that it can express its intent, but the
/// I2S master does not drive TDM buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdmConfig {
    /// Bit clocks by which the sync pulse leads the data (`0..=31`).
    pub offset: i32,
    /// Length of the sync pulse in bit clocks.
    pub sync_len: u32,
    /// Channels in a TDM frame. Must be a power of two.
    pub channels_per_frame: u32,
}

/// The application's answer to an init request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSetup {
    /// Drive an I2S bus.
    I2s(BusConfig),
    /// Drive a TDM bus.
    Tdm(TdmConfig),
}

/// Restart command polled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartSignal {
    /// Keep running.
    #[default]
    NoRestart,
    /// Stop the bus and negotiate a new configuration.
    Restart,
    /// Stop the bus and return.
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    type E = Error<()>;

    #[test]
    fn validate_returns_shift() {
        let config = BusConfig::new(4, Mode::Standard);
        assert_eq!(config.validate::<()>(ClockGeneration::Generated), Ok(2));
        assert_eq!(config.validate::<()>(ClockGeneration::Divider), Ok(2));
        assert_eq!(
            BusConfig::new(256, Mode::LeftJustified).validate::<()>(ClockGeneration::Divider),
            Ok(8)
        );
    }

    #[test]
    fn validate_rejects_non_power_of_two() {
        for ratio in [0, 3, 6, 12, 100] {
            let config = BusConfig::new(ratio, Mode::Standard);
            let result: Result<u32, E> = config.validate(ClockGeneration::Divider);
            assert_eq!(result, Err(Error::InvalidRatio(ratio)), "ratio {ratio}");
        }
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let result: Result<u32, E> =
            BusConfig::new(512, Mode::Standard).validate(ClockGeneration::Divider);
        assert_eq!(result, Err(Error::InvalidRatio(512)));
    }

    #[test]
    fn unity_ratio_needs_hardware_divider() {
        let config = BusConfig::new(1, Mode::Standard);
        assert_eq!(config.validate::<()>(ClockGeneration::Divider), Ok(0));
        let result: Result<u32, E> = config.validate(ClockGeneration::Generated);
        assert_eq!(result, Err(Error::InvalidRatio(1)));
    }

    #[test]
    fn frequencies() {
        let config = BusConfig::new(4, Mode::Standard);
        assert_eq!(config.bclk_hz(24_576_000), 6_144_000);
        assert_eq!(config.sample_rate_hz(24_576_000), 96_000);
        assert_eq!(BusConfig::new(8, Mode::Standard).sample_rate_hz(24_576_000), 48_000);
    }

    #[test]
    fn data_offset_per_mode() {
        assert_eq!(Mode::Standard.data_offset(), 1);
        assert_eq!(Mode::LeftJustified.data_offset(), 0);
    }
}
