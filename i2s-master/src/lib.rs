//! # i2s-master
//!
//! A `no_std`, zero-allocation I2S bus master. It derives the bit clock from a
//! master clock at a power-of-two ratio, drives the frame clock, and moves
//! 32-bit samples over any number of parallel data lines (up to
//! [`constants::MAX_LINES`] per direction) in lock-step with the clock edges.
//! The application exchanges one interleaved frame per direction per frame
//! through the [`I2sCallback`] trait.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Bits | [`bits`] | Wire bit order (`RBIT`), ratio → shift, generated bit clock |
//! | Config | [`config`] | [`BusConfig`], [`BusSetup`], [`RestartSignal`], clock paths |
//! | Trait | [`port`] / [`callback`] | Hardware line abstraction and application callbacks |
//! | Frame | [`frame`] | Interleaved frame buffers, wire word conversion |
//! | Driver | [`master`] | Negotiation, clock/line programming, frame exchange, restart |
//! | Sim | `sim` | Software bus for host testing (feature-gated) |
//!
//! ## Quick start
//!
//! ```ignore
//! use i2s_master::{BusConfig, BusSetup, ClockGeneration, I2sCallback, I2sMaster, Mode,
//!                  RestartSignal, Sample};
//!
//! struct Passthrough { last: [Sample; 2] }
//!
//! impl I2sCallback for Passthrough {
//!     fn init(&mut self) -> BusSetup {
//!         BusSetup::I2s(BusConfig::new(4, Mode::Standard))
//!     }
//!     fn restart_check(&mut self) -> RestartSignal {
//!         RestartSignal::NoRestart
//!     }
//!     fn receive(&mut self, samples: &[Sample]) {
//!         self.last.copy_from_slice(samples);
//!     }
//!     fn send(&mut self, samples: &mut [Sample]) {
//!         samples.copy_from_slice(&self.last);
//!     }
//! }
//!
//! let mut master = I2sMaster::new([dout], [din], bclk, lrclk, clock_block,
//!                                 ClockGeneration::Generated)?;
//! master.run(&mut Passthrough { last: [0; 2] })?;
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `sim` | no | `sim` module: simulated lines and clock block |
//!
//! ## Bus parameters
//!
//! - **Word size:** 32 bits per half-frame per line, MSB first on the wire
//! - **Frame:** 64 bit clocks (two half-frames)
//! - **Sample rate:** `mclk / mclk_bclk_ratio / 64`
//! - **Ratio:** power of two, 1..=256 (2..=256 with a generated bit clock)

#![no_std]

pub mod constants;
pub mod bits;
pub mod config;
pub mod error;
pub mod port;
pub mod callback;
pub mod frame;
pub mod master;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use callback::I2sCallback;
pub use config::{BusConfig, BusSetup, ClockGeneration, Mode, RestartSignal, TdmConfig};
pub use error::Error;
pub use frame::{Frame, Phase, Sample};
pub use master::I2sMaster;
