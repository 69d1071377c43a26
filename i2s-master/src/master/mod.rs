//! The I2S bus master.
//!
//! [`I2sMaster`] owns the data lines, the bit- and frame-clock lines and the
//! clock block, and runs the bus against an [`I2sCallback`] until the
//! application asks it to shut down.
//!
//! ## Control flow
//!
//! ```text
//!        ┌────────────────────────────────────────────────┐
//!        ▼                                                │ RESTART
//!   negotiate ──► init_ports ──► preload ──► exchange ────┤
//!   (init())      (dividers,     (send(),    (even/odd    │ SHUTDOWN
//!                  line clocks)   align)      half-frames)▼
//!                                                       shutdown
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut master = I2sMaster::new(
//!     [dout0, dout1],
//!     [din0],
//!     bclk,
//!     lrclk,
//!     clock_block,
//!     ClockGeneration::Generated,
//! )?;
//! master.run(&mut app)?;
//! let (dout, din, bclk, lrclk, clock_block) = master.free();
//! ```

mod engine;
mod negotiate;
mod ports;

#[cfg(test)]
mod integration_tests;

use heapless::Vec;
use log::info;

use crate::callback::I2sCallback;
use crate::config::ClockGeneration;
use crate::constants::MAX_LINES;
use crate::error::{Direction, Error};
use crate::port::{ClockBlock, InputLine, OutputLine};

use engine::Outcome;

/// I2S bus master.
///
/// Generic over the output line `O` (data outputs, bit clock and frame
/// clock), input line `I` and clock block `C`, which share one hardware error
/// type.
pub struct I2sMaster<O, I, C> {
    dout: Vec<O, MAX_LINES>,
    din: Vec<I, MAX_LINES>,
    bclk: O,
    lrclk: O,
    clock: C,
    generation: ClockGeneration,
}

impl<O, I, C, E> I2sMaster<O, I, C>
where
    O: OutputLine<Error = E>,
    I: InputLine<Error = E>,
    C: ClockBlock<Error = E>,
{
    /// Create a master from its lines.
    ///
    /// Data line `n` carries channel `n` of the frame. Either set of data
    /// lines may be empty; both being empty is reported when the bus is run.
    ///
    /// # Errors
    ///
    /// [`Error::TooManyLines`] if either set has more than
    /// [`MAX_LINES`] lines.
    pub fn new<DO, DI>(
        dout: DO,
        din: DI,
        bclk: O,
        lrclk: O,
        clock: C,
        generation: ClockGeneration,
    ) -> Result<Self, Error<E>>
    where
        DO: IntoIterator<Item = O>,
        DI: IntoIterator<Item = I>,
    {
        let mut outputs = Vec::new();
        for line in dout {
            outputs.push(line).map_err(|_| Error::TooManyLines {
                direction: Direction::Output,
            })?;
        }
        let mut inputs = Vec::new();
        for line in din {
            inputs.push(line).map_err(|_| Error::TooManyLines {
                direction: Direction::Input,
            })?;
        }

        Ok(I2sMaster {
            dout: outputs,
            din: inputs,
            bclk,
            lrclk,
            clock,
            generation,
        })
    }

    /// Number of data output lines.
    pub fn num_out(&self) -> usize {
        self.dout.len()
    }

    /// Number of data input lines.
    pub fn num_in(&self) -> usize {
        self.din.len()
    }

    /// The bit clock generation path.
    pub fn generation(&self) -> ClockGeneration {
        self.generation
    }

    /// Run the bus until the application requests a shutdown.
    ///
    /// Each cycle negotiates a configuration with
    /// [`init()`](I2sCallback::init), programs the clocks and lines, and
    /// exchanges frames until [`restart_check()`](I2sCallback::restart_check)
    /// returns something other than
    /// [`NoRestart`](crate::config::RestartSignal::NoRestart). A restart
    /// starts the next cycle; a shutdown stops the clocks and returns.
    ///
    /// # Errors
    ///
    /// Any error is fatal and leaves the bus in an unspecified state.
    pub fn run<A: I2sCallback>(&mut self, app: &mut A) -> Result<(), Error<E>> {
        loop {
            let (config, shift) = self.negotiate(app)?;
            self.init_ports(shift)?;
            match self.exchange(app, &config, shift)? {
                Outcome::Restart => info!("i2s: restarting"),
                Outcome::Shutdown => {
                    info!("i2s: shut down");
                    return Ok(());
                }
            }
        }
    }

    /// Release the lines and clock block.
    pub fn free(self) -> (Vec<O, MAX_LINES>, Vec<I, MAX_LINES>, O, O, C) {
        (self.dout, self.din, self.bclk, self.lrclk, self.clock)
    }

    /// Stop the clocks on a frame boundary.
    ///
    /// The frame clock and every data output are drained first so that the
    /// last frame leaves the lines completely. Bit-clock words queued beyond
    /// that are dropped with the master clock.
    fn halt(&mut self) -> Result<(), Error<E>> {
        self.lrclk.sync().map_err(Error::Hardware)?;
        for line in self.dout.iter_mut() {
            line.sync().map_err(Error::Hardware)?;
        }
        self.clock.stop().map_err(Error::Hardware)?;
        if self.generation == ClockGeneration::Generated {
            self.clock.stop_master().map_err(Error::Hardware)?;
        }
        Ok(())
    }
}
