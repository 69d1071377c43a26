//! Clock and line programming.
//!
//! After [`init_ports`](I2sMaster::init_ports) every line shifts on the bit
//! clock (the bit-clock line itself excepted), and after
//! [`preload`](I2sMaster::preload) all of them hold their first word at a
//! common tick position, so that starting the bit clock starts every line in
//! phase.
//!
//! ```text
//! tick         0        off      off+32                 off+64
//! lrclk        |  high (preload) |  low  (even)         |  high (odd)
//! dout[n]           |  0 (preload)       |  even word         |  odd ...
//! din[n]                         armed → |  even capture      |  odd ...
//! ```
//!
//! `off` is the mode's data offset: 1 bit in standard I2S, 0 when left
//! justified. A generated bit clock is fed two half-frames here and one per
//! half-frame afterwards, so the last tick of a delayed word is always
//! queued before that word is waited on.

use super::I2sMaster;
use crate::callback::I2sCallback;
use crate::config::{BusConfig, ClockGeneration};
use crate::constants::WORD_BITS;
use crate::error::Error;
use crate::frame::Frame;
use crate::port::{ClockBlock, InputLine, LineClock, OutputLine};

/// Frame clock word for the preload half-frame: the odd level of the
/// frame before the first one.
pub(super) const FRAME_CLOCK_PRELOAD: u32 = u32::MAX;

impl<O, I, C, E> I2sMaster<O, I, C>
where
    O: OutputLine<Error = E>,
    I: InputLine<Error = E>,
    C: ClockBlock<Error = E>,
{
    /// Program the bit clock and attach every line to it.
    pub(super) fn init_ports(&mut self, shift: u32) -> Result<(), Error<E>> {
        match self.generation {
            ClockGeneration::Divider => {
                self.clock
                    .divide_master(1 << shift)
                    .map_err(Error::Hardware)?;
                self.bclk
                    .configure(LineClock::BitClockOutput, true)
                    .map_err(Error::Hardware)?;
            }
            ClockGeneration::Generated => {
                self.clock.start_master().map_err(Error::Hardware)?;
                self.bclk
                    .configure(LineClock::MasterClock, true)
                    .map_err(Error::Hardware)?;
                self.clock.source_from_line().map_err(Error::Hardware)?;
            }
        }

        self.lrclk
            .configure(LineClock::BitClock, true)
            .map_err(Error::Hardware)?;
        for line in self.dout.iter_mut() {
            line.configure(LineClock::BitClock, false)
                .map_err(Error::Hardware)?;
        }
        for line in self.din.iter_mut() {
            line.configure(LineClock::BitClock).map_err(Error::Hardware)?;
        }
        Ok(())
    }

    /// Queue the first half-frame, fetch the first frame to send, then start
    /// the bit clock.
    ///
    /// The preload half-frame carries zeros on every data output; inputs are
    /// armed to capture from the first real half-frame on.
    pub(super) fn preload<A: I2sCallback>(
        &mut self,
        app: &mut A,
        config: &BusConfig,
        shift: u32,
        out: &mut Frame,
    ) -> Result<(), Error<E>> {
        for line in self.dout.iter_mut() {
            line.clear().map_err(Error::Hardware)?;
        }
        for line in self.din.iter_mut() {
            line.clear().map_err(Error::Hardware)?;
        }
        self.lrclk.clear().map_err(Error::Hardware)?;
        if self.generation == ClockGeneration::Generated {
            self.bclk.clear().map_err(Error::Hardware)?;
        }

        app.send(out.as_mut_slice());

        let offset = config.mode.data_offset();
        for line in self.dout.iter_mut() {
            line.write_word_at(offset, 0).map_err(Error::Hardware)?;
        }
        self.lrclk
            .write_word_at(0, FRAME_CLOCK_PRELOAD)
            .map_err(Error::Hardware)?;
        for line in self.din.iter_mut() {
            line.arm_at(offset + WORD_BITS as u16)
                .map_err(Error::Hardware)?;
        }

        self.clock.start().map_err(Error::Hardware)?;
        if self.generation == ClockGeneration::Generated {
            // The generated bit clock stays one half-frame ahead of the data
            // lines: a delayed word ends a tick into the following half-frame.
            self.feed_bclk(shift)?;
            self.feed_bclk(shift)?;
        }
        Ok(())
    }
}
