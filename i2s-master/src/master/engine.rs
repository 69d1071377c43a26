//! Steady-state frame exchange.
//!
//! ```text
//! PRELOAD ──► RUN_EVEN ──► RUN_ODD ──► FRAME_COMPLETE ──► (continue | restart | shutdown)
//!                ▲                           │
//!                └───────── continue ────────┘
//! ```
//!
//! Each half-frame toggles the frame clock, feeds a generated bit clock the
//! square wave for the half-frame after it, then moves one word over every data line. Output words for a
//! frame are written first, input words are read after them in the same
//! half-frame window, so no line ever runs a half-frame ahead of another.
//!
//! At the end of a frame the application is asked for the *next* frame's
//! output while the current one is still leaving the lines (one frame of
//! pipeline latency), is handed the frame just captured, and is polled for a
//! restart.

use log::{error, info};

use super::ports::FRAME_CLOCK_PRELOAD;
use super::I2sMaster;
use crate::bits::{bclk_pattern, bclk_words_per_half_frame};
use crate::callback::I2sCallback;
use crate::config::{BusConfig, ClockGeneration, RestartSignal};
use crate::error::Error;
use crate::frame::{Frame, Phase};
use crate::port::{ClockBlock, InputLine, OutputLine};

/// How a run of the exchange loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Outcome {
    /// Negotiate again.
    Restart,
    /// Return to the caller.
    Shutdown,
}

impl<O, I, C, E> I2sMaster<O, I, C>
where
    O: OutputLine<Error = E>,
    I: InputLine<Error = E>,
    C: ClockBlock<Error = E>,
{
    /// Preload the lines, start the bit clock and exchange frames until the
    /// application signals a restart or shutdown.
    pub(super) fn exchange<A: I2sCallback>(
        &mut self,
        app: &mut A,
        config: &BusConfig,
        shift: u32,
    ) -> Result<Outcome, Error<E>> {
        let mut out = Frame::new(self.dout.len());
        let mut inp = Frame::new(self.din.len());

        self.preload(app, config, shift, &mut out)?;
        info!(
            "i2s: running with {} output and {} input lines",
            self.dout.len(),
            self.din.len()
        );

        let mut frame_clock = FRAME_CLOCK_PRELOAD;
        loop {
            self.half_frame(Phase::Even, shift, &mut frame_clock, &out, &mut inp)?;
            self.half_frame(Phase::Odd, shift, &mut frame_clock, &out, &mut inp)?;

            app.send(out.as_mut_slice());
            app.receive(inp.as_slice());

            match app.restart_check() {
                RestartSignal::NoRestart => {}
                RestartSignal::Restart => {
                    if self.generation == ClockGeneration::Divider {
                        error!("i2s: restart is not implemented for the hardware divider clock");
                        // The restart error takes precedence over a failed stop
                        self.clock.stop().ok();
                        return Err(Error::RestartNotImplemented);
                    }
                    self.halt()?;
                    return Ok(Outcome::Restart);
                }
                RestartSignal::Shutdown => {
                    self.halt()?;
                    return Ok(Outcome::Shutdown);
                }
            }
        }
    }

    /// Transfer one half-frame on every line.
    #[inline(always)]
    fn half_frame(
        &mut self,
        phase: Phase,
        shift: u32,
        frame_clock: &mut u32,
        out: &Frame,
        inp: &mut Frame,
    ) -> Result<(), Error<E>> {
        *frame_clock = !*frame_clock;
        self.lrclk.write_word(*frame_clock).map_err(Error::Hardware)?;

        if self.generation == ClockGeneration::Generated {
            self.feed_bclk(shift)?;
        }

        for (n, line) in self.dout.iter_mut().enumerate() {
            line.write_word(out.wire_word(n, phase))
                .map_err(Error::Hardware)?;
        }
        for (n, line) in self.din.iter_mut().enumerate() {
            let word = line.read_word().map_err(Error::Hardware)?;
            inp.store_wire_word(n, phase, word);
        }
        Ok(())
    }

    /// Queue one half-frame of square wave on a generated bit-clock line.
    pub(super) fn feed_bclk(&mut self, shift: u32) -> Result<(), Error<E>> {
        for index in 0..bclk_words_per_half_frame(shift) {
            self.bclk
                .write_word(bclk_pattern(shift, index))
                .map_err(Error::Hardware)?;
        }
        Ok(())
    }
}
