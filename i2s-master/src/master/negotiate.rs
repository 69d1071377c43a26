//! Configuration negotiation with the application.

use log::{debug, error};

use super::I2sMaster;
use crate::callback::I2sCallback;
use crate::config::{BusConfig, BusSetup};
use crate::error::Error;
use crate::port::{ClockBlock, InputLine, OutputLine};

impl<O, I, C, E> I2sMaster<O, I, C>
where
    O: OutputLine<Error = E>,
    I: InputLine<Error = E>,
    C: ClockBlock<Error = E>,
{
    /// Ask the application for a configuration and check it against the
    /// lines and clock path. Returns the configuration with its divide shift.
    ///
    /// Nothing touches the hardware before this succeeds.
    pub(super) fn negotiate<A: I2sCallback>(
        &mut self,
        app: &mut A,
    ) -> Result<(BusConfig, u32), Error<E>> {
        let config = match app.init() {
            BusSetup::I2s(config) => config,
            BusSetup::Tdm(tdm) => {
                error!(
                    "i2s: TDM configuration ({} channels) requested from the I2S master",
                    tdm.channels_per_frame
                );
                return Err(Error::UnsupportedSetup);
            }
        };

        if self.dout.is_empty() && self.din.is_empty() {
            error!("i2s: must provide data output or input lines");
            return Err(Error::NoLines);
        }

        let shift = config.validate::<E>(self.generation).map_err(|e| {
            error!(
                "i2s: unsupported config.mclk_bclk_ratio={} for {:?} clock",
                config.mclk_bclk_ratio, self.generation
            );
            e
        })?;

        debug!(
            "i2s: config.mclk_bclk_ratio={} mode={:?} shift={}",
            config.mclk_bclk_ratio, config.mode, shift
        );
        Ok((config, shift))
    }
}
