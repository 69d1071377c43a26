use crate::config::{BusSetup, RestartSignal};
use crate::frame::Sample;

/// Application side of the I2S master.
///
/// The driver calls into this trait from its real-time loop. `send()`,
/// `receive()` and `restart_check()` run once per frame inside the bus timing
/// budget: an implementation that blocks for longer than a frame makes the bus
/// glitch.
pub trait I2sCallback {
    /// Return the bus configuration. Called once per negotiation cycle.
    fn init(&mut self) -> BusSetup;

    /// Return the restart command. Called once per completed frame.
    fn restart_check(&mut self) -> RestartSignal;

    /// Accept the frame just captured: `2 × input lines` samples, line `i`'s
    /// even half-frame at `2i` and odd half-frame at `2i + 1`.
    fn receive(&mut self, samples: &[Sample]);

    /// Fill the next frame to transmit: `2 × output lines` samples, laid out
    /// like [`receive()`](Self::receive).
    fn send(&mut self, samples: &mut [Sample]);
}

impl<T: I2sCallback + ?Sized> I2sCallback for &mut T {
    fn init(&mut self) -> BusSetup {
        (**self).init()
    }

    fn restart_check(&mut self) -> RestartSignal {
        (**self).restart_check()
    }

    fn receive(&mut self, samples: &[Sample]) {
        (**self).receive(samples)
    }

    fn send(&mut self, samples: &mut [Sample]) {
        (**self).send(samples)
    }
}
