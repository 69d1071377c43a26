//! Integration tests driving complete bus runs on the simulated hardware.
//!
//! Each test scripts the application side with a [`Scripted`] callback that
//! answers `init()` from a list of cycles, stops each cycle after a number of
//! frames, and records everything it sees. The event trace of the
//! [`SimBus`] is then checked for clocking and phase relationships:
//!
//! ```text
//! Scripted.init() → negotiate → init_ports → preload → exchange
//!     → send()/receive()/restart_check() per frame → restart | shutdown
//! ```

#[cfg(test)]
mod tests {
    use heapless::Vec;

    use crate::bits::bitrev;
    use crate::callback::I2sCallback;
    use crate::config::{BusConfig, BusSetup, ClockGeneration, Mode, RestartSignal, TdmConfig};
    use crate::constants::{MAX_FRAME_SAMPLES, WORD_BITS};
    use crate::error::Error;
    use crate::frame::Sample;
    use crate::master::I2sMaster;
    use crate::sim::{Event, InputSource, LineId, SimBus, SimClock, SimInput, SimOutput};

    const MCLK_HZ: u32 = 24_576_000;

    /// One negotiation cycle: the setup to answer, how many frames to run,
    /// and the signal that ends it.
    #[derive(Clone, Copy)]
    struct Cycle {
        setup: BusSetup,
        frames: u32,
        end: RestartSignal,
    }

    impl Cycle {
        const fn i2s(ratio: u32, mode: Mode, frames: u32, end: RestartSignal) -> Self {
            Cycle {
                setup: BusSetup::I2s(BusConfig::new(ratio, mode)),
                frames,
                end,
            }
        }
    }

    type Samples = Vec<Sample, MAX_FRAME_SAMPLES>;

    struct Scripted<'a> {
        bus: &'a SimBus,
        cycles: &'a [Cycle],
        cycle: usize,
        frame: u32,
        inits: u32,
        sent: Vec<Samples, 32>,
        received: Vec<Samples, 32>,
        checks: u32,
        /// Bit clock frequency seen from inside the callbacks, per cycle.
        bclk_hz: Vec<Option<u32>, 4>,
    }

    impl<'a> Scripted<'a> {
        fn new(bus: &'a SimBus, cycles: &'a [Cycle]) -> Self {
            Scripted {
                bus,
                cycles,
                cycle: 0,
                frame: 0,
                inits: 0,
                sent: Vec::new(),
                received: Vec::new(),
                checks: 0,
                bclk_hz: Vec::new(),
            }
        }
    }

    impl I2sCallback for Scripted<'_> {
        fn init(&mut self) -> BusSetup {
            self.inits += 1;
            self.bus.mark(self.inits);
            self.cycle = (self.inits - 1) as usize;
            self.frame = 0;
            self.cycles[self.cycle].setup
        }

        fn restart_check(&mut self) -> RestartSignal {
            self.checks += 1;
            self.frame += 1;
            let cycle = self.cycles[self.cycle];
            if self.frame == cycle.frames {
                self.bclk_hz.push(self.bus.bclk_hz()).unwrap();
                cycle.end
            } else {
                RestartSignal::NoRestart
            }
        }

        fn receive(&mut self, samples: &[Sample]) {
            self.received
                .push(Vec::from_slice(samples).unwrap())
                .unwrap();
        }

        fn send(&mut self, samples: &mut [Sample]) {
            let n = self.sent.len() as i32;
            for (i, sample) in samples.iter_mut().enumerate() {
                // Distinct per frame and slot, with low and sign bits set
                *sample = (n << 20) ^ (i as i32 * 0x0011_0001) ^ -0x4000_0000;
            }
            self.sent.push(Vec::from_slice(samples).unwrap()).unwrap();
        }
    }

    fn master<'a>(
        bus: &'a SimBus,
        outputs: usize,
        inputs: usize,
        generation: ClockGeneration,
    ) -> I2sMaster<SimOutput<'a>, SimInput<'a>, SimClock<'a>> {
        I2sMaster::new(
            (0..outputs).map(|n| bus.data_output(n)),
            (0..inputs).map(|n| bus.data_input(n)),
            bus.bclk(),
            bus.lrclk(),
            bus.clock(),
            generation,
        )
        .unwrap()
    }

    fn test_word(line: usize, half_frame: u32) -> u32 {
        0x9E37_79B9u32.wrapping_mul(half_frame + 1) ^ (line as u32)
    }

    // ---------------------------------------------------------------
    // 2 outputs, 1 input, ratio 4, standard mode
    // ---------------------------------------------------------------
    #[test]
    fn two_out_one_in_ratio_four() {
        for generation in [ClockGeneration::Generated, ClockGeneration::Divider] {
            let bus = SimBus::new(MCLK_HZ);
            bus.set_input(InputSource::Pattern(test_word));
            let cycles = [Cycle::i2s(4, Mode::Standard, 3, RestartSignal::Shutdown)];
            let mut app = Scripted::new(&bus, &cycles);
            let mut m = master(&bus, 2, 1, generation);

            assert_eq!(m.run(&mut app), Ok(()));

            assert_eq!(app.inits, 1);
            assert_eq!(app.checks, 3);
            assert_eq!(app.bclk_hz.as_slice(), &[Some(MCLK_HZ / 4)]);

            // Preload send plus one per frame, always 2 × outputs samples
            assert_eq!(app.sent.len(), 4);
            assert!(app.sent.iter().all(|s| s.len() == 4));

            // One receive per frame with the captured words bit-reversed
            assert_eq!(app.received.len(), 3);
            for (frame, samples) in app.received.iter().enumerate() {
                let even = 2 * frame as u32 + 1;
                assert_eq!(samples.len(), 2);
                assert_eq!(samples[0], bitrev(test_word(0, even)) as Sample);
                assert_eq!(samples[1], bitrev(test_word(0, even + 1)) as Sample);
            }

            // Each output word is the bit-reversed sample sent one frame earlier
            let events = bus.events();
            for line in 0..2 {
                let words: Vec<u32, 16> = events
                    .iter()
                    .filter_map(|e| match *e {
                        Event::Word { line: LineId::Out(n), word, .. } if n == line => Some(word),
                        _ => None,
                    })
                    .collect();
                assert_eq!(words.len(), 1 + 2 * 3);
                assert_eq!(words[0], 0, "preload half-frame is silent");
                for frame in 0..3 {
                    let sent = &app.sent[frame];
                    assert_eq!(words[1 + 2 * frame], bitrev(sent[2 * line] as u32));
                    assert_eq!(words[2 + 2 * frame], bitrev(sent[2 * line + 1] as u32));
                }
            }
            assert!(!bus.clock_running());
            assert!(!bus.overflowed());
        }
    }

    // ---------------------------------------------------------------
    // Loopback: every received frame equals the frame sent for it
    // ---------------------------------------------------------------
    #[test]
    fn loopback_preserves_every_bit() {
        let bus = SimBus::new(MCLK_HZ);
        bus.set_input(InputSource::Loopback);
        let cycles = [Cycle::i2s(2, Mode::LeftJustified, 5, RestartSignal::Shutdown)];
        let mut app = Scripted::new(&bus, &cycles);
        let mut m = master(&bus, 4, 4, ClockGeneration::Generated);

        m.run(&mut app).unwrap();

        assert_eq!(app.received.len(), 5);
        for frame in 0..5 {
            assert_eq!(app.received[frame], app.sent[frame], "frame {frame}");
        }
    }

    // ---------------------------------------------------------------
    // Every word is clocked: both modes on both clock paths
    // ---------------------------------------------------------------
    #[test]
    fn every_transfer_gets_its_bit_clock() {
        for generation in [ClockGeneration::Generated, ClockGeneration::Divider] {
            for mode in [Mode::Standard, Mode::LeftJustified] {
                let bus = SimBus::new(MCLK_HZ);
                bus.set_input(InputSource::Loopback);
                let cycles = [Cycle::i2s(4, mode, 3, RestartSignal::Shutdown)];
                let mut app = Scripted::new(&bus, &cycles);
                let mut m = master(&bus, 1, 1, generation);

                // A read or drain waiting on an unclocked tick stalls the bus
                assert_eq!(m.run(&mut app), Ok(()), "{generation:?} {mode:?}");

                assert_eq!(app.received.len(), 3);
                for frame in 0..3 {
                    assert_eq!(app.received[frame], app.sent[frame], "{generation:?} {mode:?}");
                }
                assert!(!bus.truncated(), "{generation:?} {mode:?}");
            }
        }
    }

    // ---------------------------------------------------------------
    // Phase lock: all data lines move through half-frames together
    // ---------------------------------------------------------------
    #[test]
    fn data_lines_stay_phase_locked() {
        for mode in [Mode::Standard, Mode::LeftJustified] {
            let bus = SimBus::new(MCLK_HZ);
            let cycles = [Cycle::i2s(4, mode, 4, RestartSignal::Shutdown)];
            let mut app = Scripted::new(&bus, &cycles);
            let mut m = master(&bus, 3, 2, ClockGeneration::Divider);

            m.run(&mut app).unwrap();

            let offset = mode.data_offset() as u32;
            let mut latest = 0;
            let mut transfers = [0u32; 5];
            for event in bus.events().iter() {
                // Outputs start with the preload half-frame, inputs one later
                let (slot, first, time) = match *event {
                    Event::Word { line: LineId::Out(n), time, .. } => (n, 0, time),
                    Event::Read { line: LineId::In(n), time, .. } => (3 + n, 1, time),
                    _ => continue,
                };
                // Every word sits on the common grid, shifted by the mode offset
                assert_eq!(time % WORD_BITS, offset, "{mode:?}");
                let half_frame = time / WORD_BITS;
                assert_eq!(half_frame, first + transfers[slot]);
                // No line runs ahead: half-frames never go backwards in the trace
                assert!(half_frame >= latest);
                latest = half_frame;
                transfers[slot] += 1;
            }
            assert_eq!(transfers, [9, 9, 9, 8, 8]);
        }
    }

    // ---------------------------------------------------------------
    // Restart renegotiates before any further transfer
    // ---------------------------------------------------------------
    #[test]
    fn restart_renegotiates_with_new_ratio() {
        let bus = SimBus::new(MCLK_HZ);
        bus.set_input(InputSource::Loopback);
        let cycles = [
            Cycle::i2s(4, Mode::Standard, 2, RestartSignal::Restart),
            Cycle::i2s(8, Mode::LeftJustified, 3, RestartSignal::Shutdown),
        ];
        let mut app = Scripted::new(&bus, &cycles);
        let mut m = master(&bus, 1, 1, ClockGeneration::Generated);

        assert_eq!(m.run(&mut app), Ok(()));

        assert_eq!(app.inits, 2);
        assert_eq!(app.checks, 5);
        assert_eq!(app.bclk_hz.as_slice(), &[Some(MCLK_HZ / 4), Some(MCLK_HZ / 8)]);

        let events = bus.events();
        let first_stop = events.iter().position(|e| *e == Event::ClockStop).unwrap();
        let second_init = events.iter().position(|e| *e == Event::Mark(2)).unwrap();
        assert!(first_stop < second_init);
        // Nothing moves on the lines between the halt and the new init()
        assert!(!events[first_stop..second_init]
            .iter()
            .any(|e| matches!(e, Event::Word { .. } | Event::Read { .. })));
        // The last frame left the lines before the clock stopped
        assert_eq!(events[first_stop - 1], Event::Sync(LineId::Out(0)));
        assert!(!bus.truncated());
        // Second cycle starts again from a fresh preload at tick zero
        assert!(events[second_init..].contains(&Event::Word {
            line: LineId::Lrclk,
            time: 0,
            word: u32::MAX
        }));

        // Loopback holds across the restart
        for frame in 0..5 {
            let sent = if frame < 2 { frame } else { frame + 1 };
            assert_eq!(app.received[frame], app.sent[sent], "frame {frame}");
        }
    }

    #[test]
    fn restart_on_divider_clock_is_not_implemented() {
        let bus = SimBus::new(MCLK_HZ);
        let cycles = [
            Cycle::i2s(4, Mode::Standard, 2, RestartSignal::Restart),
            Cycle::i2s(4, Mode::Standard, 1, RestartSignal::Shutdown),
        ];
        let mut app = Scripted::new(&bus, &cycles);
        let mut m = master(&bus, 2, 0, ClockGeneration::Divider);

        assert_eq!(m.run(&mut app), Err(Error::RestartNotImplemented));
        assert_eq!(app.inits, 1);
        // The failed restart does not leave the bus clocking
        assert!(!bus.clock_running());
    }

    #[test]
    fn divider_shutdown_stops_clock() {
        let bus = SimBus::new(MCLK_HZ);
        let cycles = [Cycle::i2s(16, Mode::Standard, 2, RestartSignal::Shutdown)];
        let mut app = Scripted::new(&bus, &cycles);
        let mut m = master(&bus, 0, 2, ClockGeneration::Divider);

        assert_eq!(m.run(&mut app), Ok(()));

        assert_eq!(app.bclk_hz.as_slice(), &[Some(MCLK_HZ / 16)]);
        assert!(app.sent.iter().all(|s| s.is_empty()));
        assert!(app.received.iter().all(|s| s.len() == 4));
        let events = bus.events();
        assert_eq!(events[events.len() - 1], Event::ClockStop);
        assert!(events.contains(&Event::Divide(16)));
    }

    #[test]
    fn divider_shutdown_drains_last_frame() {
        let bus = SimBus::new(MCLK_HZ);
        let cycles = [Cycle::i2s(4, Mode::Standard, 2, RestartSignal::Shutdown)];
        let mut app = Scripted::new(&bus, &cycles);
        let mut m = master(&bus, 1, 0, ClockGeneration::Divider);

        assert_eq!(m.run(&mut app), Ok(()));

        // With no input to wait on, only the drain holds the clock for the
        // last odd half-frame
        let events = bus.events();
        let stop = events.iter().position(|e| *e == Event::ClockStop).unwrap();
        assert!(events[..stop].contains(&Event::Sync(LineId::Lrclk)));
        assert!(events[..stop].contains(&Event::Sync(LineId::Out(0))));
        assert!(!bus.truncated());
    }

    #[test]
    fn restart_into_tdm_is_fatal() {
        let bus = SimBus::new(MCLK_HZ);
        let cycles = [
            Cycle::i2s(4, Mode::Standard, 1, RestartSignal::Restart),
            Cycle {
                setup: BusSetup::Tdm(TdmConfig {
                    offset: 1,
                    sync_len: 1,
                    channels_per_frame: 8,
                }),
                frames: 1,
                end: RestartSignal::Shutdown,
            },
        ];
        let mut app = Scripted::new(&bus, &cycles);
        let mut m = master(&bus, 1, 1, ClockGeneration::Generated);

        assert_eq!(m.run(&mut app), Err(Error::UnsupportedSetup));
        assert_eq!(app.inits, 2);
        // The first run was halted cleanly before the second init()
        assert!(!bus.clock_running());
    }

    #[test]
    fn lines_are_returned_after_shutdown() {
        let bus = SimBus::new(MCLK_HZ);
        let cycles = [Cycle::i2s(4, Mode::Standard, 1, RestartSignal::Shutdown)];
        let mut app = Scripted::new(&bus, &cycles);
        let mut m = master(&bus, 2, 3, ClockGeneration::Generated);
        assert_eq!((m.num_out(), m.num_in()), (2, 3));

        m.run(&mut app).unwrap();
        let (dout, din, _bclk, lrclk, _clock) = m.free();

        assert_eq!(dout.len(), 2);
        assert_eq!(din.len(), 3);
        // Frame clock has sent preload + one frame
        assert_eq!(lrclk.time(), 3 * WORD_BITS);
    }
}
