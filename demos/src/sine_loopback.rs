//! Sine loopback on the simulated bus.
//!
//! Plays a 1 kHz sine on two output lines with every input line looped back,
//! checks that the captured audio matches what was sent, then restarts the bus
//! at half the bit clock rate and does the same again before shutting down.
//!
//! ```text
//! SineApp.send() → dout[0..2] ══ loopback ══ din[0..2] → SineApp.receive()
//! ```
//!
//! Run with `cargo run -p i2s-master-demos --bin sine_loopback`.

use core::f32::consts::PI;

use i2s_master::sim::{InputSource, SimBus};
use i2s_master::{
    BusConfig, BusSetup, ClockGeneration, I2sCallback, I2sMaster, Mode, RestartSignal, Sample,
};
use log::{info, LevelFilter, Log, Metadata, Record};

const MCLK_HZ: u32 = 24_576_000;
const TONE_HZ: f32 = 1_000.0;
const LINES: usize = 2;
const FRAMES_PER_RUN: u32 = 24;

struct StdoutLogger;

impl Log for StdoutLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        println!("[{:<5}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

/// Generates a sine on every channel and compares what comes back.
struct SineApp<'a> {
    bus: &'a SimBus,
    configs: [BusConfig; 2],
    run: usize,
    phase: f32,
    step: f32,
    frames: u32,
    /// The frame sent on the previous `send()`, which is the one the next
    /// `receive()` captures.
    in_flight: [Sample; LINES * 2],
    queued: [Sample; LINES * 2],
    preloaded: bool,
    peak: i32,
    mismatches: u32,
}

impl SineApp<'_> {
    fn report(&self) {
        let config = self.configs[self.run];
        info!(
            "run {}: {} frames at {} Hz, bclk {:?} Hz, peak {}, mismatches {}",
            self.run,
            self.frames,
            config.sample_rate_hz(MCLK_HZ),
            self.bus.bclk_hz(),
            self.peak,
            self.mismatches
        );
    }
}

impl I2sCallback for SineApp<'_> {
    fn init(&mut self) -> BusSetup {
        let config = self.configs[self.run];
        self.step = 2.0 * PI * TONE_HZ / config.sample_rate_hz(MCLK_HZ) as f32;
        self.phase = 0.0;
        self.frames = 0;
        self.peak = 0;
        self.preloaded = false;
        BusSetup::I2s(config)
    }

    fn restart_check(&mut self) -> RestartSignal {
        self.frames += 1;
        if self.frames < FRAMES_PER_RUN {
            return RestartSignal::NoRestart;
        }
        self.report();
        if self.run + 1 < self.configs.len() {
            self.run += 1;
            RestartSignal::Restart
        } else {
            RestartSignal::Shutdown
        }
    }

    fn receive(&mut self, samples: &[Sample]) {
        for (&got, &sent) in samples.iter().zip(self.in_flight.iter()) {
            if got != sent {
                self.mismatches += 1;
            }
            self.peak = self.peak.max((got >> 8).abs());
        }
        self.in_flight = self.queued;
    }

    fn send(&mut self, samples: &mut [Sample]) {
        // 24-bit samples, MSB aligned, left channel on even, right on odd
        for pair in samples.chunks_exact_mut(2) {
            let value = (libm::sinf(self.phase) * 8_388_607.0) as i32;
            pair[0] = value << 8;
            pair[1] = (-value) << 8;
        }
        self.phase = libm::fmodf(self.phase + self.step, 2.0 * PI);
        self.queued.copy_from_slice(samples);
        if !self.preloaded {
            // The preload send is the first frame on the wire
            self.in_flight = self.queued;
            self.preloaded = true;
        }
    }
}

fn main() {
    log::set_logger(&LOGGER).expect("logger already set");
    log::set_max_level(LevelFilter::Debug);

    let bus = SimBus::new(MCLK_HZ);
    bus.set_input(InputSource::Loopback);

    let mut master = I2sMaster::new(
        (0..LINES).map(|n| bus.data_output(n)),
        (0..LINES).map(|n| bus.data_input(n)),
        bus.bclk(),
        bus.lrclk(),
        bus.clock(),
        ClockGeneration::Generated,
    )
    .expect("line count within limits");

    let mut app = SineApp {
        bus: &bus,
        configs: [
            BusConfig::new(8, Mode::Standard),
            BusConfig::new(16, Mode::LeftJustified),
        ],
        run: 0,
        phase: 0.0,
        step: 0.0,
        frames: 0,
        in_flight: [0; LINES * 2],
        queued: [0; LINES * 2],
        preloaded: false,
        peak: 0,
        mismatches: 0,
    };

    match master.run(&mut app) {
        Ok(()) => info!("done, {} mismatched samples", app.mismatches),
        Err(e) => {
            eprintln!("i2s master failed: {e}");
            std::process::exit(1);
        }
    }
}
