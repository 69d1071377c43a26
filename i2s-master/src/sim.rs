//! Software model of the I2S hardware lines.
//!
//! [`SimBus`] implements the [`port`](crate::port) traits without hardware so
//! the driver can be exercised on the host. All lines and the clock block
//! share one bus state that:
//!
//! - records every line and clock operation as an [`Event`],
//! - tracks each line's tick counter, so phase alignment can be checked,
//! - measures the bit clock frequency (divider setting, or the square wave
//!   fed to the bit-clock line),
//! - supplies input words (silence, loopback, or a test pattern),
//! - counts the bit-clock periods supplied to the data lines, and stalls a
//!   blocking transfer whose last tick has not been clocked (or whose clock is
//!   not running at all),
//! - flags a bit clock stopped while words are still queued on an output,
//! - injects faults on request.
//!
//! Half-frame `h` of a data or frame-clock line starts at tick `32 × h` plus
//! at most one bit of mode offset, so `time / 32` identifies the half-frame
//! of any recorded word.
//!
//! ## Usage
//!
//! ```ignore
//! let bus = SimBus::new(24_576_000);
//! bus.set_input(InputSource::Loopback);
//! let mut master = I2sMaster::new(
//!     [bus.data_output(0)],
//!     [bus.data_input(0)],
//!     bus.bclk(),
//!     bus.lrclk(),
//!     bus.clock(),
//!     ClockGeneration::Generated,
//! )?;
//! master.run(&mut app)?;
//! let events = bus.events();
//! ```

use core::cell::RefCell;

use heapless::Vec;

use crate::constants::{MAX_LINES, WORD_BITS};
use crate::port::{ClockBlock, ErrorKind, ErrorType, InputLine, LineClock, OutputLine};

/// Capacity of the event trace.
pub const EVENT_CAPACITY: usize = 1024;

/// Identifies a simulated resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineId {
    /// The bit-clock line.
    Bclk,
    /// The frame-clock line.
    Lrclk,
    /// Data output line `n`.
    Out(usize),
    /// Data input line `n`.
    In(usize),
    /// The clock block.
    Clock,
}

/// One recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A line was configured.
    Configure {
        /// Line.
        line: LineId,
        /// Clock the line shifts on.
        clock: LineClock,
    },
    /// A line's buffer was cleared.
    Clear(LineId),
    /// A word was queued on an output line, starting at tick `time`.
    Word {
        /// Line.
        line: LineId,
        /// Tick of the word's first bit.
        time: u32,
        /// Wire word.
        word: u32,
    },
    /// An input line was armed to capture from tick `time`.
    Arm {
        /// Line.
        line: LineId,
        /// Tick of the first captured bit.
        time: u32,
    },
    /// A word captured from tick `time` was read from an input line.
    Read {
        /// Line.
        line: LineId,
        /// Tick of the word's first bit.
        time: u32,
        /// Wire word.
        word: u32,
    },
    /// An output line was drained.
    Sync(LineId),
    /// The master clock input was started.
    MasterStart,
    /// The master clock input was stopped.
    MasterStop,
    /// The bit clock was set to the master clock divided by the ratio.
    Divide(u32),
    /// The bit clock was set to follow the bit-clock line.
    SourceFromLine,
    /// The bit clock was started.
    ClockStart,
    /// The bit clock was stopped.
    ClockStop,
    /// Marker recorded by test code.
    Mark(u32),
}

/// Simulated hardware error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Fault injected with [`SimBus::fail_on()`].
    Fault(LineId),
    /// A blocking transfer was attempted while its clock was stopped, or
    /// before the bit clock supplied the ticks it waits for; on hardware this
    /// would never return.
    Stalled(LineId),
    /// A timed operation was attempted on an unconfigured line.
    Unconfigured(LineId),
}

impl embedded_hal::digital::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Where simulated input lines get their words.
#[derive(Debug, Clone, Copy)]
pub enum InputSource {
    /// Every captured word is zero.
    Silence,
    /// Input line `n` hears what output line `n` sends in the same
    /// half-frame.
    Loopback,
    /// `f(line, half_frame)` gives the wire word.
    Pattern(fn(usize, u32) -> u32),
}

/// Measures the bit clock period from the square wave on the bit-clock line.
#[derive(Debug, Default)]
struct BclkMeter {
    last: Option<bool>,
    run: u32,
    transitions: u32,
    half_period: Option<u32>,
    /// Low-to-high edges seen, one per complete bit-clock period.
    rising: u32,
}

impl BclkMeter {
    fn feed(&mut self, word: u32) {
        for bit in 0..WORD_BITS {
            let level = (word >> bit) & 1 == 1;
            match self.last {
                Some(last) if last == level => self.run += 1,
                Some(_) => {
                    self.transitions += 1;
                    if level {
                        self.rising += 1;
                    }
                    // The run between the first two transitions is complete
                    if self.transitions == 2 && self.half_period.is_none() {
                        self.half_period = Some(self.run);
                    }
                    self.run = 1;
                }
                None => self.run = 1,
            }
            self.last = Some(level);
        }
    }
}

struct State {
    mclk_hz: u32,
    master_running: bool,
    clock_running: bool,
    divide: Option<u32>,
    from_line: bool,
    meter: BclkMeter,
    input: InputSource,
    /// Last (half-frame, word) sent per output line, for loopback.
    last_out: [Option<(u32, u32)>; MAX_LINES],
    fault: Option<LineId>,
    /// Highest tick a blocking transfer has waited for since the clock
    /// started.
    elapsed: u32,
    /// End tick of the words queued on each data output, then the frame
    /// clock.
    queued_end: [u32; MAX_LINES + 1],
    truncated: bool,
    events: Vec<Event, EVENT_CAPACITY>,
    overflowed: bool,
}

impl State {
    fn record(&mut self, event: Event) {
        if self.events.push(event).is_err() {
            self.overflowed = true;
        }
    }

    fn check_fault(&mut self, line: LineId) -> Result<(), SimError> {
        if self.fault == Some(line) {
            self.fault = None;
            return Err(SimError::Fault(line));
        }
        Ok(())
    }

    fn clock_ticking(&self, clock: LineClock) -> bool {
        match clock {
            LineClock::BitClock | LineClock::BitClockOutput => self.clock_running,
            LineClock::MasterClock => self.master_running,
        }
    }

    /// Bit-clock periods clocked into the data lines so far, `None` when the
    /// bit clock free-runs from the divider.
    fn ticks_supplied(&self) -> Option<u32> {
        if self.from_line {
            Some(self.meter.rising)
        } else {
            None
        }
    }

    /// Whether every tick before `end` has been clocked.
    fn ticks_reached(&self, end: u32) -> bool {
        self.ticks_supplied().map_or(true, |ticks| ticks >= end)
    }

    fn wait_until(&mut self, end: u32) {
        self.elapsed = self.elapsed.max(end);
    }

    fn input_word(&self, line: usize, half_frame: u32) -> u32 {
        match self.input {
            InputSource::Silence => 0,
            InputSource::Loopback => match self.last_out.get(line).copied().flatten() {
                Some((h, word)) if h == half_frame => word,
                _ => 0,
            },
            InputSource::Pattern(f) => f(line, half_frame),
        }
    }
}

/// Shared state of a simulated I2S bus.
pub struct SimBus {
    state: RefCell<State>,
}

impl SimBus {
    /// Create a bus whose master clock runs at `mclk_hz`.
    pub const fn new(mclk_hz: u32) -> Self {
        SimBus {
            state: RefCell::new(State {
                mclk_hz,
                master_running: false,
                clock_running: false,
                divide: None,
                from_line: false,
                meter: BclkMeter {
                    last: None,
                    run: 0,
                    transitions: 0,
                    half_period: None,
                    rising: 0,
                },
                input: InputSource::Silence,
                last_out: [None; MAX_LINES],
                fault: None,
                elapsed: 0,
                queued_end: [0; MAX_LINES + 1],
                truncated: false,
                events: Vec::new(),
                overflowed: false,
            }),
        }
    }

    /// Data output line `n`.
    pub fn data_output(&self, n: usize) -> SimOutput<'_> {
        SimOutput::new(self, LineId::Out(n))
    }

    /// Data input line `n`.
    pub fn data_input(&self, n: usize) -> SimInput<'_> {
        SimInput {
            bus: self,
            id: LineId::In(n),
            clock: None,
            next: None,
        }
    }

    /// The bit-clock line.
    pub fn bclk(&self) -> SimOutput<'_> {
        SimOutput::new(self, LineId::Bclk)
    }

    /// The frame-clock line.
    pub fn lrclk(&self) -> SimOutput<'_> {
        SimOutput::new(self, LineId::Lrclk)
    }

    /// The clock block.
    pub fn clock(&self) -> SimClock<'_> {
        SimClock { bus: self }
    }

    /// Choose where input lines get their words.
    pub fn set_input(&self, source: InputSource) {
        self.state.borrow_mut().input = source;
    }

    /// Make the next operation on `line` fail.
    pub fn fail_on(&self, line: LineId) {
        self.state.borrow_mut().fault = Some(line);
    }

    /// Record a marker in the trace.
    pub fn mark(&self, tag: u32) {
        self.state.borrow_mut().record(Event::Mark(tag));
    }

    /// Copy of the event trace.
    pub fn events(&self) -> Vec<Event, EVENT_CAPACITY> {
        self.state.borrow().events.clone()
    }

    /// Whether events were dropped because the trace was full.
    pub fn overflowed(&self) -> bool {
        self.state.borrow().overflowed
    }

    /// Whether the bit clock was ever stopped with output words still queued
    /// behind the last tick a transfer waited for.
    pub fn truncated(&self) -> bool {
        self.state.borrow().truncated
    }

    /// Whether the bit clock is running.
    pub fn clock_running(&self) -> bool {
        self.state.borrow().clock_running
    }

    /// Whether the master clock input is running.
    pub fn master_running(&self) -> bool {
        self.state.borrow().master_running
    }

    /// Current bit clock frequency, if the bit clock is running and its
    /// period is known.
    pub fn bclk_hz(&self) -> Option<u32> {
        let state = self.state.borrow();
        if !state.clock_running {
            return None;
        }
        if let Some(ratio) = state.divide {
            return Some(state.mclk_hz / ratio);
        }
        if state.from_line {
            return state.meter.half_period.map(|half| state.mclk_hz / (2 * half));
        }
        None
    }
}

/// A simulated output line.
pub struct SimOutput<'a> {
    bus: &'a SimBus,
    id: LineId,
    clock: Option<LineClock>,
    time: u32,
}

impl<'a> SimOutput<'a> {
    fn new(bus: &'a SimBus, id: LineId) -> Self {
        SimOutput {
            bus,
            id,
            clock: None,
            time: 0,
        }
    }

    /// Tick at which the next queued word will start.
    pub fn time(&self) -> u32 {
        self.time
    }

    /// Slot in [`State::queued_end`] for lines shifting on the bit clock.
    fn slot(&self) -> Option<usize> {
        match self.id {
            LineId::Out(n) if n < MAX_LINES => Some(n),
            LineId::Lrclk => Some(MAX_LINES),
            _ => None,
        }
    }

    fn queue(&mut self, state: &mut State, word: u32) {
        state.record(Event::Word {
            line: self.id,
            time: self.time,
            word,
        });
        match self.id {
            LineId::Out(n) if n < MAX_LINES => {
                state.last_out[n] = Some((self.time / WORD_BITS, word));
            }
            LineId::Bclk => state.meter.feed(word),
            _ => {}
        }
        self.time += WORD_BITS;
        if let Some(slot) = self.slot() {
            state.queued_end[slot] = self.time;
        }
    }
}

impl ErrorType for SimOutput<'_> {
    type Error = SimError;
}

impl OutputLine for SimOutput<'_> {
    fn configure(&mut self, clock: LineClock, _initial: bool) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        self.clock = Some(clock);
        self.time = 0;
        if let Some(slot) = self.slot() {
            state.queued_end[slot] = 0;
        }
        state.record(Event::Configure {
            line: self.id,
            clock,
        });
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        if self.id == LineId::Bclk {
            state.meter = BclkMeter::default();
        }
        if let Some(slot) = self.slot() {
            state.queued_end[slot] = 0;
        }
        state.record(Event::Clear(self.id));
        Ok(())
    }

    fn write_word_at(&mut self, time: u16, word: u32) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        if self.clock.is_none() {
            return Err(SimError::Unconfigured(self.id));
        }
        self.time = time as u32;
        self.queue(&mut state, word);
        Ok(())
    }

    fn write_word(&mut self, word: u32) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        let clock = self.clock.ok_or(SimError::Unconfigured(self.id))?;
        if !state.clock_ticking(clock) {
            return Err(SimError::Stalled(self.id));
        }
        self.queue(&mut state, word);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        let clock = self.clock.ok_or(SimError::Unconfigured(self.id))?;
        if !state.clock_ticking(clock) {
            return Err(SimError::Stalled(self.id));
        }
        if clock == LineClock::BitClock {
            if !state.ticks_reached(self.time) {
                return Err(SimError::Stalled(self.id));
            }
            state.wait_until(self.time);
        }
        state.record(Event::Sync(self.id));
        Ok(())
    }
}

/// A simulated input line.
pub struct SimInput<'a> {
    bus: &'a SimBus,
    id: LineId,
    clock: Option<LineClock>,
    /// Start tick of the next word to capture, once armed.
    next: Option<u32>,
}

impl ErrorType for SimInput<'_> {
    type Error = SimError;
}

impl InputLine for SimInput<'_> {
    fn configure(&mut self, clock: LineClock) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        self.clock = Some(clock);
        self.next = None;
        state.record(Event::Configure {
            line: self.id,
            clock,
        });
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        self.next = None;
        state.record(Event::Clear(self.id));
        Ok(())
    }

    fn arm_at(&mut self, time: u16) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        if self.clock.is_none() {
            return Err(SimError::Unconfigured(self.id));
        }
        self.next = Some(time as u32);
        state.record(Event::Arm {
            line: self.id,
            time: time as u32,
        });
        Ok(())
    }

    fn read_word(&mut self) -> Result<u32, SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(self.id)?;
        let clock = self.clock.ok_or(SimError::Unconfigured(self.id))?;
        if !state.clock_ticking(clock) {
            return Err(SimError::Stalled(self.id));
        }
        let time = self.next.unwrap_or(0);
        let end = time + WORD_BITS;
        if !state.ticks_reached(end) {
            return Err(SimError::Stalled(self.id));
        }
        state.wait_until(end);
        let line = match self.id {
            LineId::In(n) => n,
            _ => 0,
        };
        let word = state.input_word(line, time / WORD_BITS);
        state.record(Event::Read {
            line: self.id,
            time,
            word,
        });
        self.next = Some(end);
        Ok(word)
    }
}

/// The simulated clock block.
pub struct SimClock<'a> {
    bus: &'a SimBus,
}

impl ErrorType for SimClock<'_> {
    type Error = SimError;
}

impl ClockBlock for SimClock<'_> {
    fn start_master(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(LineId::Clock)?;
        state.master_running = true;
        state.record(Event::MasterStart);
        Ok(())
    }

    fn stop_master(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(LineId::Clock)?;
        state.master_running = false;
        state.record(Event::MasterStop);
        Ok(())
    }

    fn divide_master(&mut self, ratio: u32) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(LineId::Clock)?;
        state.divide = Some(ratio);
        state.from_line = false;
        state.record(Event::Divide(ratio));
        Ok(())
    }

    fn source_from_line(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(LineId::Clock)?;
        state.divide = None;
        state.from_line = true;
        state.record(Event::SourceFromLine);
        Ok(())
    }

    fn start(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(LineId::Clock)?;
        state.clock_running = true;
        state.elapsed = 0;
        state.record(Event::ClockStart);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SimError> {
        let bus = self.bus;
        let mut state = bus.state.borrow_mut();
        state.check_fault(LineId::Clock)?;
        if state.clock_running && state.queued_end.iter().any(|&end| end > state.elapsed) {
            state.truncated = true;
        }
        state.clock_running = false;
        state.record(Event::ClockStop);
        Ok(())
    }
}
