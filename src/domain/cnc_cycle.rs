// CNC machining-cycle simulator - correlated sensor samples on a repeating cycle clock
use chrono::{DateTime, Utc};
use rand::Rng;
use std::f64::consts::PI;

use super::cnc_telemetry::TelemetrySample;

/// Nominal length of one machining cycle in seconds
pub const CYCLE_SECONDS: f64 = 45.0;
pub const DEFAULT_PROGRAM_NUMBER: i64 = 1001;
pub const MAX_TOOL_NUMBER: i64 = 20;

const BASE_SPINDLE_SPEED: f64 = 8000.0;
const BASE_SPINDLE_LOAD: f64 = 35.0;
const BASE_FEED_RATE: f64 = 200.0;
const BASE_COOLANT_TEMP: f64 = 22.0;
const BASE_COOLANT_PRESSURE: f64 = 80.0;
const BASE_POWER: f64 = 12.0;

const COMPLETION_PHASE: f64 = 0.95;
const COMPLETION_PROBABILITY: f64 = 0.2;
const TOOL_CHANGE_PROBABILITY: f64 = 0.3;

/// Statistical profile selected by the cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Idle,
    RampUp,
    Cutting,
    Retract,
}

impl Regime {
    pub fn from_phase(phase: f64) -> Self {
        if phase < 0.1 {
            Regime::Idle
        } else if phase < 0.3 {
            Regime::RampUp
        } else if phase < 0.8 {
            Regime::Cutting
        } else {
            Regime::Retract
        }
    }

    /// Raw (spindle speed, spindle load, feed rate) for this regime
    fn spindle<R: Rng + ?Sized>(self, rng: &mut R) -> (f64, f64, f64) {
        match self {
            Regime::Idle => (
                BASE_SPINDLE_SPEED * 0.3 + noise(rng, 500.0),
                5.0 + noise(rng, 5.0),
                0.0,
            ),
            Regime::RampUp => (
                BASE_SPINDLE_SPEED * 0.8 + noise(rng, 1000.0),
                BASE_SPINDLE_LOAD * 0.5 + noise(rng, 10.0),
                BASE_FEED_RATE * 0.5 + noise(rng, 50.0),
            ),
            Regime::Cutting => (
                BASE_SPINDLE_SPEED + noise(rng, 2000.0) - 1000.0,
                BASE_SPINDLE_LOAD + noise(rng, 20.0),
                BASE_FEED_RATE + noise(rng, 100.0) - 50.0,
            ),
            Regime::Retract => (
                BASE_SPINDLE_SPEED * 0.5 + noise(rng, 500.0),
                10.0 + noise(rng, 10.0),
                BASE_FEED_RATE * 0.3 + noise(rng, 30.0),
            ),
        }
    }
}

/// Uniform draw in [0, span)
fn noise<R: Rng + ?Sized>(rng: &mut R, span: f64) -> f64 {
    rng.random::<f64>() * span
}

/// Round half toward positive infinity to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

/// Fractional position within the cycle, always in [0, 1)
pub fn cycle_phase(elapsed_seconds: f64) -> f64 {
    let elapsed = elapsed_seconds.max(0.0);
    let phase = elapsed.rem_euclid(CYCLE_SECONDS) / CYCLE_SECONDS;
    if phase >= 1.0 { 0.0 } else { phase }
}

/// Toolpath traced by the axes; depends on phase only
pub fn axis_positions(phase: f64) -> (f64, f64, f64) {
    let x = (phase * PI * 4.0).sin() * 150.0 + 200.0;
    let y = (phase * PI * 3.0).cos() * 125.0 + 175.0;
    let z = -50.0 + (phase * PI * 6.0).sin() * 45.0;
    (x, y, z)
}

/// Per-axis vibration scaled from spindle load
pub fn vibration<R: Rng + ?Sized>(spindle_load: f64, rng: &mut R) -> (f64, f64, f64) {
    let base = spindle_load / 100.0;
    (
        base * (0.8 + noise(rng, 0.4)),
        base * (0.7 + noise(rng, 0.5)),
        base * (0.5 + noise(rng, 0.3)),
    )
}

/// Mutable cycle clock of one simulated machine
#[derive(Debug, Clone)]
pub struct CycleState {
    cycle_start: DateTime<Utc>,
    part_count: i64,
    tool_number: i64,
    program_number: i64,
}

impl CycleState {
    pub fn new(cycle_start: DateTime<Utc>) -> Self {
        Self {
            cycle_start,
            part_count: 0,
            tool_number: 1,
            program_number: DEFAULT_PROGRAM_NUMBER,
        }
    }

    pub fn cycle_start(&self) -> DateTime<Utc> {
        self.cycle_start
    }

    pub fn part_count(&self) -> i64 {
        self.part_count
    }

    pub fn tool_number(&self) -> i64 {
        self.tool_number
    }

    pub fn program_number(&self) -> i64 {
        self.program_number
    }

    fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.cycle_start).num_milliseconds() as f64 / 1000.0
    }

    pub fn phase_at(&self, now: DateTime<Utc>) -> f64 {
        cycle_phase(self.elapsed_seconds(now))
    }

    /// Produce one sample at `now`, applying a completion transition if one fires.
    pub fn next_sample<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> TelemetrySample {
        let phase = self.phase_at(now);
        let regime = Regime::from_phase(phase);

        let (spindle_speed, spindle_load, feed_rate) = regime.spindle(rng);
        let (x, y, z) = axis_positions(phase);
        let (vibration_x, vibration_y, vibration_z) = vibration(spindle_load, rng);

        let load_fraction = spindle_load / 100.0;
        let coolant_temp = BASE_COOLANT_TEMP + load_fraction * 8.0 + noise(rng, 2.0);
        let coolant_pressure = BASE_COOLANT_PRESSURE + noise(rng, 10.0) - 5.0;
        let power_consumption = BASE_POWER + load_fraction * 8.0 + noise(rng, 2.0);

        if phase > COMPLETION_PHASE && rng.random_bool(COMPLETION_PROBABILITY) {
            self.complete_cycle(now, rng);
        }

        // Computed after any reset so a completing tick reports ~0
        let cycle_time = self.elapsed_seconds(now).max(0.0);

        TelemetrySample {
            spindle_speed: round_to(spindle_speed, 1),
            spindle_load: round_to(spindle_load, 1),
            feed_rate: round_to(feed_rate, 1),
            coolant_temp: round_to(coolant_temp, 1),
            coolant_pressure: round_to(coolant_pressure, 1),
            x_axis_position: round_to(x, 3),
            y_axis_position: round_to(y, 3),
            z_axis_position: round_to(z, 3),
            vibration_x: round_to(vibration_x, 3),
            vibration_y: round_to(vibration_y, 3),
            vibration_z: round_to(vibration_z, 3),
            power_consumption: round_to(power_consumption, 2),
            tool_number: self.tool_number,
            program_number: self.program_number,
            part_count: self.part_count,
            cycle_time: round_to(cycle_time, 1),
        }
    }

    fn complete_cycle<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) {
        self.part_count += 1;
        if now > self.cycle_start {
            self.cycle_start = now;
        }
        if rng.random_bool(TOOL_CHANGE_PROBABILITY) {
            self.tool_number = rng.random_range(1..=MAX_TOOL_NUMBER);
        }
    }
}
