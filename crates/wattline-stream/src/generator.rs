//! ---
//! wl_section: "02-stream-acquisition"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Sample acquisition, playback, and synthetic generation."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use std::f64::consts::PI;

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_distr::Normal;
use wattline_common::{DeviceSample, DeviceState};

/// Ticks per production cycle (30 minutes at 1 Hz).
const CYCLE_TICKS: u64 = 1800;
/// Ticks inside the cycle with a forced phase-current imbalance episode.
const IMBALANCE_EPISODE: std::ops::Range<u64> = 1200..1380;
/// Rough amps-per-kW scaling for the simulated feeder.
const AMPS_PER_KW: f64 = 1.45;

/// Deterministic synthetic telemetry for demo streams and tests.
///
/// Given a seed and a start time the generator emits a 1 Hz stream cycling
/// through RUN, IDLE, and OFF phases: sinusoidal load with noise, monotone
/// `kwh_total` / `count_total` registers, a sustained imbalance episode once
/// per cycle, and a null power factor while OFF.
#[derive(Debug)]
pub struct SampleGenerator {
    rng: StdRng,
    noise: Normal<f64>,
    start: DateTime<Utc>,
    tick: u64,
    kwh_total: f64,
    count_total: f64,
}

impl SampleGenerator {
    pub fn new(seed: u64, start: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise: Normal::new(0.0, 1.0).expect("sigma must be positive"),
            start,
            tick: 0,
            kwh_total: 0.0,
            count_total: 0.0,
        }
    }

    /// Produce the next sample of the infinite stream.
    pub fn next_sample(&mut self) -> DeviceSample {
        let tick = self.tick;
        let state = phase_state(tick);
        let t = (tick % CYCLE_TICKS) as f64;

        let kw = match state {
            DeviceState::Run => {
                (14.0 + 4.0 * (2.0 * PI * t / 600.0).sin() + 0.2 * self.noise_sample()).max(0.0)
            }
            DeviceState::Idle => (1.2 + 0.05 * self.noise_sample()).max(0.0),
            DeviceState::Off => 0.0,
        };

        let pf = match state {
            DeviceState::Run => {
                Some((0.88 + 0.03 * (2.0 * PI * t / 900.0).sin() + 0.005 * self.noise_sample())
                    .clamp(0.0, 1.0))
            }
            DeviceState::Idle => Some((0.55 + 0.01 * self.noise_sample()).clamp(0.0, 1.0)),
            DeviceState::Off => None,
        };

        let base_amps = kw * AMPS_PER_KW;
        let (mut ir, mut iy, mut ib) = (
            base_amps * (1.0 + 0.01 * self.noise_sample()),
            base_amps * (1.0 + 0.01 * self.noise_sample()),
            base_amps * (1.0 + 0.01 * self.noise_sample()),
        );
        let in_episode = IMBALANCE_EPISODE.contains(&(tick % CYCLE_TICKS));
        if in_episode {
            ir *= 1.3;
            iy *= 0.8;
        }

        let vr = 230.0 + 1.5 * (2.0 * PI * t / 300.0).sin() + 0.3 * self.noise_sample();
        let vy = 230.0 + 1.5 * (2.0 * PI * (t + 100.0) / 300.0).sin() + 0.3 * self.noise_sample();
        let vb = 230.0 + 1.5 * (2.0 * PI * (t + 200.0) / 300.0).sin() + 0.3 * self.noise_sample();

        // One tick is one second of energy and, while running, a coin-flip
        // unit completion.
        self.kwh_total += kw / 3600.0;
        if state == DeviceState::Run && self.rng.gen_bool(0.45) {
            self.count_total += 1.0;
        }

        let alarm_code = if in_episode {
            Some("PH-IMB".to_owned())
        } else if self.rng.gen_ratio(1, 900) {
            Some("E-204".to_owned())
        } else {
            None
        };

        let sample = DeviceSample {
            timestamp: self.start + Duration::seconds(tick as i64),
            state,
            kw,
            kwh_total: self.kwh_total,
            pf,
            count_total: self.count_total,
            ir,
            iy,
            ib,
            vr,
            vy,
            vb,
            alarm_code,
        };
        self.tick += 1;
        sample
    }

    /// Collect the next `count` samples.
    pub fn take_samples(&mut self, count: usize) -> Vec<DeviceSample> {
        (0..count).map(|_| self.next_sample()).collect()
    }

    fn noise_sample(&mut self) -> f64 {
        self.noise.sample(&mut self.rng)
    }
}

impl Iterator for SampleGenerator {
    type Item = DeviceSample;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_sample())
    }
}

fn phase_state(tick: u64) -> DeviceState {
    match tick % CYCLE_TICKS {
        0..=599 => DeviceState::Run,
        600..=959 => DeviceState::Idle,
        960..=1499 => DeviceState::Run,
        1500..=1679 => DeviceState::Off,
        _ => DeviceState::Idle,
    }
}
