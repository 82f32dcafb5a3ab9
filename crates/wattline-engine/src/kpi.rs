//! ---
//! wl_section: "05-kpi-insight-engine"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Windowing, KPI, and insight computation for WattLine."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use wattline_common::{DeviceSample, DeviceState};

/// Time-weighted split of the window across operating states, in
/// milliseconds. `total_ms` is always the sum of the three buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDurations {
    pub run_ms: i64,
    pub idle_ms: i64,
    pub off_ms: i64,
    pub total_ms: i64,
}

/// Unit-production rates derived from the `count_total` register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    pub units_per_min: f64,
    pub rolling_60s_units_per_min: f64,
}

/// Split the window span across RUN / IDLE / OFF.
///
/// Each inter-sample interval is attributed to the state of its *starting*
/// sample; the final sample bounds no interval and contributes nothing.
/// Fewer than two samples means no intervals exist at all.
pub fn state_durations(samples: &[DeviceSample]) -> StateDurations {
    if samples.len() < 2 {
        return StateDurations::default();
    }

    let mut run_ms = 0;
    let mut idle_ms = 0;
    let mut off_ms = 0;

    for pair in samples.windows(2) {
        let dt = pair[1].epoch_ms() - pair[0].epoch_ms();
        match pair[0].state {
            DeviceState::Run => run_ms += dt,
            DeviceState::Idle => idle_ms += dt,
            DeviceState::Off => off_ms += dt,
        }
    }

    StateDurations {
        run_ms,
        idle_ms,
        off_ms,
        total_ms: run_ms + idle_ms + off_ms,
    }
}

/// Arithmetic mean of instantaneous power across the window; 0 when empty.
pub fn average_kw(samples: &[DeviceSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| s.kw).sum();
    sum / samples.len() as f64
}

/// Energy consumed over the window, read off the cumulative register as
/// `max(kwh_total) - min(kwh_total)`.
///
/// Correct only while the register does not reset inside the window; a reset
/// produces a transiently inflated reading that ages out of the window.
pub fn energy_kwh(samples: &[DeviceSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in samples {
        min = min.min(s.kwh_total);
        max = max.max(s.kwh_total);
    }
    max - min
}

/// Mean power factor over RUN and IDLE samples that report one.
///
/// OFF samples and samples with a null `pf` are excluded from numerator and
/// denominator alike; 0 when nothing qualifies.
pub fn pf_average(samples: &[DeviceSample]) -> f64 {
    let qualifying: Vec<f64> = samples
        .iter()
        .filter(|s| matches!(s.state, DeviceState::Run | DeviceState::Idle))
        .filter_map(|s| s.pf)
        .collect();
    if qualifying.is_empty() {
        return 0.0;
    }
    qualifying.iter().sum::<f64>() / qualifying.len() as f64
}

/// Production throughput over the full window plus a trailing-60-second rate.
///
/// The rolling figure is the raw count delta across the trailing 60 seconds:
/// a 60-second delta is numerically equal to a per-minute rate, so no
/// division happens there.
pub fn throughput(samples: &[DeviceSample]) -> Throughput {
    if samples.len() < 2 {
        return Throughput::default();
    }

    let first = &samples[0];
    let last = &samples[samples.len() - 1];

    let dt_min = (last.epoch_ms() - first.epoch_ms()) as f64 / 60_000.0;
    let delta_count = last.count_total - first.count_total;
    let units_per_min = if dt_min > 0.0 {
        delta_count / dt_min
    } else {
        0.0
    };

    let cutoff_60 = last.epoch_ms() - 60_000;
    let last_60: Vec<&DeviceSample> = samples.iter().filter(|s| s.epoch_ms() >= cutoff_60).collect();
    let rolling = if last_60.len() > 1 {
        last.count_total - last_60[0].count_total
    } else {
        0.0
    };

    Throughput {
        units_per_min,
        rolling_60s_units_per_min: rolling,
    }
}

/// Current imbalance of a single sample:
/// `(max(ir,iy,ib) - min(ir,iy,ib)) / mean * 100`.
///
/// A zero mean current reads as balanced (a fully de-energized device), which
/// doubles as the division-by-zero guard.
pub fn phase_imbalance_percent(sample: &DeviceSample) -> f64 {
    let currents = [sample.ir, sample.iy, sample.ib];
    let max = currents.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = currents.iter().cloned().fold(f64::INFINITY, f64::min);
    let avg = currents.iter().sum::<f64>() / currents.len() as f64;
    if avg == 0.0 {
        return 0.0;
    }
    (max - min) / avg * 100.0
}

/// Half-away-from-zero rounding to `decimals` places.
///
/// Display-only: applying this before any other computation compounds
/// rounding error.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
