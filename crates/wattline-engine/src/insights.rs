//! ---
//! wl_section: "05-kpi-insight-engine"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Windowing, KPI, and insight computation for WattLine."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use wattline_common::{DeviceSample, DeviceState};

use crate::kpi::phase_imbalance_percent;

const PEAK_DEMAND_SPAN_MS: i64 = 15 * 60_000;

/// Severity attached to a detected pattern. Fixed per detector at design
/// time; there is no dynamic escalation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        f.write_str(text)
    }
}

/// A detected behavioral pattern with optional time bounds.
///
/// Insights are recomputed from scratch on every window change and are never
/// persisted or incrementally updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Maximal contiguous run of qualifying samples, by window index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: usize,
    end: usize,
}

/// Linear segmentation scan. A run opens on the first qualifying sample,
/// extends while samples keep qualifying, and closes on the first
/// non-qualifying sample or at the end of the window.
enum ScanState {
    NoActiveRun,
    InRun { start: usize },
}

fn contiguous_runs<F>(samples: &[DeviceSample], mut qualifies: F) -> Vec<Segment>
where
    F: FnMut(usize, &DeviceSample) -> bool,
{
    let mut segments = Vec::new();
    let mut scan = ScanState::NoActiveRun;

    for (i, sample) in samples.iter().enumerate() {
        scan = match (scan, qualifies(i, sample)) {
            (ScanState::NoActiveRun, true) => ScanState::InRun { start: i },
            (ScanState::NoActiveRun, false) => ScanState::NoActiveRun,
            (ScanState::InRun { start }, true) => ScanState::InRun { start },
            (ScanState::InRun { start }, false) => {
                segments.push(Segment { start, end: i - 1 });
                ScanState::NoActiveRun
            }
        };
    }
    if let ScanState::InRun { start } = scan {
        segments.push(Segment {
            start,
            end: samples.len() - 1,
        });
    }

    segments
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Find IDLE stretches lasting at least `min_minutes`.
///
/// Runs are maximal contiguous IDLE subsequences of the window; the duration
/// of a run is the timestamp span between its endpoints, so a single-sample
/// run has duration zero and only surfaces when `min_minutes` is zero.
pub fn detect_idle_stretches(samples: &[DeviceSample], min_minutes: f64) -> Vec<Insight> {
    if samples.is_empty() {
        return Vec::new();
    }
    let threshold_ms = min_minutes * 60_000.0;
    let mut insights = Vec::new();

    for (idx, seg) in contiguous_runs(samples, |_, s| s.state == DeviceState::Idle)
        .into_iter()
        .enumerate()
    {
        let start = &samples[seg.start];
        let end = &samples[seg.end];
        let duration_ms = (end.epoch_ms() - start.epoch_ms()) as f64;
        if duration_ms >= threshold_ms {
            let minutes = duration_ms / 60_000.0;
            insights.push(Insight {
                id: format!("idle-{}", idx),
                title: "Extended idle period".to_owned(),
                description: format!(
                    "Machine idle from {} to {} ({:.1} min). Consider schedule or changeover optimization.",
                    fmt_ts(start.timestamp),
                    fmt_ts(end.timestamp),
                    minutes
                ),
                severity: Severity::Info,
                start_time: Some(start.timestamp),
                end_time: Some(end.timestamp),
            });
        }
    }

    insights
}

/// Find the worst trailing-15-minute average demand in the window.
///
/// Every sample is a candidate window end; the comparison is strict, so ties
/// keep the earliest maximum. A best average of zero is treated as "no demand
/// observed" and emits nothing. The scan is quadratic by contract; windows
/// are minutes of roughly 1 Hz data, so no incremental optimization is
/// warranted.
pub fn detect_peak_demand(samples: &[DeviceSample]) -> Vec<Insight> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut best_avg = 0.0_f64;
    let mut best_end: Option<&DeviceSample> = None;

    for end in samples {
        let end_ms = end.epoch_ms();
        let start_ms = end_ms - PEAK_DEMAND_SPAN_MS;
        let mut sum = 0.0;
        let mut n = 0usize;
        for s in samples {
            let ms = s.epoch_ms();
            if ms >= start_ms && ms <= end_ms {
                sum += s.kw;
                n += 1;
            }
        }
        if n == 0 {
            continue;
        }
        let avg = sum / n as f64;
        if avg > best_avg {
            best_avg = avg;
            best_end = Some(end);
        }
    }

    let Some(end) = best_end else {
        return Vec::new();
    };

    vec![Insight {
        id: "peak-15min-kw".to_owned(),
        title: "Peak 15-minute demand".to_owned(),
        description: format!(
            "Highest rolling 15-minute average demand is {:.2} kW ending at {}.",
            best_avg,
            fmt_ts(end.timestamp)
        ),
        severity: Severity::Warning,
        start_time: None,
        end_time: Some(end.timestamp),
    }]
}

/// Find sustained phase-imbalance windows.
///
/// Samples whose imbalance strictly exceeds `threshold_percent` are merged
/// into runs by adjacency in the original window sequence (any unflagged
/// sample in between breaks the run). One warning is emitted per run whose
/// endpoint span is at least `min_minutes`, reporting the peak imbalance
/// observed inside the run.
pub fn detect_phase_imbalance_windows(
    samples: &[DeviceSample],
    threshold_percent: f64,
    min_minutes: f64,
) -> Vec<Insight> {
    if samples.is_empty() {
        return Vec::new();
    }

    let imbalance: Vec<f64> = samples.iter().map(phase_imbalance_percent).collect();
    let segments = contiguous_runs(samples, |i, _| imbalance[i] > threshold_percent);

    let threshold_ms = min_minutes * 60_000.0;
    let mut insights = Vec::new();

    for (idx, seg) in segments.into_iter().enumerate() {
        let start = &samples[seg.start];
        let end = &samples[seg.end];
        let peak = imbalance[seg.start..=seg.end]
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        let duration_ms = (end.epoch_ms() - start.epoch_ms()) as f64;
        if duration_ms >= threshold_ms {
            insights.push(Insight {
                id: format!("phase-imb-{}", idx),
                title: "Phase imbalance window".to_owned(),
                description: format!(
                    "Phase current imbalance > {}% from {} to {} ({:.1} min), peak {:.1}%.",
                    threshold_percent,
                    fmt_ts(start.timestamp),
                    fmt_ts(end.timestamp),
                    duration_ms / 60_000.0,
                    peak
                ),
                severity: Severity::Warning,
                start_time: Some(start.timestamp),
                end_time: Some(end.timestamp),
            });
        }
    }

    insights
}
