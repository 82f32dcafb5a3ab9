//! ---
//! wl_section: "05-kpi-insight-engine"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Windowing, KPI, and insight computation for WattLine."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use wattline_common::{DeviceSample, DeviceState, InsightsConfig};

use crate::insights::{
    detect_idle_stretches, detect_peak_demand, detect_phase_imbalance_windows, Insight,
};
use crate::kpi::{
    average_kw, energy_kwh, pf_average, phase_imbalance_percent, state_durations, throughput,
    StateDurations, Throughput,
};

/// Status of the newest sample in the window, for operator display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LatestStatus {
    pub timestamp: DateTime<Utc>,
    pub state: DeviceState,
    pub kw: f64,
    pub count_total: f64,
    pub alarm_code: Option<String>,
}

/// All numeric indicators derived from one window, computed in a single pass
/// over the same snapshot so the figures are mutually consistent.
#[derive(Debug, Clone, Serialize)]
pub struct KpiSnapshot {
    pub durations: StateDurations,
    pub uptime_pct: f64,
    pub idle_pct: f64,
    pub off_pct: f64,
    pub average_kw: f64,
    pub energy_kwh: f64,
    pub pf_average: f64,
    pub throughput: Throughput,
    pub latest_imbalance_percent: f64,
    pub latest: Option<LatestStatus>,
}

impl KpiSnapshot {
    /// Compute every KPI over the given window.
    pub fn compute(samples: &[DeviceSample]) -> Self {
        let durations = state_durations(samples);
        let (uptime_pct, idle_pct, off_pct) = if durations.total_ms > 0 {
            let total = durations.total_ms as f64;
            (
                durations.run_ms as f64 / total * 100.0,
                durations.idle_ms as f64 / total * 100.0,
                durations.off_ms as f64 / total * 100.0,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        let latest = samples.last();

        Self {
            durations,
            uptime_pct,
            idle_pct,
            off_pct,
            average_kw: average_kw(samples),
            energy_kwh: energy_kwh(samples),
            pf_average: pf_average(samples),
            throughput: throughput(samples),
            latest_imbalance_percent: latest.map(phase_imbalance_percent).unwrap_or(0.0),
            latest: latest.map(|s| LatestStatus {
                timestamp: s.timestamp,
                state: s.state,
                kw: s.kw,
                count_total: s.count_total,
                alarm_code: s.alarm_code.clone(),
            }),
        }
    }
}

/// Minimum idle-stretch duration worth reporting, scaled to the visible
/// window: half the window (never below 5 minutes), capped at 30.
pub fn effective_idle_threshold(window_minutes: i64) -> f64 {
    if window_minutes >= 30 {
        30.0
    } else {
        (window_minutes / 2).max(5) as f64
    }
}

/// Run all three detectors in their fixed order (idle, peak demand, phase
/// imbalance) and truncate the combined list for display.
pub fn collect_insights(
    samples: &[DeviceSample],
    window_minutes: i64,
    config: &InsightsConfig,
) -> Vec<Insight> {
    let mut insights = detect_idle_stretches(samples, effective_idle_threshold(window_minutes));
    insights.extend(detect_peak_demand(samples));
    insights.extend(detect_phase_imbalance_windows(
        samples,
        config.imbalance_threshold_percent,
        config.imbalance_min_minutes,
    ));
    insights.truncate(config.max_insights);
    insights
}

/// One fully-computed engine pass: the window that produced it, the KPI set,
/// and the truncated insight list.
///
/// The window is shared immutably; a new snapshot is computed per append and
/// published wholesale, so readers holding an older snapshot keep a coherent
/// view.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub window: Arc<Vec<DeviceSample>>,
    pub kpis: KpiSnapshot,
    pub insights: Vec<Insight>,
}

impl EngineSnapshot {
    /// The pre-stream snapshot: empty window, all-zero KPIs, no insights.
    pub fn empty() -> Self {
        Self {
            window: Arc::new(Vec::new()),
            kpis: KpiSnapshot::compute(&[]),
            insights: Vec::new(),
        }
    }

    /// Recompute KPIs and insights for a freshly-trimmed window.
    pub fn compute(
        window: Arc<Vec<DeviceSample>>,
        window_minutes: i64,
        insights_config: &InsightsConfig,
    ) -> Self {
        let kpis = KpiSnapshot::compute(&window);
        let insights = collect_insights(&window, window_minutes, insights_config);
        Self {
            window,
            kpis,
            insights,
        }
    }

    /// Timestamp of the newest sample, if any.
    pub fn last_sample_time(&self) -> Option<DateTime<Utc>> {
        self.window.last().map(|s| s.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(minute: i64, state: DeviceState, kw: f64) -> DeviceSample {
        DeviceSample {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minute),
            state,
            kw,
            kwh_total: 100.0 + minute as f64,
            pf: Some(0.9),
            count_total: minute as f64,
            ir: 10.0,
            iy: 10.0,
            ib: 10.0,
            vr: 230.0,
            vy: 230.0,
            vb: 230.0,
            alarm_code: None,
        }
    }

    #[test]
    fn idle_threshold_scales_with_window() {
        assert_eq!(effective_idle_threshold(5), 5.0);
        assert_eq!(effective_idle_threshold(15), 7.0);
        assert_eq!(effective_idle_threshold(30), 30.0);
        assert_eq!(effective_idle_threshold(60), 30.0);
    }

    #[test]
    fn percentages_split_the_window() {
        let samples = vec![
            sample(0, DeviceState::Run, 10.0),
            sample(1, DeviceState::Idle, 1.0),
            sample(2, DeviceState::Run, 10.0),
        ];
        let kpis = KpiSnapshot::compute(&samples);
        assert!((kpis.uptime_pct - 50.0).abs() < 1e-9);
        assert!((kpis.idle_pct - 50.0).abs() < 1e-9);
        assert_eq!(kpis.off_pct, 0.0);
    }

    #[test]
    fn empty_window_yields_neutral_snapshot() {
        let kpis = KpiSnapshot::compute(&[]);
        assert_eq!(kpis.durations, StateDurations::default());
        assert_eq!(kpis.uptime_pct, 0.0);
        assert_eq!(kpis.average_kw, 0.0);
        assert_eq!(kpis.latest_imbalance_percent, 0.0);
        assert!(kpis.latest.is_none());
    }

    #[test]
    fn latest_status_mirrors_newest_sample() {
        let mut samples = vec![
            sample(0, DeviceState::Run, 10.0),
            sample(1, DeviceState::Idle, 1.5),
        ];
        samples[1].alarm_code = Some("E-204".to_owned());
        let kpis = KpiSnapshot::compute(&samples);
        let latest = kpis.latest.expect("window is non-empty");
        assert_eq!(latest.state, DeviceState::Idle);
        assert_eq!(latest.kw, 1.5);
        assert_eq!(latest.alarm_code.as_deref(), Some("E-204"));
    }

    #[test]
    fn insights_are_ordered_and_capped() {
        // Build a window dense enough to trip several idle and imbalance
        // runs plus the peak detector, then cap at 2.
        let mut samples = Vec::new();
        for block in 0..4 {
            let base = block * 8;
            for m in 0..6 {
                samples.push(sample(base + m, DeviceState::Idle, 2.0));
            }
            samples.push(sample(base + 6, DeviceState::Run, 18.0));
            samples.push(sample(base + 7, DeviceState::Run, 18.0));
        }
        let config = InsightsConfig::default();
        let all = collect_insights(&samples, 5, &config);
        assert!(all.len() <= config.max_insights);
        assert!(all[0].id.starts_with("idle-"));

        let capped = collect_insights(
            &samples,
            5,
            &InsightsConfig {
                max_insights: 2,
                ..InsightsConfig::default()
            },
        );
        assert_eq!(capped.len(), 2);
        assert!(capped[0].id.starts_with("idle-"));
    }

    #[test]
    fn engine_snapshot_shares_its_window() {
        let window = Arc::new(vec![sample(0, DeviceState::Run, 10.0)]);
        let snapshot = EngineSnapshot::compute(window.clone(), 15, &InsightsConfig::default());
        assert!(Arc::ptr_eq(&snapshot.window, &window));
        assert_eq!(snapshot.last_sample_time(), Some(window[0].timestamp));
        assert!(EngineSnapshot::empty().last_sample_time().is_none());
    }
}
