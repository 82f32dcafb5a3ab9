//! ---
//! wl_section: "05-kpi-insight-engine"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Windowing, KPI, and insight computation for WattLine."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use chrono::Duration;
use wattline_common::DeviceSample;

/// Append `sample` to `prev` and evict everything older than `window`.
///
/// The cutoff is `sample.timestamp - window`: eviction is relative to the
/// newest sample seen, not wall-clock now, so a replayed stream trims exactly
/// as a live one would. Samples carrying a timestamp at or after the cutoff
/// survive, including the appended one. The input slice is never mutated; the
/// caller replaces its window with the returned vector.
pub fn append_and_trim(
    prev: &[DeviceSample],
    sample: DeviceSample,
    window: Duration,
) -> Vec<DeviceSample> {
    let cutoff = sample.timestamp - window;
    prev.iter()
        .cloned()
        .chain(std::iter::once(sample))
        .filter(|s| s.timestamp >= cutoff)
        .collect()
}
