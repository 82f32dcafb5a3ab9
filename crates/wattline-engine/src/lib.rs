//! ---
//! wl_section: "05-kpi-insight-engine"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Windowing, KPI, and insight computation for WattLine."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
//! The WattLine computation core: sliding-window maintenance, KPI
//! aggregation, and rule-based insight detection.
//!
//! Everything in this crate is a pure function over an explicit, ordered
//! sample slice. No I/O, no wall-clock access, no hidden state: window
//! eviction is relative to stream time (the newest sample's timestamp), so
//! replayed streams behave identically to live ones. Callers replace the
//! window wholesale on every append; readers holding an earlier snapshot are
//! never affected by a later one.

pub mod insights;
pub mod kpi;
pub mod snapshot;
pub mod window;

pub use insights::{
    detect_idle_stretches, detect_peak_demand, detect_phase_imbalance_windows, Insight, Severity,
};
pub use kpi::{
    average_kw, energy_kwh, pf_average, phase_imbalance_percent, round_to, state_durations,
    throughput, StateDurations, Throughput,
};
pub use snapshot::{collect_insights, effective_idle_threshold, EngineSnapshot, KpiSnapshot};
pub use window::append_and_trim;
