//! ---
//! wl_section: "01-core-functionality"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Shared primitives and utilities for the WattLine runtime."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutually exclusive operating mode reported by the device.
///
/// The state is valid for the interval *starting at* the sample that carries
/// it; duration attribution always uses the earlier sample of a pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceState {
    Run,
    Idle,
    Off,
}

impl DeviceState {
    pub fn is_off(&self) -> bool {
        matches!(self, DeviceState::Off)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Run => "RUN",
            DeviceState::Idle => "IDLE",
            DeviceState::Off => "OFF",
        }
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUN" => Ok(DeviceState::Run),
            "IDLE" => Ok(DeviceState::Idle),
            "OFF" => Ok(DeviceState::Off),
            other => Err(format!("unknown device state: {}", other)),
        }
    }
}

/// One telemetry observation from the monitored device.
///
/// The JSON field names below are the wire contract for the JSONL stream and
/// for CSV exports. `kwh_total` and `count_total` are cumulative registers and
/// are treated as monotone; `timestamp` is the sole ordering and windowing
/// key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSample {
    pub timestamp: DateTime<Utc>,
    pub state: DeviceState,
    pub kw: f64,
    pub kwh_total: f64,
    #[serde(default)]
    pub pf: Option<f64>,
    pub count_total: f64,
    pub ir: f64,
    pub iy: f64,
    pub ib: f64,
    pub vr: f64,
    pub vy: f64,
    pub vb: f64,
    #[serde(default)]
    pub alarm_code: Option<String>,
}

impl DeviceSample {
    /// Milliseconds since the Unix epoch, the unit used by window math.
    pub fn epoch_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
