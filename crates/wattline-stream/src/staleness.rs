//! ---
//! wl_section: "02-stream-acquisition"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Sample acquisition, playback, and synthetic generation."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

/// Gap after which a feed is reported stale.
pub const STALE_AFTER: Duration = Duration::from_secs(10);

/// Operator-facing feed status derived from the last delivery instant.
///
/// Purely presentational: staleness never alters KPI or insight
/// computation, which runs on stream time only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// No sample delivered yet.
    Waiting,
    /// Last sample arrived within the staleness threshold.
    Live { seconds: u64 },
    /// No sample for longer than the staleness threshold.
    Stale { seconds: u64 },
}

impl FeedStatus {
    pub fn is_stale(&self) -> bool {
        matches!(self, FeedStatus::Stale { .. })
    }
}

impl std::fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedStatus::Waiting => write!(f, "waiting for data"),
            FeedStatus::Live { .. } => write!(f, "live (<{} s)", STALE_AFTER.as_secs()),
            FeedStatus::Stale { seconds } => {
                write!(f, "no data > {} s ({}s)", STALE_AFTER.as_secs(), seconds)
            }
        }
    }
}

/// Tracks the wall-clock instant of the most recent sample delivery.
#[derive(Debug, Default)]
pub struct StalenessGauge {
    last_delivery: Option<Instant>,
}

impl StalenessGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivery(&mut self) {
        self.last_delivery = Some(Instant::now());
    }

    pub fn status(&self) -> FeedStatus {
        self.status_at(Instant::now())
    }

    fn status_at(&self, now: Instant) -> FeedStatus {
        let Some(last) = self.last_delivery else {
            return FeedStatus::Waiting;
        };
        let gap = now.saturating_duration_since(last);
        let seconds = gap.as_secs_f64().round() as u64;
        if gap > STALE_AFTER {
            FeedStatus::Stale { seconds }
        } else {
            FeedStatus::Live { seconds }
        }
    }
}
