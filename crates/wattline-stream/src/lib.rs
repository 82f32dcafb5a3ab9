//! ---
//! wl_section: "02-stream-acquisition"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Sample acquisition, playback, and synthetic generation."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
//! Sample acquisition for WattLine: the JSONL replay source, the paced
//! playback driver feeding the engine, the feed staleness gauge, and a
//! seeded synthetic generator for demo and test streams.
//!
//! All I/O and wall-clock access in the workspace lives here; the engine
//! crate stays pure.

use std::path::PathBuf;

use thiserror::Error;

pub mod driver;
pub mod generator;
pub mod source;
pub mod staleness;

pub use driver::{DriverHandle, DriverSettings, PlaybackDriver};
pub use generator::SampleGenerator;
pub use source::JsonlSource;
pub use staleness::{FeedStatus, StalenessGauge, STALE_AFTER};

/// Acquisition failures. Malformed individual records are not represented
/// here: they are skipped and logged by the source, never escalated.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The sample stream could not be read at all. Surfaced to the consumer
    /// as a descriptive error state; not retried automatically.
    #[error("unable to read sample stream {}: {source}", path.display())]
    Acquisition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
