//! ---
//! wl_section: "02-stream-acquisition"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Sample acquisition, playback, and synthetic generation."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};
use wattline_common::{AppConfig, DeviceSample, InsightsConfig};
use wattline_engine::{append_and_trim, EngineSnapshot};

use crate::source::JsonlSource;
use crate::staleness::{FeedStatus, StalenessGauge};

/// Everything the playback loop needs, lifted out of [`AppConfig`].
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub window_minutes: i64,
    pub playback_interval: Duration,
    pub insights: InsightsConfig,
}

impl DriverSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            window_minutes: config.window.minutes,
            playback_interval: config.stream.playback_interval,
            insights: config.insights.clone(),
        }
    }
}

/// Paced playback of a sample source into the engine.
///
/// One sample is delivered per tick; the window is trimmed, KPIs and
/// insights are recomputed synchronously, and the finished
/// [`EngineSnapshot`] is published wholesale before the next delivery. The
/// first delivery happens immediately. A changed window span takes effect by
/// spawning a fresh driver with new settings.
pub struct PlaybackDriver;

impl PlaybackDriver {
    pub fn spawn(mut source: JsonlSource, settings: DriverSettings) -> DriverHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::empty());
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let gauge = Arc::new(Mutex::new(StalenessGauge::new()));
        let task_gauge = gauge.clone();

        let task = tokio::spawn(async move {
            let span = chrono::Duration::minutes(settings.window_minutes);
            let mut window: Arc<Vec<DeviceSample>> = Arc::new(Vec::new());
            let mut ticker = interval(settings.playback_interval);
            let mut delivered = 0u64;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("playback driver shutdown signal received");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(sample) = source.next_sample() else {
                            info!(delivered, skipped = source.skipped(), "sample stream exhausted");
                            break;
                        };
                        window = Arc::new(append_and_trim(&window, sample, span));
                        let snapshot = EngineSnapshot::compute(
                            window.clone(),
                            settings.window_minutes,
                            &settings.insights,
                        );
                        delivered += 1;
                        task_gauge.lock().record_delivery();
                        debug!(
                            window_len = snapshot.window.len(),
                            insights = snapshot.insights.len(),
                            "snapshot published"
                        );
                        if snapshot_tx.send(snapshot).is_err() {
                            debug!("all snapshot receivers dropped; stopping driver");
                            break;
                        }
                    }
                }
            }
        });

        DriverHandle {
            snapshots: snapshot_rx,
            gauge,
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running playback driver.
#[derive(Debug)]
pub struct DriverHandle {
    snapshots: watch::Receiver<EngineSnapshot>,
    gauge: Arc<Mutex<StalenessGauge>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// A fresh receiver observing every published snapshot.
    pub fn snapshots(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshots.clone()
    }

    /// Clone of the most recently published snapshot.
    pub fn latest(&self) -> EngineSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wall-clock feed status (live / stale / waiting).
    pub fn feed_status(&self) -> FeedStatus {
        self.gauge.lock().status()
    }

    /// Whether the driver stopped on its own (stream exhausted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the driver to finish the stream naturally. The handle's own
    /// receiver and shutdown sender stay alive until the task has stopped,
    /// so the loop is never torn down from under itself.
    pub async fn wait(self) -> Result<()> {
        let DriverHandle {
            task,
            shutdown,
            snapshots,
            gauge,
        } = self;
        let result = task.await;
        drop(shutdown);
        drop(snapshots);
        drop(gauge);
        result.context("playback driver task failed")
    }

    /// Stop delivering samples and wait for the loop to wind down. No
    /// partially-applied computation survives: the last published snapshot
    /// stays readable.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.context("playback driver task failed")
    }
}
