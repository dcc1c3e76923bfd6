//! Live delivery-agent tracking.
//!
//! [`LocationTracker::spawn`] starts a background poll of an agent's reported
//! position. The returned [`TrackingHandle`] owns the task: stopping or
//! dropping it ends the polling.

use std::time::Duration;

use agritrade_core::DeliveryAgentId;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{GeoPoint, MarketplaceApi};

/// Poll interval when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// A position the agent reported, and when we saw it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPosition {
    pub point: GeoPoint,
    pub observed_at: DateTime<Utc>,
}

/// Spawns location polls.
#[derive(Debug)]
pub struct LocationTracker;

impl LocationTracker {
    /// Poll `agent`'s location now and then every `interval`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<A>(api: A, agent: DeliveryAgentId, interval: Duration) -> TrackingHandle
    where
        A: MarketplaceApi + Send + Sync + 'static,
    {
        let (sender, receiver) = watch::channel(None);
        let period = interval.max(Duration::from_millis(100));

        info!(agent_id = %agent, interval_ms = period.as_millis(), "Starting location tracking");
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if sender.is_closed() {
                    debug!(agent_id = %agent, "No more watchers, stopping location tracking");
                    break;
                }

                match api.agent_location(agent).await {
                    Ok(location) => match location.position() {
                        Some(point) => {
                            debug!(agent_id = %agent, lat = point.lat, lng = point.lng, "Agent position");
                            sender.send_replace(Some(TrackedPosition {
                                point,
                                observed_at: Utc::now(),
                            }));
                        }
                        None => debug!(agent_id = %agent, "Agent has not reported a position"),
                    },
                    Err(e) => {
                        warn!(agent_id = %agent, error = %e, "Failed to fetch agent location");
                    }
                }
            }
        });

        TrackingHandle {
            agent,
            receiver,
            task,
        }
    }
}

/// Owner of a running location poll.
#[derive(Debug)]
pub struct TrackingHandle {
    agent: DeliveryAgentId,
    receiver: watch::Receiver<Option<TrackedPosition>>,
    task: JoinHandle<()>,
}

impl TrackingHandle {
    #[must_use]
    pub const fn agent(&self) -> DeliveryAgentId {
        self.agent
    }

    /// The most recent valid position, if any has been seen.
    #[must_use]
    pub fn latest(&self) -> Option<TrackedPosition> {
        *self.receiver.borrow()
    }

    /// Wait for the next position. Returns `None` once polling has stopped.
    pub async fn changed(&mut self) -> Option<TrackedPosition> {
        self.receiver.changed().await.ok()?;
        *self.receiver.borrow_and_update()
    }

    /// An independent receiver for the same positions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<TrackedPosition>> {
        self.receiver.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop polling.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            info!(agent_id = %self.agent, "Stopping location tracking");
        }
        self.task.abort();
    }
}
