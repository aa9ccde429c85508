/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::common::acknowledge::AcknowledgeDiscipline;
use crate::common::dispatcher::{DispatchOutcome, ReplyDispatcher};
use crate::traits::Subscription;

/// Counters for one processing lane.
#[derive(Debug, Default)]
pub struct LaneStats {
    /// Deliveries taken from the subscription.
    pub received: AtomicUsize,
    /// Deliveries settled as consumed.
    pub consumed: AtomicUsize,
    /// Deliveries settled as rejected.
    pub rejected: AtomicUsize,
    /// Deliveries settled as ignored.
    pub ignored: AtomicUsize,
    /// Deliveries the transport refused to settle.
    pub settle_failures: AtomicUsize,
}

impl LaneStats {
    /// Create new statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of deliveries received.
    #[must_use]
    pub fn received(&self) -> usize {
        self.received.load(Ordering::Relaxed)
    }

    /// Get the number of deliveries consumed.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed.load(Ordering::Relaxed)
    }

    /// Get the number of deliveries rejected.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Get the number of deliveries ignored.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Get the number of settle failures.
    #[must_use]
    pub fn settle_failures(&self) -> usize {
        self.settle_failures.load(Ordering::Relaxed)
    }

    fn record(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Consumed => &self.consumed,
            DispatchOutcome::Rejected => &self.rejected,
            DispatchOutcome::Ignored => &self.ignored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Drives one subscription: receive, dispatch, settle, one delivery at a time.
///
/// Deliveries within a lane are handled in the order the transport hands
/// them out. Separate lanes run in parallel; several lanes on the same queue
/// compete for its messages.
pub struct ProcessingLane {
    name: String,
    subscription: Box<dyn Subscription>,
    discipline: AcknowledgeDiscipline,
    stats: Arc<LaneStats>,
    cancellation_token: CancellationToken,
}

impl std::fmt::Debug for ProcessingLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingLane")
            .field("name", &self.name)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ProcessingLane {
    /// Creates a lane feeding `subscription` into `dispatcher`.
    ///
    /// The lane stops when `cancellation_token` is cancelled or the
    /// subscription ends.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        subscription: Box<dyn Subscription>,
        dispatcher: Arc<ReplyDispatcher>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            subscription,
            discipline: AcknowledgeDiscipline::new(dispatcher),
            stats: Arc::new(LaneStats::new()),
            cancellation_token,
        }
    }

    /// Counters for this lane; remain readable after it stops.
    #[must_use]
    pub fn stats(&self) -> Arc<LaneStats> {
        Arc::clone(&self.stats)
    }

    /// Processes deliveries until cancelled or the subscription ends.
    ///
    /// A delivery already being handled when cancellation arrives is finished
    /// and settled first.
    #[instrument(skip(self), fields(lane = %self.name))]
    pub async fn run(mut self) {
        debug!("lane started");
        loop {
            let delivery = tokio::select! {
                biased;
                () = self.cancellation_token.cancelled() => {
                    trace!("lane cancelled");
                    break;
                }
                delivery = self.subscription.next_delivery() => delivery,
            };
            let Some(delivery) = delivery else {
                trace!("subscription ended");
                break;
            };

            self.stats.received.fetch_add(1, Ordering::Relaxed);
            match self.discipline.handle(delivery).await {
                Ok(outcome) => self.stats.record(outcome),
                Err(err) => {
                    self.stats.settle_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %err, "failed to settle delivery");
                }
            }
        }
        debug!(
            received = self.stats.received(),
            consumed = self.stats.consumed(),
            rejected = self.stats.rejected(),
            "lane stopped"
        );
    }
}

/// The lanes started on one queue.
#[derive(Debug, Clone)]
pub struct LaneGroup {
    queue: String,
    stats: Vec<Arc<LaneStats>>,
}

impl LaneGroup {
    pub(crate) fn new(queue: impl Into<String>, stats: Vec<Arc<LaneStats>>) -> Self {
        Self {
            queue: queue.into(),
            stats,
        }
    }

    /// Queue the lanes consume.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Per-lane counters.
    #[must_use]
    pub fn lanes(&self) -> &[Arc<LaneStats>] {
        &self.stats
    }

    /// Deliveries received across all lanes.
    #[must_use]
    pub fn received(&self) -> usize {
        self.stats.iter().map(|stats| stats.received()).sum()
    }

    /// Deliveries consumed across all lanes.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.stats.iter().map(|stats| stats.consumed()).sum()
    }

    /// Deliveries rejected across all lanes.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.stats.iter().map(|stats| stats.rejected()).sum()
    }

    /// Deliveries ignored across all lanes.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.stats.iter().map(|stats| stats.ignored()).sum()
    }
}
