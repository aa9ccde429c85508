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

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, error, instrument, trace};

use crate::common::parley_inner::ParleyInner;
use crate::common::{
    CorrelationSessionRegistry, DeliveryAttemptTracker, LaneGroup, ParleyConfig, ProcessingLane,
    ReplyDispatcher, Requester,
};
use crate::error::TransportError;
use crate::traits::Transport;

/// An initialized Parley runtime.
///
/// Owns the transport handle, the attempt tracker, the correlation registry
/// and every processing lane it starts. Clones refer to the same runtime.
#[derive(Debug, Clone)]
pub struct ParleyRuntime(pub(crate) ParleyInner);

impl ParleyRuntime {
    /// Runtime configuration.
    #[must_use]
    pub fn config(&self) -> &ParleyConfig {
        &self.0.config
    }

    /// The transport every component publishes through.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.0.transport
    }

    /// Attempt counters shared by this runtime's dispatchers.
    #[must_use]
    pub fn tracker(&self) -> &Arc<DeliveryAttemptTracker> {
        &self.0.tracker
    }

    /// Outstanding correlation sessions.
    #[must_use]
    pub fn registry(&self) -> &Arc<CorrelationSessionRegistry> {
        &self.0.registry
    }

    /// Dispatcher behind the shared reply lane.
    ///
    /// Register [`on_reply`](ReplyDispatcher::on_reply) observers here to pick
    /// up replies to requests sent without waiting.
    #[must_use]
    pub fn reply_dispatcher(&self) -> &Arc<ReplyDispatcher> {
        &self.0.reply_dispatcher
    }

    /// Creates an empty dispatcher wired to this runtime's transport, tracker and registry.
    #[must_use]
    pub fn new_dispatcher(&self) -> Arc<ReplyDispatcher> {
        Arc::new(ReplyDispatcher::new(
            Arc::clone(&self.0.transport),
            Arc::clone(&self.0.tracker),
            Arc::clone(&self.0.registry),
            self.0.config.codec.format,
        ))
    }

    /// Starts `count` competing lanes consuming `queue` into `dispatcher`.
    ///
    /// A `count` of 0 starts one lane.
    #[instrument(skip(self, dispatcher))]
    pub async fn start_lanes(
        &self,
        queue: &str,
        dispatcher: &Arc<ReplyDispatcher>,
        count: usize,
    ) -> Result<LaneGroup, TransportError> {
        let mut stats = Vec::with_capacity(count.max(1));
        for index in 0..count.max(1) {
            let subscription = self.0.transport.subscribe(queue).await?;
            let lane = ProcessingLane::new(
                format!("{queue}#{index}"),
                subscription,
                Arc::clone(dispatcher),
                self.0.cancellation_token.child_token(),
            );
            stats.push(lane.stats());
            self.0.lanes.spawn(lane.run());
        }
        debug!(lanes = stats.len(), "lanes started");
        Ok(LaneGroup::new(queue, stats))
    }

    /// Starts the configured number of lanes (`[lanes] consumers_per_queue`) on `queue`.
    pub async fn start_default_lanes(
        &self,
        queue: &str,
        dispatcher: &Arc<ReplyDispatcher>,
    ) -> Result<LaneGroup, TransportError> {
        self.start_lanes(queue, dispatcher, self.0.config.lanes.consumers_per_queue)
            .await
    }

    /// Returns a requester, starting the shared reply lane on first use.
    ///
    /// Every requester of this runtime receives its replies through that one
    /// lane on the configured `[queues] replies` destination.
    pub async fn start_requester(&self) -> Result<Requester, TransportError> {
        let replies = self.0.config.queues.replies.as_str();
        if self
            .0
            .reply_lane_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Err(err) = self.start_lanes(replies, &self.0.reply_dispatcher, 1).await {
                self.0.reply_lane_started.store(false, Ordering::Release);
                return Err(err);
            }
            trace!(replies, "shared reply lane started");
        }

        Ok(Requester::new(
            Arc::clone(&self.0.transport),
            Arc::clone(&self.0.registry),
            replies,
            self.0.config.codec.format,
            self.0.config.reply_timeout(),
        ))
    }

    /// Stops every lane and waits for them within the configured shutdown timeout.
    ///
    /// A lane in the middle of a delivery finishes and settles it before stopping.
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        trace!("Cancelling all lanes.");
        self.0.cancellation_token.cancel();
        self.0.lanes.close();

        let timeout = self.0.config.shutdown_timeout();
        if tokio::time::timeout(timeout, self.0.lanes.wait()).await.is_err() {
            error!("Shutdown timeout expired after {:?} with lanes still running.", timeout);
            return Err(anyhow::anyhow!(
                "Timeout while waiting for lanes to stop after {timeout:?}"
            ));
        }
        trace!("Shutdown complete.");
        Ok(())
    }
}
