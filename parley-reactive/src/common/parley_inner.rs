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

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::common::{CorrelationSessionRegistry, DeliveryAttemptTracker, ParleyConfig, ReplyDispatcher};
use crate::traits::Transport;

/// Internal state shared by every clone of a [`ParleyRuntime`](crate::common::ParleyRuntime).
#[derive(Debug, Clone)]
pub struct ParleyInner {
    /// The one long-lived transport connection.
    pub(crate) transport: Arc<dyn Transport>,

    /// Attempt counters shared by every dispatcher of this runtime.
    pub(crate) tracker: Arc<DeliveryAttemptTracker>,

    /// Outstanding correlation sessions.
    pub(crate) registry: Arc<CorrelationSessionRegistry>,

    /// Dispatcher behind the shared reply lane.
    pub(crate) reply_dispatcher: Arc<ReplyDispatcher>,

    /// Set once the shared reply lane is running.
    pub(crate) reply_lane_started: Arc<AtomicBool>,

    /// Token for stopping every lane.
    pub(crate) cancellation_token: CancellationToken,

    /// Tracks spawned lane tasks.
    pub(crate) lanes: TaskTracker,

    /// Runtime configuration.
    pub(crate) config: Arc<ParleyConfig>,
}
