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
use tracing::trace;

use crate::common::parley_inner::ParleyInner;
use crate::common::{
    CorrelationSessionRegistry, DeliveryAttemptTracker, ParleyConfig, ParleyRuntime,
    ReplyDispatcher,
};
use crate::traits::Transport;

/// Entry point for initializing a Parley runtime.
///
/// - [`ParleyApp::launch_async()`] - Preferred when in an async context
/// - [`ParleyApp::launch_with_config()`] - With an explicit configuration
/// - [`ParleyApp::launch()`] - For synchronous contexts (will panic if called from async)
#[derive(Default, Debug, Clone)]
pub struct ParleyApp;

impl ParleyApp {
    /// Initializes a runtime over `transport` with configuration from
    /// [`ParleyConfig::load`].
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use parley_reactive::prelude::*;
    ///
    /// #[parley_main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let runtime = ParleyApp::launch_async(Arc::new(InMemoryTransport::new())).await;
    ///     // Use runtime...
    ///     runtime.shutdown_all().await
    /// }
    /// ```
    pub async fn launch_async(transport: Arc<dyn Transport>) -> ParleyRuntime {
        trace!("Starting Parley initialization (async)");
        let config = ParleyConfig::load();
        trace!("Configuration loaded: {:?}", config);
        Self::launch_with_config(transport, config)
    }

    /// Initializes a runtime over `transport` with an explicit configuration.
    #[must_use]
    pub fn launch_with_config(transport: Arc<dyn Transport>, config: ParleyConfig) -> ParleyRuntime {
        let tracker = Arc::new(DeliveryAttemptTracker::from_config(&config.retry));
        let registry = Arc::new(CorrelationSessionRegistry::new());
        let reply_dispatcher = Arc::new(ReplyDispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&tracker),
            Arc::clone(&registry),
            config.codec.format,
        ));

        let runtime = ParleyRuntime(ParleyInner {
            transport,
            tracker,
            registry,
            reply_dispatcher,
            reply_lane_started: Arc::new(AtomicBool::new(false)),
            cancellation_token: CancellationToken::new(),
            lanes: TaskTracker::new(),
            config: Arc::new(config),
        });
        trace!("Parley initialization complete");
        runtime
    }

    /// Initializes a runtime synchronously.
    ///
    /// No task is spawned during initialization, so the returned runtime can be
    /// used from any Tokio runtime entered later.
    ///
    /// # Panics
    ///
    /// Panics if called from within an existing Tokio runtime. Use
    /// [`launch_async()`](Self::launch_async) instead when in an async context.
    #[must_use]
    pub fn launch(transport: Arc<dyn Transport>) -> ParleyRuntime {
        assert!(
            tokio::runtime::Handle::try_current().is_err(),
            "ParleyApp::launch() was called from within a Tokio runtime. \
             Use ParleyApp::launch_async().await instead when in an async context."
        );

        trace!("Starting Parley initialization (sync)");
        Self::launch_with_config(transport, ParleyConfig::load())
    }
}
