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

use std::time::Duration;

use parley_reactive::logging::init_tracing;
use parley_reactive::prelude::*;
use parley_reactive::samples::{register_receiver_handlers, ExceptionMessage, RandomMessageGenerator};
use tracing::info;

// Sends simple, advanced and fault-injected messages without waiting for replies.
#[parley_main]
async fn main() -> anyhow::Result<()> {
    let config = ParleyConfig::load();
    let _guard = init_tracing(&config.tracing);

    let transport = InMemoryTransport::from_config(&config.transport);
    let send_only = config.queues.send_only.clone();
    let runtime = ParleyApp::launch_with_config(Arc::new(transport.clone()), config);

    let receiver = runtime.new_dispatcher();
    register_receiver_handlers(&receiver);
    let lanes = runtime.start_default_lanes(&send_only, &receiver).await?;

    let requester = runtime.start_requester().await?;
    let mut generator = RandomMessageGenerator::new();

    for message in generator.simple_messages(3, 8, 32) {
        requester.send_only(&send_only, &message).await?;
    }
    for message in generator.advanced_messages(2) {
        requester.send_only(&send_only, &message).await?;
    }
    // Rejected twice, handled on the third delivery.
    requester
        .send_only(
            &send_only,
            &ExceptionMessage {
                fault: FaultSpecification::succeed_on(3),
            },
        )
        .await?;

    while lanes.consumed() < 6 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    info!(
        consumed = lanes.consumed(),
        rejected = lanes.rejected(),
        requeued = transport.stats().requeued(),
        "all messages handled"
    );
    runtime.shutdown_all().await
}
