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

use parley_reactive::logging::init_tracing;
use parley_reactive::prelude::*;
use parley_reactive::samples::{
    register_receiver_handlers, RectangularPrismRequest, RectangularPrismResponse,
};
use tracing::{info, warn};

#[parley_main]
async fn main() -> anyhow::Result<()> {
    let config = ParleyConfig::load();
    let _guard = init_tracing(&config.tracing);

    let transport = InMemoryTransport::from_config(&config.transport);
    let requests = config.queues.send_and_reply.clone();
    let runtime = ParleyApp::launch_with_config(Arc::new(transport), config);

    let receiver = runtime.new_dispatcher();
    register_receiver_handlers(&receiver);
    runtime.start_default_lanes(&requests, &receiver).await?;
    let requester = runtime.start_requester().await?;

    let attempts = [
        RectangularPrismRequest::new(2.0, 3.0, 4.0),
        RectangularPrismRequest::new(1.5, 1.5, 1.5).with_fault(FaultSpecification::succeed_on(3)),
        RectangularPrismRequest::new(5.0, 1.0, 2.0).with_fault(FaultSpecification::never_succeeds()),
    ];

    for request in &attempts {
        info!(%request, succeed_on = request.fault.succeed_on_attempt, "sending");
        match requester
            .send_and_reply::<_, RectangularPrismResponse>(&requests, request)
            .await?
        {
            Reply::Response(response) => info!(%response, "reply received"),
            Reply::Failed(failure) => warn!(text = %failure.text, "receiver gave up"),
            Reply::TimedOut => warn!("no reply before the deadline"),
        }
    }

    runtime.shutdown_all().await
}
