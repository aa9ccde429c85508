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

use std::time::Instant;

use futures::future::join_all;
use parley_reactive::logging::init_tracing;
use parley_reactive::prelude::*;
use parley_reactive::samples::{
    register_receiver_handlers, ProcessTimeoutResponse, RandomMessageGenerator,
};
use tracing::{info, warn};

const CLIENTS: usize = 5;

// Several callers share one reply lane; each still gets its own reply.
#[parley_main]
async fn main() -> anyhow::Result<()> {
    let config = ParleyConfig::load();
    let _guard = init_tracing(&config.tracing);

    let transport = InMemoryTransport::from_config(&config.transport);
    let requests = config.queues.send_and_reply.clone();
    let runtime = ParleyApp::launch_with_config(Arc::new(transport), config);

    let receiver = runtime.new_dispatcher();
    register_receiver_handlers(&receiver);
    runtime.start_lanes(&requests, &receiver, CLIENTS).await?;
    let requester = runtime.start_requester().await?;

    let clients = RandomMessageGenerator::new().process_timeout_requests(CLIENTS, 10, 1_000);
    let total: u64 = clients.iter().map(|client| client.milliseconds_timeout).sum();

    let destination = requests.as_str();
    let started = Instant::now();
    let replies = join_all(clients.iter().map(|client| {
        let requester = requester.clone();
        async move {
            let reply = requester
                .send_and_reply::<_, ProcessTimeoutResponse>(destination, client)
                .await;
            (client, reply)
        }
    }))
    .await;

    for (client, reply) in replies {
        match reply? {
            Reply::Response(response) => info!(
                client = %client.process_name,
                answered = %response.process_name,
                slept_ms = client.milliseconds_timeout,
                "reply received"
            ),
            other => warn!(client = %client.process_name, ?other, "no response"),
        }
    }
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        sequential_ms = total,
        "all clients answered"
    );

    runtime.shutdown_all().await
}
