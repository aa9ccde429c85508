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
use std::time::{Duration, Instant};

use futures::future::join_all;
use parley_reactive::prelude::*;
use parley_reactive::samples::{
    handle_process_timeout, handle_rectangular_prism, ProcessTimeoutRequest, ProcessTimeoutResponse,
    RectangularPrismRequest, RectangularPrismResponse,
};
use parley_test::prelude::*;

use crate::setup::*;

mod setup;

const REQUESTS: &str = "parley.send-and-reply";

#[parley_test]
async fn test_reply_within_deadline_is_returned() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, _transport) = runtime_with(test_config());
    let dispatcher = runtime.new_dispatcher();
    dispatcher.on_request(handle_process_timeout);
    runtime.start_lanes(REQUESTS, &dispatcher, 1).await?;
    let requester = runtime.start_requester().await?;

    let request = ProcessTimeoutRequest {
        milliseconds_timeout: 50,
        process_name: "client-1".to_string(),
    };
    let reply: Reply<ProcessTimeoutResponse> = requester
        .send_and_reply_within(REQUESTS, &request, Duration::from_millis(200))
        .await?;

    assert_eq!(
        reply.response().map(|response| response.process_name),
        Some("client-1".to_string())
    );
    assert!(runtime.registry().is_empty());
    runtime.shutdown_all().await
}

#[parley_test]
async fn test_slow_reply_times_out_and_is_discarded() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, _transport) = runtime_with(test_config());
    let dispatcher = runtime.new_dispatcher();
    dispatcher.on_request(handle_process_timeout);
    runtime.start_lanes(REQUESTS, &dispatcher, 1).await?;
    let requester = runtime.start_requester().await?;

    let request = ProcessTimeoutRequest {
        milliseconds_timeout: 150,
        process_name: "sluggish".to_string(),
    };
    let reply: Reply<ProcessTimeoutResponse> = requester
        .send_and_reply_within(REQUESTS, &request, Duration::from_millis(30))
        .await?;
    assert!(reply.is_timed_out());
    assert!(runtime.registry().is_empty());

    // The reply still arrives later and must not disturb a fresh request.
    let follow_up = ProcessTimeoutRequest {
        milliseconds_timeout: 1,
        process_name: "prompt".to_string(),
    };
    let reply: Reply<ProcessTimeoutResponse> = requester.send_and_reply(REQUESTS, &follow_up).await?;
    assert_eq!(
        reply.response().map(|response| response.process_name),
        Some("prompt".to_string())
    );
    runtime.shutdown_all().await
}

#[parley_test]
async fn test_request_succeeds_after_simulated_failures() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, transport) = runtime_with(test_config());
    let handled = Arc::new(AtomicUsize::new(0));
    let dispatcher = runtime.new_dispatcher();
    {
        let handled = Arc::clone(&handled);
        dispatcher.on_request(move |request: RectangularPrismRequest| {
            let handled = Arc::clone(&handled);
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                handle_rectangular_prism(request).await
            }
        });
    }
    let lanes = runtime.start_lanes(REQUESTS, &dispatcher, 1).await?;
    let requester = runtime.start_requester().await?;

    let request = RectangularPrismRequest::new(2.0, 3.0, 4.0).with_fault(FaultSpecification::succeed_on(3));
    let reply: Reply<RectangularPrismResponse> = requester.send_and_reply(REQUESTS, &request).await?;

    let response = reply.response().expect("prism response");
    assert_eq!(response.surface_area, 52.0);
    assert_eq!(response.volume, 24.0);
    assert_eq!(handled.load(Ordering::SeqCst), 1);
    assert_eq!(lanes.rejected(), 2);
    assert!(eventually(Duration::from_secs(1), || lanes.consumed() == 1).await);
    assert_eq!(transport.stats().requeued(), 2);
    assert!(runtime.tracker().is_empty());
    runtime.shutdown_all().await
}

#[parley_test]
async fn test_never_succeeding_request_reports_failure() -> anyhow::Result<()> {
    initialize_tracing();
    let mut config = test_config();
    config.retry.max_attempts = 3;
    let (runtime, _transport) = runtime_with(config);
    let dispatcher = runtime.new_dispatcher();
    dispatcher.on_request(handle_rectangular_prism);
    runtime.start_lanes(REQUESTS, &dispatcher, 2).await?;
    let requester = runtime.start_requester().await?;

    let request = RectangularPrismRequest::new(1.0, 1.0, 1.0).with_fault(FaultSpecification::never_succeeds());
    let reply: Reply<RectangularPrismResponse> = requester.send_and_reply(REQUESTS, &request).await?;

    match reply {
        Reply::Failed(failure) => {
            assert_eq!(failure.text, "No response found for: RectangularPrismResponse!");
        }
        other => panic!("expected a failure reply, got {other:?}"),
    }
    runtime.shutdown_all().await
}

#[parley_test]
async fn test_concurrent_requests_each_get_their_own_reply() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, _transport) = runtime_with(test_config());
    let dispatcher = runtime.new_dispatcher();
    dispatcher.on_request(handle_process_timeout);
    runtime.start_lanes(REQUESTS, &dispatcher, 5).await?;
    let requester = runtime.start_requester().await?;

    let delays = [100_u64, 10, 70, 30, 50];
    let requests: Vec<ProcessTimeoutRequest> = delays
        .iter()
        .enumerate()
        .map(|(index, delay)| ProcessTimeoutRequest {
            milliseconds_timeout: *delay,
            process_name: format!("client-{}", index + 1),
        })
        .collect();

    let started = Instant::now();
    let replies = join_all(requests.iter().map(|request| {
        requester.send_and_reply::<_, ProcessTimeoutResponse>(REQUESTS, request)
    }))
    .await;
    let elapsed = started.elapsed();

    for (request, reply) in requests.iter().zip(replies) {
        let response = reply?.response().expect("reply before the deadline");
        assert_eq!(response.process_name, request.process_name);
    }
    let slowest = Duration::from_millis(delays.iter().copied().max().unwrap_or_default());
    assert!(elapsed < slowest * 2, "took {elapsed:?}, slowest single request is {slowest:?}");
    assert!(runtime.registry().is_empty());
    runtime.shutdown_all().await
}

#[parley_test]
async fn test_reply_survives_a_temporarily_unavailable_destination() -> anyhow::Result<()> {
    initialize_tracing();
    let mut config = test_config();
    config.transport.max_redeliveries = 1_000_000;
    let replies = config.queues.replies.clone();
    let (runtime, transport) = runtime_with(config);
    let dispatcher = runtime.new_dispatcher();
    dispatcher.on_request(handle_process_timeout);
    let lanes = runtime.start_lanes(REQUESTS, &dispatcher, 1).await?;
    let requester = runtime.start_requester().await?;

    transport.set_unavailable(&replies, true);
    let restore = {
        let transport = transport.clone();
        let replies = replies.clone();
        let lanes_rejected = lanes.lanes().to_vec();
        tokio::spawn(async move {
            eventually(Duration::from_secs(1), || {
                lanes_rejected.iter().map(|lane| lane.rejected()).sum::<usize>() >= 2
            })
            .await;
            transport.set_unavailable(&replies, false);
        })
    };

    let request = ProcessTimeoutRequest {
        milliseconds_timeout: 1,
        process_name: "patient".to_string(),
    };
    let reply: Reply<ProcessTimeoutResponse> = requester.send_and_reply(REQUESTS, &request).await?;
    restore.await?;

    assert_eq!(
        reply.response().map(|response| response.process_name),
        Some("patient".to_string())
    );
    assert!(lanes.rejected() >= 2);
    runtime.shutdown_all().await
}

#[parley_test]
async fn test_reply_observer_receives_unwaited_replies() -> anyhow::Result<()> {
    initialize_tracing();
    let (runtime, _transport) = runtime_with(test_config());
    let dispatcher = runtime.new_dispatcher();
    dispatcher.on_request(handle_process_timeout);
    runtime.start_lanes(REQUESTS, &dispatcher, 1).await?;

    let (sender, mut observed) = tokio::sync::mpsc::unbounded_channel();
    runtime
        .reply_dispatcher()
        .on_reply(move |correlation_key: String, response: ProcessTimeoutResponse| {
            let sender = sender.clone();
            async move {
                sender.send((correlation_key, response.process_name))?;
                Ok::<_, anyhow::Error>(())
            }
        });
    let requester = runtime.start_requester().await?;

    let request = ProcessTimeoutRequest {
        milliseconds_timeout: 1,
        process_name: "fire-and-collect".to_string(),
    };
    let correlation_key = requester.send_and_reply_no_wait(REQUESTS, &request).await?;

    let (key, process_name) = tokio::time::timeout(Duration::from_secs(2), observed.recv())
        .await?
        .expect("observed reply");
    assert_eq!(key, correlation_key);
    assert_eq!(process_name, "fire-and-collect");
    runtime.shutdown_all().await
}
