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

use parley_reactive::message::{CORRELATION_KEY_HEADER, FORMAT_HEADER, REPLY_TO_HEADER, TYPE_HEADER};
use parley_reactive::prelude::*;
use parley_reactive::transport::InMemoryTransport;
use parley_test::prelude::*;

use crate::setup::messages::{Echo, EchoReply, Flaky, FlakyReply};
use crate::setup::*;

mod setup;

fn dispatcher_over(transport: &InMemoryTransport, max_attempts: u32) -> ReplyDispatcher {
    ReplyDispatcher::new(
        Arc::new(transport.clone()),
        Arc::new(DeliveryAttemptTracker::new(max_attempts)),
        Arc::new(CorrelationSessionRegistry::new()),
        Format::Json,
    )
}

fn echo_dispatcher(transport: &InMemoryTransport) -> ReplyDispatcher {
    let dispatcher = dispatcher_over(transport, 10);
    dispatcher.on_request(|echo: Echo| async move { Ok(EchoReply { text: echo.text }) });
    dispatcher
}

#[parley_test]
async fn test_undecodable_payload_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = echo_dispatcher(&transport);

    let garbage = Envelope::new(Echo::TYPE_TAG, Format::Json, b"{not json".to_vec())
        .into_request("req-1", "replies");
    assert!(matches!(
        dispatcher.try_dispatch(garbage.clone()).await,
        Err(DispatchError::Decode(DecodeError::Payload { .. }))
    ));
    assert_eq!(dispatcher.dispatch(garbage).await, DispatchOutcome::Rejected);

    let wrong_shape = Envelope::new(Echo::TYPE_TAG, Format::Json, br#"{"words":1}"#.to_vec());
    assert_eq!(dispatcher.dispatch(wrong_shape).await, DispatchOutcome::Rejected);
    assert_eq!(transport.stats().published(), 0);
    Ok(())
}

#[parley_test]
async fn test_unknown_type_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = echo_dispatcher(&transport);

    let stranger = Envelope::new("Stranger", Format::Json, b"{}".to_vec());
    assert!(matches!(
        dispatcher.try_dispatch(stranger.clone()).await,
        Err(DispatchError::UnknownType(tag)) if tag == "Stranger"
    ));
    assert_eq!(dispatcher.dispatch(stranger).await, DispatchOutcome::Rejected);
    Ok(())
}

#[parley_test]
async fn test_malformed_headers_are_rejected_on_delivery() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let discipline = AcknowledgeDiscipline::new(Arc::new(echo_dispatcher(&transport)));
    let mut inbound = transport.subscribe("inbound").await?;

    let malformed = [
        WireMessage::new(br#"{"text":"hi"}"#.to_vec()),
        WireMessage::new(br#"{"text":"hi"}"#.to_vec())
            .with_header(TYPE_HEADER, Echo::TYPE_TAG)
            .with_header(REPLY_TO_HEADER, "replies"),
        WireMessage::new(br#"{"text":"hi"}"#.to_vec())
            .with_header(TYPE_HEADER, Echo::TYPE_TAG)
            .with_header(FORMAT_HEADER, "yaml"),
    ];
    for message in malformed {
        transport.publish("inbound", message).await?;
        let delivery = inbound.next_delivery().await.expect("delivery");
        assert_eq!(discipline.handle(delivery).await?, DispatchOutcome::Rejected);
        // Drain the requeued copy so the next message is read fresh.
        let again = inbound.next_delivery().await.expect("redelivery");
        assert_eq!(again.delivery_count, 2);
        again.handle.settle(Settlement::Ack).await?;
    }
    assert_eq!(transport.stats().requeued(), 3);
    Ok(())
}

#[parley_test]
async fn test_reply_without_a_session_is_ignored() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = echo_dispatcher(&transport);

    let late = Envelope::from_message(&EchoReply { text: "late".into() }, Format::Json)?
        .into_reply("req-gone");
    assert_eq!(dispatcher.try_dispatch(late.clone()).await?, DispatchOutcome::Ignored);
    assert_eq!(dispatcher.dispatch(late).await, DispatchOutcome::Ignored);
    assert!(dispatcher.registry().is_empty());
    assert_eq!(transport.stats().published(), 0);
    Ok(())
}

#[parley_test]
async fn test_reply_is_published_under_the_request_key() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = echo_dispatcher(&transport);
    let mut replies = transport.subscribe("replies").await?;

    let request = Envelope::from_message(&Echo { text: "hello".into() }, Format::Json)?
        .into_request("req-42", "replies");
    assert_eq!(dispatcher.dispatch(request).await, DispatchOutcome::Consumed);

    let delivery = replies.next_delivery().await.expect("reply");
    assert_eq!(delivery.message.header(CORRELATION_KEY_HEADER), Some("req-42"));
    assert_eq!(delivery.message.header(REPLY_TO_HEADER), None);
    let reply = Envelope::from_wire(&delivery.message)?;
    assert_eq!(reply.decode_payload::<EchoReply>()?.text, "hello");
    Ok(())
}

#[parley_test]
async fn test_unpublishable_reply_rejects_the_request() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let handled = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher_over(&transport, 10);
    {
        let handled = Arc::clone(&handled);
        dispatcher.on_request(move |echo: Echo| {
            let handled = Arc::clone(&handled);
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(EchoReply { text: echo.text })
            }
        });
    }

    let request = Envelope::from_message(&Echo { text: "retry me".into() }, Format::Json)?
        .into_request("req-7", "replies");

    transport.set_unavailable("replies", true);
    assert!(matches!(
        dispatcher.try_dispatch(request.clone()).await,
        Err(DispatchError::Publish { destination, .. }) if destination == "replies"
    ));

    transport.set_unavailable("replies", false);
    assert_eq!(dispatcher.dispatch(request).await, DispatchOutcome::Consumed);
    assert_eq!(handled.load(Ordering::SeqCst), 2);
    assert_eq!(transport.stats().published(), 1);
    Ok(())
}

#[parley_test]
async fn test_exhausted_request_gets_a_failure_reply() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = dispatcher_over(&transport, 3);
    dispatcher.on_request(|flaky: Flaky| async move { Ok(FlakyReply { label: flaky.label }) });
    let mut replies = transport.subscribe("replies").await?;

    let request = Envelope::from_message(
        &Flaky {
            label: "doomed".into(),
            fault: FaultSpecification::never_succeeds(),
        },
        Format::Json,
    )?
    .into_request("req-doomed", "replies");

    assert_eq!(dispatcher.dispatch(request.clone()).await, DispatchOutcome::Rejected);
    assert_eq!(dispatcher.dispatch(request.clone()).await, DispatchOutcome::Rejected);
    assert_eq!(transport.stats().published(), 0);
    assert_eq!(dispatcher.dispatch(request).await, DispatchOutcome::Consumed);

    let delivery = replies.next_delivery().await.expect("failure reply");
    let reply = Envelope::from_wire(&delivery.message)?;
    assert_eq!(reply.correlation_key.as_deref(), Some("req-doomed"));
    assert_eq!(
        reply.decode_payload::<FailureReply>()?.text,
        "No response found for: FlakyReply!"
    );
    assert!(dispatcher.tracker().is_empty());
    Ok(())
}

#[parley_test]
async fn test_fault_uses_the_failure_detail_when_given() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = dispatcher_over(&transport, 1);
    dispatcher.on_request(|flaky: Flaky| async move { Ok(FlakyReply { label: flaky.label }) });
    let mut replies = transport.subscribe("replies").await?;

    let request = Envelope::from_message(
        &Flaky {
            label: "detailed".into(),
            fault: FaultSpecification::never_succeeds().with_failure_detail("prism collapsed"),
        },
        Format::Json,
    )?
    .into_request("req-detail", "replies");
    assert_eq!(dispatcher.dispatch(request).await, DispatchOutcome::Consumed);

    let delivery = replies.next_delivery().await.expect("failure reply");
    let reply = Envelope::from_wire(&delivery.message)?;
    assert_eq!(reply.decode_payload::<FailureReply>()?.text, "prism collapsed");
    Ok(())
}

#[parley_test]
async fn test_request_without_reply_destination_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let handled = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher_over(&transport, 10);
    {
        let handled = Arc::clone(&handled);
        dispatcher.on_request(move |echo: Echo| {
            let handled = Arc::clone(&handled);
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(EchoReply { text: echo.text })
            }
        });
    }

    let stranded = Envelope::from_message(&Echo { text: "nowhere".into() }, Format::Json)?
        .into_reply("req-stranded");
    assert!(matches!(
        dispatcher.try_dispatch(stranded.clone()).await,
        Err(DispatchError::Decode(DecodeError::CorrelationWithoutReplyTo { type_tag, correlation_key }))
            if type_tag == Echo::TYPE_TAG && correlation_key == "req-stranded"
    ));
    assert_eq!(dispatcher.dispatch(stranded).await, DispatchOutcome::Rejected);
    assert_eq!(handled.load(Ordering::SeqCst), 0);
    assert_eq!(transport.stats().published(), 0);
    Ok(())
}

#[parley_test]
async fn test_failing_handler_drops_its_record_at_the_attempt_limit() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = dispatcher_over(&transport, 2);
    dispatcher.on_message(|_flaky: Flaky| async move { Err::<(), _>(anyhow::anyhow!("still broken")) });

    let message = Envelope::from_message(
        &Flaky {
            label: "broken".into(),
            fault: FaultSpecification::succeed_on(1),
        },
        Format::Json,
    )?
    .with_attempt_key("msg-broken");

    assert_eq!(dispatcher.dispatch(message.clone()).await, DispatchOutcome::Rejected);
    assert_eq!(dispatcher.tracker().attempts("msg-broken"), Some(1));

    assert_eq!(dispatcher.dispatch(message).await, DispatchOutcome::Rejected);
    assert_eq!(dispatcher.tracker().attempts("msg-broken"), None);
    assert!(dispatcher.tracker().is_empty());
    Ok(())
}

#[parley_test]
async fn test_fault_without_identity_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = dispatcher_over(&transport, 10);
    dispatcher.on_message(|_flaky: Flaky| async move { Ok(()) });

    let anonymous = Envelope::from_message(
        &Flaky {
            label: "anonymous".into(),
            fault: FaultSpecification::succeed_on(1),
        },
        Format::Json,
    )?;
    assert!(matches!(
        dispatcher.try_dispatch(anonymous.clone()).await,
        Err(DispatchError::MissingIdentity(_))
    ));

    let identified = anonymous.with_attempt_key("msg-1");
    assert_eq!(dispatcher.dispatch(identified).await, DispatchOutcome::Consumed);
    Ok(())
}

#[parley_test]
async fn test_unmatched_reply_reaches_its_observer() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = InMemoryTransport::new();
    let dispatcher = echo_dispatcher(&transport);
    let (sender, mut observed) = tokio::sync::mpsc::unbounded_channel();
    dispatcher.on_reply(move |correlation_key: String, reply: EchoReply| {
        let sender = sender.clone();
        async move {
            sender.send((correlation_key, reply.text))?;
            Ok::<_, anyhow::Error>(())
        }
    });

    let reply = Envelope::from_message(&EchoReply { text: "later".into() }, Format::Json)?
        .into_reply("req-unwaited");
    assert_eq!(dispatcher.dispatch(reply).await, DispatchOutcome::Consumed);
    assert_eq!(
        observed.recv().await,
        Some(("req-unwaited".to_string(), "later".to_string()))
    );
    Ok(())
}
