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

use parley_reactive::prelude::*;
use parley_reactive::samples::{ExceptionMessage, RectangularPrismRequest, SimpleMessage};
use parley_test::prelude::*;

use crate::setup::messages::{Echo, Flaky};
use crate::setup::*;

mod setup;

#[parley_test]
async fn test_declared_messages_carry_their_tags() -> anyhow::Result<()> {
    initialize_tracing();
    assert_eq!(Echo::TYPE_TAG, "Echo");
    assert_eq!(SimpleMessage::TYPE_TAG, "SimpleMessage");
    assert_eq!(FailureReply::TYPE_TAG, "ExceptionResponse");
    assert!(Echo { text: "plain".into() }.fault().is_none());
    Ok(())
}

#[parley_test]
async fn test_fault_fields_are_exposed_and_flattened() -> anyhow::Result<()> {
    initialize_tracing();
    let flaky = Flaky {
        label: "x".into(),
        fault: FaultSpecification::succeed_on(3),
    };
    assert_eq!(flaky.fault().map(|fault| fault.succeed_on_attempt), Some(3));

    let request = RectangularPrismRequest::new(1.0, 2.0, 3.0).with_fault(FaultSpecification::succeed_on(2));
    let json: serde_json::Value = serde_json::from_slice(&Envelope::from_message(&request, Format::Json)?.payload)?;
    assert_eq!(json["succeed_on_attempt"], 2);
    assert_eq!(json["edge_c"], 3.0);
    Ok(())
}

#[parley_test]
async fn test_missing_fault_fields_fail_to_decode() -> anyhow::Result<()> {
    initialize_tracing();
    let envelope = Envelope::new(ExceptionMessage::TYPE_TAG, Format::Json, b"{}".to_vec());
    assert!(matches!(
        envelope.decode_payload::<ExceptionMessage>(),
        Err(DecodeError::Payload { .. })
    ));

    let envelope = Envelope::new(
        ExceptionMessage::TYPE_TAG,
        Format::Json,
        br#"{"succeed_on_attempt":-1}"#.to_vec(),
    );
    let message = envelope.decode_payload::<ExceptionMessage>()?;
    assert!(!message.fault.can_succeed());
    assert!(message.fault.failure_detail.is_empty());
    Ok(())
}

#[cfg(feature = "messagepack")]
#[parley_test]
async fn test_messagepack_envelopes_survive_the_wire() -> anyhow::Result<()> {
    initialize_tracing();
    let envelope = Envelope::from_message(&Echo { text: "packed".into() }, Format::MessagePack)?
        .into_request("req-mp", "replies");
    let decoded = Envelope::from_wire(&envelope.to_wire())?;
    assert_eq!(decoded.format, Format::MessagePack);
    assert_eq!(decoded.decode_payload::<Echo>()?.text, "packed");
    Ok(())
}
