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

use crate::error::{DecodeError, EncodeError};
use crate::message::Format;
use crate::traits::ParleyMessage;

/// Wire-level unit exchanged between parties.
///
/// The payload is opaque to the envelope; [`Envelope::from_message`] and
/// [`Envelope::decode_payload`] convert to and from typed messages using the
/// envelope's [`Format`].
///
/// A reply destination is only meaningful together with a correlation key;
/// [`Envelope::from_wire`](crate::message::Envelope::from_wire) rejects the
/// combination of one without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Logical message kind; drives dispatch.
    pub type_tag: String,
    /// Links a request to its reply. Absent for fire-and-forget traffic.
    pub correlation_key: Option<String>,
    /// Where the reply must be published. Present only on requests.
    pub reply_to: Option<String>,
    /// Stable identity used to count delivery attempts.
    pub attempt_key: Option<String>,
    /// Format of `payload`.
    pub format: Format,
    /// Serialized message body.
    pub payload: Vec<u8>,
}

/// The role an envelope plays, derived from its correlation headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeRole<'a> {
    /// Expects a reply under `correlation_key` at `reply_to`.
    Request {
        /// Correlation key the reply must carry.
        correlation_key: &'a str,
        /// Destination for the reply.
        reply_to: &'a str,
    },
    /// Answers the request that opened `correlation_key`.
    Reply {
        /// Correlation key of the originating request.
        correlation_key: &'a str,
    },
    /// Neither correlated nor answered.
    FireAndForget,
}

impl Envelope {
    /// Creates a fire-and-forget envelope around an already-serialized payload.
    pub fn new(type_tag: impl Into<String>, format: Format, payload: Vec<u8>) -> Self {
        Self {
            type_tag: type_tag.into(),
            correlation_key: None,
            reply_to: None,
            attempt_key: None,
            format,
            payload,
        }
    }

    /// Serializes `message` into a fire-and-forget envelope tagged with `M::TYPE_TAG`.
    pub fn from_message<M: ParleyMessage>(message: &M, format: Format) -> Result<Self, EncodeError> {
        let payload = format.serialize(message).map_err(|reason| EncodeError {
            type_tag: M::TYPE_TAG.to_string(),
            reason,
        })?;
        Ok(Self::new(M::TYPE_TAG, format, payload))
    }

    /// Turns this envelope into a request answered at `reply_to` under `correlation_key`.
    #[must_use]
    pub fn into_request(mut self, correlation_key: impl Into<String>, reply_to: impl Into<String>) -> Self {
        self.correlation_key = Some(correlation_key.into());
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Turns this envelope into the reply for `correlation_key`.
    #[must_use]
    pub fn into_reply(mut self, correlation_key: impl Into<String>) -> Self {
        self.correlation_key = Some(correlation_key.into());
        self.reply_to = None;
        self
    }

    /// Sets the attempt key.
    #[must_use]
    pub fn with_attempt_key(mut self, attempt_key: impl Into<String>) -> Self {
        self.attempt_key = Some(attempt_key.into());
        self
    }

    /// Deserializes the payload as `M`.
    pub fn decode_payload<M: ParleyMessage>(&self) -> Result<M, DecodeError> {
        self.format
            .deserialize(&self.payload)
            .map_err(|reason| DecodeError::Payload {
                type_tag: self.type_tag.clone(),
                reason,
            })
    }

    /// Whether the envelope carries `M`'s type tag.
    #[must_use]
    pub fn is<M: ParleyMessage>(&self) -> bool {
        self.type_tag == M::TYPE_TAG
    }

    /// The role derived from the correlation key and reply destination.
    #[must_use]
    pub fn role(&self) -> EnvelopeRole<'_> {
        match (self.correlation_key.as_deref(), self.reply_to.as_deref()) {
            (Some(correlation_key), Some(reply_to)) => EnvelopeRole::Request {
                correlation_key,
                reply_to,
            },
            (Some(correlation_key), None) => EnvelopeRole::Reply { correlation_key },
            (None, _) => EnvelopeRole::FireAndForget,
        }
    }

    /// Identity used for attempt counting: the attempt key, else the correlation key.
    #[must_use]
    pub fn attempt_identity(&self) -> Option<&str> {
        self.attempt_key
            .as_deref()
            .or(self.correlation_key.as_deref())
    }
}
