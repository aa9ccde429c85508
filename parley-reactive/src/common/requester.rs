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

use std::sync::Arc;
use std::time::Duration;

use mti::prelude::*;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::common::session_registry::{CorrelationSessionRegistry, ReplyOutcome};
use crate::error::RequestError;
use crate::message::{Envelope, FailureReply, Format};
use crate::traits::{ParleyMessage, Transport};

/// How a send-and-reply call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<Resp> {
    /// The receiver's reply.
    Response(Resp),
    /// The receiver gave up and said so.
    Failed(FailureReply),
    /// No reply arrived before the deadline.
    TimedOut,
}

impl<Resp> Reply<Resp> {
    /// The response, if one arrived.
    pub fn response(self) -> Option<Resp> {
        match self {
            Self::Response(response) => Some(response),
            Self::Failed(_) | Self::TimedOut => None,
        }
    }

    /// Whether the deadline elapsed.
    pub const fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// The caller side: publishes messages and awaits correlated replies.
///
/// All requests name the same reply destination, which is read by a single
/// shared reply lane that resolves sessions by correlation key. Cloning is
/// cheap and clones share the registry.
#[derive(Debug, Clone)]
pub struct Requester {
    transport: Arc<dyn Transport>,
    registry: Arc<CorrelationSessionRegistry>,
    reply_to: String,
    format: Format,
    reply_timeout: Duration,
}

fn new_key(prefix: &str) -> String {
    prefix.create_type_id::<V7>().to_string()
}

impl Requester {
    /// Creates a requester whose replies come back on `reply_to`.
    ///
    /// Something must be dispatching `reply_to` into `registry` for replies to
    /// be seen; [`ParleyRuntime::start_requester`](crate::common::ParleyRuntime::start_requester)
    /// sets that up.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<CorrelationSessionRegistry>,
        reply_to: impl Into<String>,
        format: Format,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            registry,
            reply_to: reply_to.into(),
            format,
            reply_timeout,
        }
    }

    /// Destination replies are published to.
    #[must_use]
    pub fn reply_destination(&self) -> &str {
        &self.reply_to
    }

    /// Default wait used by [`send_and_reply`](Self::send_and_reply).
    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Publishes `message` without expecting a reply.
    ///
    /// Returns the attempt key the message was sent with.
    #[instrument(skip(self, message), fields(type_tag = M::TYPE_TAG))]
    pub async fn send_only<M: ParleyMessage>(
        &self,
        destination: &str,
        message: &M,
    ) -> Result<String, RequestError> {
        let attempt_key = new_key("msg");
        let envelope = Envelope::from_message(message, self.format)?.with_attempt_key(attempt_key.as_str());
        self.publish(destination, &envelope).await?;
        debug!(attempt_key = %attempt_key, "message sent");
        Ok(attempt_key)
    }

    /// Publishes `request` and waits up to the configured reply timeout for its reply.
    pub async fn send_and_reply<Req, Resp>(
        &self,
        destination: &str,
        request: &Req,
    ) -> Result<Reply<Resp>, RequestError>
    where
        Req: ParleyMessage,
        Resp: ParleyMessage,
    {
        self.send_and_reply_within(destination, request, self.reply_timeout)
            .await
    }

    /// Publishes `request` and waits up to `timeout` for its reply.
    ///
    /// A fresh correlation key is generated for every call. [`Reply::TimedOut`]
    /// is a normal return value; errors are reserved for encoding, publishing
    /// and replies that do not decode as `Resp`.
    #[instrument(skip(self, request), fields(type_tag = Req::TYPE_TAG, correlation_key = tracing::field::Empty))]
    pub async fn send_and_reply_within<Req, Resp>(
        &self,
        destination: &str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Reply<Resp>, RequestError>
    where
        Req: ParleyMessage,
        Resp: ParleyMessage,
    {
        let correlation_key = new_key("req");
        tracing::Span::current().record("correlation_key", correlation_key.as_str());

        let envelope = Envelope::from_message(request, self.format)?
            .into_request(correlation_key.as_str(), self.reply_to.as_str())
            .with_attempt_key(new_key("msg"));

        let session = self
            .registry
            .open(correlation_key.as_str(), Instant::now() + timeout)?;

        // Dropping the session on the error path abandons it.
        self.publish(destination, &envelope).await?;

        match session.wait().await {
            ReplyOutcome::Delivered(reply) => {
                debug!("reply received");
                Ok(Reply::Response(reply.decode_payload()?))
            }
            ReplyOutcome::Exhausted(failure) => {
                warn!(text = %failure.text, "receiver reported a terminal failure");
                Ok(Reply::Failed(failure))
            }
            ReplyOutcome::TimedOut => {
                debug!(?timeout, "no reply before the deadline");
                Ok(Reply::TimedOut)
            }
        }
    }

    /// Publishes `request` with a reply destination but does not wait for it.
    ///
    /// The reply arrives on the shared reply lane with no session open for it
    /// and is handed to the reply observer registered for its type. Returns
    /// the correlation key the reply will carry.
    #[instrument(skip(self, request), fields(type_tag = Req::TYPE_TAG))]
    pub async fn send_and_reply_no_wait<Req: ParleyMessage>(
        &self,
        destination: &str,
        request: &Req,
    ) -> Result<String, RequestError> {
        let correlation_key = new_key("req");
        let envelope = Envelope::from_message(request, self.format)?
            .into_request(correlation_key.as_str(), self.reply_to.as_str())
            .with_attempt_key(new_key("msg"));
        self.publish(destination, &envelope).await?;
        debug!(correlation_key = %correlation_key, "request sent without waiting");
        Ok(correlation_key)
    }

    async fn publish(&self, destination: &str, envelope: &Envelope) -> Result<(), RequestError> {
        self.transport
            .publish(destination, envelope.to_wire())
            .await
            .map_err(|source| RequestError::Publish {
                destination: destination.to_string(),
                source,
            })
    }
}
