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

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, instrument, trace, warn};

use crate::common::acknowledge::AcknowledgeDiscipline;
use crate::common::attempt_tracker::{AttemptVerdict, DeliveryAttemptTracker};
use crate::common::session_registry::{CorrelationSessionRegistry, SessionReply};
use crate::error::{DecodeError, DispatchError};
use crate::message::{Envelope, EnvelopeRole, FailureReply, FaultSpecification, Format};
use crate::traits::{ParleyMessage, Transport};

/// What should happen to an inbound message after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handled; remove it from the transport.
    Consumed,
    /// Not handled; make it available for redelivery.
    Rejected,
    /// Nothing to do; remove it without side effects.
    Ignored,
}

type HandlerFuture = BoxFuture<'static, Result<Option<Envelope>, DispatchError>>;

/// A decoded inbound message, ready to run.
struct Prepared {
    fault: Option<FaultSpecification>,
    invoke: Box<dyn FnOnce() -> HandlerFuture + Send>,
}

/// Decodes an envelope's payload into a [`Prepared`] handler call.
type Preparer = Arc<dyn Fn(&Envelope) -> Result<Prepared, DispatchError> + Send + Sync>;

/// Receives replies nobody is waiting for.
type Observer = Arc<dyn Fn(Envelope) -> BoxFuture<'static, Result<(), DispatchError>> + Send + Sync>;

#[derive(Clone)]
enum Route {
    /// Answers with a `response_tag` reply.
    Request {
        response_tag: &'static str,
        prepare: Preparer,
    },
    /// Runs without producing a reply.
    Message { prepare: Preparer },
}

/// Routes inbound envelopes by type tag.
///
/// - Envelopes with the reply role resolve the matching correlation session.
///   A reply without a waiting session goes to the reply observer registered
///   for its type tag, or is ignored. A request kind carrying a correlation
///   key without a reply destination is malformed and rejected.
/// - Requests run their handler, after consulting the
///   [`DeliveryAttemptTracker`] when the payload carries a
///   [`FaultSpecification`], and publish the handler's result back to the
///   request's reply destination under the same correlation key.
/// - Fire-and-forget messages run their handler.
///
/// Routes can be registered while lanes are running.
pub struct ReplyDispatcher {
    routes: DashMap<String, Route>,
    observers: DashMap<String, Observer>,
    transport: Arc<dyn Transport>,
    tracker: Arc<DeliveryAttemptTracker>,
    registry: Arc<CorrelationSessionRegistry>,
    format: Format,
}

impl std::fmt::Debug for ReplyDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyDispatcher")
            .field("routes", &self.routes.len())
            .field("observers", &self.observers.len())
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl ReplyDispatcher {
    /// Creates a dispatcher publishing replies through `transport`.
    ///
    /// Failure replies are encoded with `format`; handler replies use the
    /// format of the request they answer.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        tracker: Arc<DeliveryAttemptTracker>,
        registry: Arc<CorrelationSessionRegistry>,
        format: Format,
    ) -> Self {
        Self {
            routes: DashMap::new(),
            observers: DashMap::new(),
            transport,
            tracker,
            registry,
            format,
        }
    }

    /// The tracker consulted for fault-injected payloads.
    #[must_use]
    pub fn tracker(&self) -> &Arc<DeliveryAttemptTracker> {
        &self.tracker
    }

    /// The registry that correlated replies resolve against.
    #[must_use]
    pub fn registry(&self) -> &Arc<CorrelationSessionRegistry> {
        &self.registry
    }

    /// Registers a handler answering `Req` with `Resp`.
    ///
    /// Replaces any route previously registered for `Req::TYPE_TAG`.
    pub fn on_request<Req, Resp, F, Fut>(&self, handler: F) -> &Self
    where
        Req: ParleyMessage,
        Resp: ParleyMessage,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Resp>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let prepare: Preparer = Arc::new(move |envelope: &Envelope| -> Result<Prepared, DispatchError> {
            let request: Req = envelope.decode_payload()?;
            let fault = request.fault().cloned();
            let handler = Arc::clone(&handler);
            let format = envelope.format;
            let invoke = move || -> HandlerFuture {
                async move {
                    let response = handler(request)
                        .await
                        .map_err(|err| DispatchError::handler(Req::TYPE_TAG, err))?;
                    Ok::<_, DispatchError>(Some(Envelope::from_message(&response, format)?))
                }
                .boxed()
            };
            Ok(Prepared {
                fault,
                invoke: Box::new(invoke),
            })
        });
        self.routes.insert(
            Req::TYPE_TAG.to_string(),
            Route::Request {
                response_tag: Resp::TYPE_TAG,
                prepare,
            },
        );
        trace!(type_tag = Req::TYPE_TAG, response_tag = Resp::TYPE_TAG, "request route registered");
        self
    }

    /// Registers a fire-and-forget handler for `M`.
    ///
    /// Replaces any route previously registered for `M::TYPE_TAG`.
    pub fn on_message<M, F, Fut>(&self, handler: F) -> &Self
    where
        M: ParleyMessage,
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let prepare: Preparer = Arc::new(move |envelope: &Envelope| -> Result<Prepared, DispatchError> {
            let message: M = envelope.decode_payload()?;
            let fault = message.fault().cloned();
            let handler = Arc::clone(&handler);
            let invoke = move || -> HandlerFuture {
                async move {
                    handler(message)
                        .await
                        .map_err(|err| DispatchError::handler(M::TYPE_TAG, err))?;
                    Ok::<_, DispatchError>(None)
                }
                .boxed()
            };
            Ok(Prepared {
                fault,
                invoke: Box::new(invoke),
            })
        });
        self.routes
            .insert(M::TYPE_TAG.to_string(), Route::Message { prepare });
        trace!(type_tag = M::TYPE_TAG, "message route registered");
        self
    }

    /// Registers an observer for `M` replies that no session is waiting for.
    ///
    /// Serves callers that publish requests without waiting and pick the
    /// replies up from the shared reply lane. The observer receives the
    /// correlation key alongside the decoded reply.
    pub fn on_reply<M, F, Fut>(&self, observer: F) -> &Self
    where
        M: ParleyMessage,
        F: Fn(String, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let observer = Arc::new(observer);
        let observe: Observer = Arc::new(move |envelope: Envelope| {
            let observer = Arc::clone(&observer);
            async move {
                let reply: M = envelope.decode_payload()?;
                let correlation_key = envelope.correlation_key.unwrap_or_default();
                observer(correlation_key, reply)
                    .await
                    .map_err(|err| DispatchError::handler(M::TYPE_TAG, err))
            }
            .boxed()
        });
        self.observers.insert(M::TYPE_TAG.to_string(), observe);
        trace!(type_tag = M::TYPE_TAG, "reply observer registered");
        self
    }

    /// Whether a request or message route exists for `type_tag`.
    #[must_use]
    pub fn handles(&self, type_tag: &str) -> bool {
        self.routes.contains_key(type_tag)
    }

    /// Dispatches `envelope`, converting any failure into [`DispatchOutcome::Rejected`].
    pub async fn dispatch(&self, envelope: Envelope) -> DispatchOutcome {
        AcknowledgeDiscipline::outcome_of(self.try_dispatch(envelope).await)
    }

    /// Dispatches `envelope`, reporting why handling failed.
    #[instrument(skip(self, envelope), fields(type_tag = %envelope.type_tag))]
    pub async fn try_dispatch(&self, envelope: Envelope) -> Result<DispatchOutcome, DispatchError> {
        match envelope.role() {
            EnvelopeRole::Reply { correlation_key } => {
                let correlation_key = correlation_key.to_string();
                if self.expects_reply(&envelope.type_tag) {
                    return Err(DecodeError::CorrelationWithoutReplyTo {
                        type_tag: envelope.type_tag.clone(),
                        correlation_key,
                    }
                    .into());
                }
                self.resolve_reply(correlation_key, envelope).await
            }
            EnvelopeRole::Request { .. } | EnvelopeRole::FireAndForget => {
                self.handle_inbound(envelope).await
            }
        }
    }

    fn expects_reply(&self, type_tag: &str) -> bool {
        self.routes
            .get(type_tag)
            .is_some_and(|route| matches!(route.value(), Route::Request { .. }))
    }

    async fn resolve_reply(
        &self,
        correlation_key: String,
        envelope: Envelope,
    ) -> Result<DispatchOutcome, DispatchError> {
        let reply = if envelope.is::<FailureReply>() {
            SessionReply::Exhausted(envelope.decode_payload::<FailureReply>()?)
        } else {
            SessionReply::Delivered(envelope.clone())
        };

        if self.registry.try_resolve(&correlation_key, reply).is_ok() {
            debug!(correlation_key = %correlation_key, outcome = "consumed", "reply resolved its session");
            return Ok(DispatchOutcome::Consumed);
        }

        let observer = self
            .observers
            .get(&envelope.type_tag)
            .map(|observer| Arc::clone(observer.value()));
        match observer {
            Some(observe) => {
                observe(envelope).await?;
                debug!(correlation_key = %correlation_key, outcome = "consumed", "unmatched reply observed");
                Ok(DispatchOutcome::Consumed)
            }
            None => {
                warn!(correlation_key = %correlation_key, outcome = "ignored", "discarding reply with no waiting session");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    async fn handle_inbound(&self, envelope: Envelope) -> Result<DispatchOutcome, DispatchError> {
        let route = self
            .routes
            .get(&envelope.type_tag)
            .map(|route| route.value().clone())
            .ok_or_else(|| DispatchError::UnknownType(envelope.type_tag.clone()))?;

        let (response_tag, prepare) = match route {
            Route::Request {
                response_tag,
                prepare,
            } => (Some(response_tag), prepare),
            Route::Message { prepare } => (None, prepare),
        };

        let prepared = prepare(&envelope)?;

        let attempt_key = match &prepared.fault {
            None => None,
            Some(fault) => {
                let attempt_key = envelope
                    .attempt_identity()
                    .ok_or_else(|| DispatchError::MissingIdentity(envelope.type_tag.clone()))?
                    .to_string();
                let attempt = self.tracker.observe_attempt(&attempt_key);
                let verdict = self.tracker.evaluate(fault, attempt);
                debug!(attempt, ?verdict, "evaluated fault specification");
                match verdict {
                    AttemptVerdict::Succeed => Some((attempt_key, attempt)),
                    AttemptVerdict::FailRetryable => {
                        debug!(attempt, outcome = "rejected", "simulated failure; awaiting redelivery");
                        return Ok(DispatchOutcome::Rejected);
                    }
                    AttemptVerdict::FailExhausted => {
                        if let EnvelopeRole::Request {
                            correlation_key,
                            reply_to,
                        } = envelope.role()
                        {
                            let failure_tag = match response_tag {
                                Some(tag) => tag,
                                None => envelope.type_tag.as_str(),
                            };
                            let failure = FailureReply::for_fault(fault, failure_tag);
                            let reply = Envelope::from_message(&failure, self.format)?
                                .into_reply(correlation_key);
                            self.publish(reply_to, &reply).await?;
                        }
                        self.tracker.forget(&attempt_key);
                        warn!(attempt, outcome = "consumed", "attempts exhausted; giving up");
                        return Ok(DispatchOutcome::Consumed);
                    }
                }
            }
        };

        let reply = match (prepared.invoke)().await {
            Ok(reply) => reply,
            Err(err) => {
                // A record at the attempt limit must not outlive a dead-lettered message.
                if let Some((attempt_key, attempt)) = &attempt_key {
                    if *attempt >= self.tracker.max_attempts() {
                        self.tracker.forget(attempt_key);
                        debug!(attempt = *attempt, "handler failed at the attempt limit; record dropped");
                    }
                }
                return Err(err);
            }
        };

        match (envelope.role(), reply) {
            (
                EnvelopeRole::Request {
                    correlation_key,
                    reply_to,
                },
                Some(reply),
            ) => {
                let reply = reply.into_reply(correlation_key);
                self.publish(reply_to, &reply).await?;
                debug!(correlation_key, reply_to, "reply published");
            }
            (EnvelopeRole::Request { .. }, None) => {
                debug!("request handled by a fire-and-forget route; no reply published");
            }
            (_, Some(_)) => {
                debug!("reply dropped; message carries no reply destination");
            }
            (_, None) => {}
        }

        if let Some((attempt_key, _)) = attempt_key {
            self.tracker.forget(&attempt_key);
        }
        debug!(outcome = "consumed", "message handled");
        Ok(DispatchOutcome::Consumed)
    }

    async fn publish(&self, destination: &str, envelope: &Envelope) -> Result<(), DispatchError> {
        self.transport
            .publish(destination, envelope.to_wire())
            .await
            .map_err(|source| DispatchError::Publish {
                destination: destination.to_string(),
                source,
            })
    }
}
