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

#![forbid(unsafe_code)]

//! # Parley Reactive
//!
//! Transport-agnostic request/reply correlation for at-least-once message
//! transports. A caller publishes a request carrying a correlation key and a
//! reply destination, then awaits the matching reply; the receiving side decodes
//! the request, runs the business handler and publishes the reply back under the
//! same key. Every inbound message is acknowledged or rejected for redelivery
//! depending on how its handling went.
//!
//! ## Key Concepts
//!
//! - **Envelope**: wire-level wrapper carrying a type tag, an optional
//!   correlation key, an optional reply destination and an attempt key around
//!   an opaque payload.
//! - **Delivery Attempt Tracker**: counts handling attempts per attempt key and
//!   decides whether a fault-injected message succeeds, fails for redelivery or
//!   fails terminally.
//! - **Correlation Session Registry**: maps outstanding correlation keys to
//!   single-assignment reply slots with deadlines.
//! - **Reply Dispatcher**: routes inbound envelopes by type tag to handlers or to
//!   correlation resolution.
//! - **Acknowledge Discipline**: turns a dispatch outcome into an ack or nack on
//!   the transport.
//! - **Processing Lanes**: sequential consumers of one inbound queue, run in
//!   parallel with each other.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley_reactive::prelude::*;
//!
//! #[parley_message(tag = "Ping")]
//! struct Ping { text: String }
//!
//! #[parley_message(tag = "Pong")]
//! struct Pong { text: String }
//!
//! let transport = InMemoryTransport::new();
//! let mut runtime = ParleyApp::launch_async(Arc::new(transport)).await;
//!
//! let dispatcher = runtime.new_dispatcher();
//! dispatcher.on_request(|ping: Ping| async move { Ok(Pong { text: ping.text }) });
//! runtime.start_lanes("requests", &dispatcher, 1).await?;
//!
//! let requester = runtime.start_requester().await?;
//! let reply: Reply<Pong> = requester.send_and_reply("requests", &Ping { text: "hi".into() }).await?;
//! ```

extern crate self as parley_reactive;

/// Runtime components: tracker, registry, dispatcher, lanes, requester and configuration.
pub(crate) mod common;

/// Error types surfaced by the crate.
pub mod error;

/// Envelopes, the wire codec and fault specifications.
pub mod message;

/// Core traits: typed messages and the transport seam.
pub mod traits;

/// Sample message kinds and receiver handlers.
pub mod samples;

/// Tracing subscriber installation.
pub mod logging {
    pub use crate::common::logging::init_tracing;
}

/// Configuration loaded from `$XDG_CONFIG_HOME/parley/config.toml`.
pub mod config {
    pub use crate::common::config::{
        CodecConfig, LanesConfig, ParleyConfig, QueuesConfig, RetryConfig, TimeoutConfig,
        TracingConfig, TransportConfig,
    };
}

/// Transport implementations.
pub mod transport {
    pub use crate::common::transport::{InMemoryTransport, TransportStats};
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `parley-macro`)
/// *   [`parley_macro::parley_message`]: Attribute macro for declaring typed messages.
/// *   [`parley_macro::parley_main`]: Entry-point macro for Parley applications.
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html): For implementing [`Transport`](crate::traits::Transport).
/// *   `serde`, `tokio`: Used by code the macros expand to.
///
/// ## Core Types
/// *   [`crate::common::ParleyApp`]: Entry point for initializing a runtime.
/// *   [`crate::common::ParleyRuntime`]: Owns the transport, shared state and lanes.
/// *   [`crate::common::ReplyDispatcher`]: Routes inbound envelopes by type tag.
/// *   [`crate::common::Requester`]: Caller side of send-only and send-and-reply.
/// *   [`crate::common::DeliveryAttemptTracker`]: Per-attempt-key counters.
/// *   [`crate::common::CorrelationSessionRegistry`]: Outstanding reply slots.
/// *   [`crate::message::Envelope`]: Wire-level message wrapper.
/// *   [`crate::message::FaultSpecification`]: Declarative fault injection.
pub mod prelude {
    pub use parley_macro::*;

    pub use async_trait::async_trait;
    pub use serde;
    pub use tokio;

    pub use std::sync::Arc;

    pub use crate::common::{
        AcknowledgeDiscipline, AttemptVerdict, CorrelationSessionRegistry, DeliveryAttemptTracker,
        DispatchOutcome, InMemoryTransport, LaneGroup, LaneStats, ParleyApp, ParleyConfig,
        ParleyRuntime, ProcessingLane, Reply, ReplyDispatcher, ReplyOutcome, Requester,
        SessionHandle, SessionReply,
    };
    pub use crate::error::{
        ConfigError, CorrelationError, DecodeError, DispatchError, EncodeError, RequestError,
        TransportError,
    };
    pub use crate::message::{Envelope, EnvelopeRole, FailureReply, FaultSpecification, Format, WireMessage};
    pub use crate::traits::{Delivery, DeliveryHandle, ParleyMessage, Settlement, Subscription, Transport};
}
