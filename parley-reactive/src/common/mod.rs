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

//! Runtime components of the Parley framework.
//!
//! *   [`DeliveryAttemptTracker`]: Counts handling attempts per attempt key.
//! *   [`CorrelationSessionRegistry`]: Pairs outstanding requests with their replies.
//! *   [`ReplyDispatcher`]: Routes inbound envelopes by type tag.
//! *   [`AcknowledgeDiscipline`]: Settles each delivery according to its dispatch outcome.
//! *   [`ProcessingLane`]: Sequential consumer of one subscription.
//! *   [`Requester`]: Caller side of send-only and send-and-reply.
//! *   [`ParleyApp`] / [`ParleyRuntime`]: Initialization and ownership of the above.

// --- Public Re-exports ---
pub use acknowledge::AcknowledgeDiscipline;
pub use attempt_tracker::{AttemptVerdict, DeliveryAttemptTracker};
pub use config::ParleyConfig;
pub use dispatcher::{DispatchOutcome, ReplyDispatcher};
pub use lane::{LaneGroup, LaneStats, ProcessingLane};
pub use parley_app::ParleyApp;
pub use requester::{Reply, Requester};
pub use runtime::ParleyRuntime;
pub use session_registry::{CorrelationSessionRegistry, ReplyOutcome, SessionHandle, SessionReply};
pub use transport::InMemoryTransport;

// --- Submodules ---

/// Settling deliveries from dispatch outcomes.
mod acknowledge;
/// Per-attempt-key counters and fault evaluation.
mod attempt_tracker;
/// Correlation sessions keyed by correlation key.
mod session_registry;
/// Type-tag routing of inbound envelopes.
mod dispatcher;
/// Sequential consumers of one subscription.
mod lane;
/// Caller-side publishing and reply waiting.
mod requester;
/// Defines the internal state (`ParleyInner`) of the runtime.
mod parley_inner;
/// Defines the `ParleyApp` entry point.
mod parley_app;
/// Defines the `ParleyRuntime` handle.
mod runtime;
/// Configuration loaded from XDG-compliant locations.
pub mod config;
/// Tracing subscriber installation.
pub mod logging;
/// Transport implementations.
pub mod transport;
