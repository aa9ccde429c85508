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

pub use codec::{
    WireMessage, ATTEMPT_KEY_HEADER, CORRELATION_KEY_HEADER, FORMAT_HEADER, REPLY_TO_HEADER,
    TYPE_HEADER,
};
pub use envelope::{Envelope, EnvelopeRole};
pub use fault::{FailureReply, FaultSpecification};
pub use format::Format;

/// Header layout and conversion between [`Envelope`] and [`WireMessage`].
mod codec;
/// The transport-independent envelope and its role.
mod envelope;
/// Fault specifications and the terminal failure reply.
mod fault;
/// Payload serialization formats.
mod format;
