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

//! Error types for the Parley crates.
//!
//! Decode and publish failures on the receiving side are converted into a
//! [`DispatchOutcome`](crate::common::DispatchOutcome) at the lane boundary and
//! never escape a processing lane. [`CorrelationError::DuplicateKey`] is the one
//! condition surfaced loudly to callers.

use std::path::PathBuf;

use thiserror::Error;

/// A wire message or payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A required header is absent or empty.
    #[error("missing required header `{0}`")]
    MissingHeader(&'static str),

    /// A reply destination was present without a correlation key.
    #[error("reply destination `{reply_to}` present without a correlation key")]
    ReplyToWithoutCorrelation {
        /// The offending reply destination.
        reply_to: String,
    },

    /// A request kind arrived with a correlation key but nowhere to reply.
    #[error("`{type_tag}` request with correlation key `{correlation_key}` has no reply destination")]
    CorrelationWithoutReplyTo {
        /// Type tag of the request.
        type_tag: String,
        /// The correlation key it carried.
        correlation_key: String,
    },

    /// The format header names a format this build cannot decode.
    #[error("unsupported payload format `{0}`")]
    UnsupportedFormat(String),

    /// The payload bytes do not decode into the expected type.
    #[error("malformed `{type_tag}` payload: {reason}")]
    Payload {
        /// Type tag of the envelope being decoded.
        type_tag: String,
        /// Underlying serializer message.
        reason: String,
    },
}

/// A typed message could not be serialized into a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to encode `{type_tag}` payload: {reason}")]
pub struct EncodeError {
    /// Type tag of the message being encoded.
    pub type_tag: String,
    /// Underlying serializer message.
    pub reason: String,
}

/// Misuse of the correlation session registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// A session is already open for this correlation key.
    #[error("correlation key `{0}` is already open")]
    DuplicateKey(String),
}

/// Failures reported by a [`Transport`](crate::traits::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The destination cannot currently accept messages.
    #[error("destination `{0}` is unavailable")]
    Unavailable(String),

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,

    /// Any other transport-level failure.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Why the dispatcher could not complete handling of an envelope.
///
/// Every variant is settled as a rejection.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The envelope or its payload is malformed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The handler's reply could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Publishing a reply failed.
    #[error("failed to publish reply to `{destination}`: {source}")]
    Publish {
        /// Reply destination.
        destination: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// The business handler returned an error.
    #[error("handler for `{type_tag}` failed: {source}")]
    Handler {
        /// Type tag routed to the failing handler.
        type_tag: String,
        /// Error returned by the handler.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// A fault-injected envelope carries neither an attempt key nor a correlation key.
    #[error("fault-injected `{0}` carries no attempt or correlation key")]
    MissingIdentity(String),

    /// No route is registered for the type tag.
    #[error("no route registered for `{0}`")]
    UnknownType(String),
}

impl DispatchError {
    pub(crate) fn handler(type_tag: &str, source: anyhow::Error) -> Self {
        Self::Handler {
            type_tag: type_tag.to_string(),
            source: source.into(),
        }
    }
}

/// Failures on the caller side of a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The generated correlation key collided with an open session.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// The request could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The reply arrived but does not decode into the expected response type.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Publishing the request failed; no session remains open.
    #[error("failed to publish request to `{destination}`: {source}")]
    Publish {
        /// Request destination.
        destination: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
}

/// Configuration could not be loaded from an explicit path.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration TOML.
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// TOML failure.
        #[source]
        source: toml::de::Error,
    },
}
