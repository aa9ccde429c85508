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

use std::collections::BTreeMap;

use crate::error::DecodeError;
use crate::message::{Envelope, Format};

/// Header carrying the envelope's type tag.
pub const TYPE_HEADER: &str = "parley-type";

/// Header carrying the correlation key.
pub const CORRELATION_KEY_HEADER: &str = "parley-correlation-key";

/// Header carrying the reply destination.
pub const REPLY_TO_HEADER: &str = "parley-reply-to";

/// Header carrying the attempt key.
pub const ATTEMPT_KEY_HEADER: &str = "parley-attempt-key";

/// Header naming the payload [`Format`]. Absent means JSON.
pub const FORMAT_HEADER: &str = "parley-format";

/// What a transport actually carries: string headers plus an opaque body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireMessage {
    /// Transport headers.
    pub headers: BTreeMap<String, String>,
    /// Payload bytes.
    pub body: Vec<u8>,
}

impl WireMessage {
    /// Creates a wire message with no headers.
    #[must_use]
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header value, treating empty values as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl Envelope {
    /// Lays the envelope out as headers plus body.
    #[must_use]
    pub fn to_wire(&self) -> WireMessage {
        let mut wire = WireMessage::new(self.payload.clone())
            .with_header(TYPE_HEADER, self.type_tag.as_str())
            .with_header(FORMAT_HEADER, self.format.as_str());
        if let Some(key) = &self.correlation_key {
            wire = wire.with_header(CORRELATION_KEY_HEADER, key.as_str());
        }
        if let Some(reply_to) = &self.reply_to {
            wire = wire.with_header(REPLY_TO_HEADER, reply_to.as_str());
        }
        if let Some(attempt_key) = &self.attempt_key {
            wire = wire.with_header(ATTEMPT_KEY_HEADER, attempt_key.as_str());
        }
        wire
    }

    /// Reads an envelope back from headers plus body.
    ///
    /// The payload is not deserialized here; see [`Envelope::decode_payload`].
    pub fn from_wire(wire: &WireMessage) -> Result<Self, DecodeError> {
        let type_tag = wire
            .header(TYPE_HEADER)
            .ok_or(DecodeError::MissingHeader(TYPE_HEADER))?;

        let format = match wire.header(FORMAT_HEADER) {
            None => Format::default(),
            Some(name) => {
                Format::from_name(name).ok_or_else(|| DecodeError::UnsupportedFormat(name.to_string()))?
            }
        };

        let correlation_key = wire.header(CORRELATION_KEY_HEADER).map(str::to_string);
        let reply_to = wire.header(REPLY_TO_HEADER).map(str::to_string);
        if let (None, Some(reply_to)) = (&correlation_key, &reply_to) {
            return Err(DecodeError::ReplyToWithoutCorrelation {
                reply_to: reply_to.clone(),
            });
        }

        Ok(Self {
            type_tag: type_tag.to_string(),
            correlation_key,
            reply_to,
            attempt_key: wire.header(ATTEMPT_KEY_HEADER).map(str::to_string),
            format,
            payload: wire.body.clone(),
        })
    }
}
