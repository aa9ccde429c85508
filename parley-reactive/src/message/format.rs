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

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Serialization format for envelope payloads.
///
/// The format travels in the `parley-format` header so a receiver can decode
/// payloads from senders configured differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON format (UTF-8 encoded, human-readable).
    #[default]
    Json,
    /// `MessagePack` format (binary, compact).
    #[cfg(feature = "messagepack")]
    MessagePack,
}

impl Format {
    /// Header value for JSON.
    pub const JSON_NAME: &'static str = "json";
    /// Header value for `MessagePack`.
    pub const MESSAGEPACK_NAME: &'static str = "messagepack";

    /// Header value naming this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => Self::JSON_NAME,
            #[cfg(feature = "messagepack")]
            Self::MessagePack => Self::MESSAGEPACK_NAME,
        }
    }

    /// Parse a format from its header value.
    ///
    /// Returns `None` for unknown names and for `messagepack` when the
    /// `messagepack` feature is disabled.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::JSON_NAME => Some(Self::Json),
            #[cfg(feature = "messagepack")]
            Self::MESSAGEPACK_NAME => Some(Self::MessagePack),
            _ => None,
        }
    }

    /// Serialize a value using this format.
    pub(crate) fn serialize<T: Serialize>(self, value: &T) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
            #[cfg(feature = "messagepack")]
            Self::MessagePack => rmp_serde::to_vec_named(value)
                .map_err(|e| format!("MessagePack serialization failed: {e}")),
        }
    }

    /// Deserialize a value using this format.
    pub(crate) fn deserialize<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, String> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            #[cfg(feature = "messagepack")]
            Self::MessagePack => rmp_serde::from_slice(bytes)
                .map_err(|e| format!("MessagePack deserialization failed: {e}")),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        assert_eq!(Format::from_name(Format::Json.as_str()), Some(Format::Json));
        assert_eq!(Format::from_name("yaml"), None);
        #[cfg(feature = "messagepack")]
        assert_eq!(Format::from_name("messagepack"), Some(Format::MessagePack));
        #[cfg(not(feature = "messagepack"))]
        assert_eq!(Format::from_name("messagepack"), None);
    }

    #[test]
    fn json_rejects_garbage() {
        let result: Result<u32, _> = Format::Json.deserialize(b"{not json");
        assert!(result.is_err());
    }
}
