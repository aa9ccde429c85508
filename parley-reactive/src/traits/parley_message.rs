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

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::message::FaultSpecification;

/// A message type that can be carried in an [`Envelope`](crate::message::Envelope).
///
/// Usually implemented with `#[parley_message]`, which derives the serde traits
/// and fills in the type tag.
pub trait ParleyMessage: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    /// Wire type tag; routes the envelope on the receiving side.
    const TYPE_TAG: &'static str;

    /// Fault injection attached to this message, if any.
    fn fault(&self) -> Option<&FaultSpecification> {
        None
    }
}
