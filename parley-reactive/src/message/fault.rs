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

use serde::{Deserialize, Serialize};

use crate::traits::ParleyMessage;

/// Declarative fault injection carried inside a request payload.
///
/// `succeed_on_attempt` values:
/// - `<= 0`: never succeeds
/// - `1`: succeeds on the first attempt (no fault)
/// - `N > 1`: fails on attempts `1..N`, succeeds from attempt `N` onward
///
/// Messages embed it with `#[serde(flatten)]` and expose it through
/// [`ParleyMessage::fault`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultSpecification {
    /// Attempt number from which handling succeeds.
    pub succeed_on_attempt: i32,
    /// Text surfaced to the caller when the failure becomes terminal.
    #[serde(default)]
    pub failure_detail: String,
}

impl Default for FaultSpecification {
    fn default() -> Self {
        Self::succeed_on(1)
    }
}

impl FaultSpecification {
    /// Succeeds from attempt `attempt` onward.
    #[must_use]
    pub const fn succeed_on(attempt: i32) -> Self {
        Self {
            succeed_on_attempt: attempt,
            failure_detail: String::new(),
        }
    }

    /// Never succeeds; only the attempt ceiling ends the retries.
    #[must_use]
    pub const fn never_succeeds() -> Self {
        Self::succeed_on(0)
    }

    /// Sets the text surfaced on terminal failure.
    #[must_use]
    pub fn with_failure_detail(mut self, detail: impl Into<String>) -> Self {
        self.failure_detail = detail.into();
        self
    }

    /// Whether this specification can ever succeed.
    #[must_use]
    pub const fn can_succeed(&self) -> bool {
        self.succeed_on_attempt >= 1
    }
}

/// Terminal failure reply published when a request exhausts its attempts.
///
/// Travels under the `ExceptionResponse` type tag and resolves the caller's
/// session with a failed outcome instead of leaving it to time out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReply {
    /// Human-readable failure text.
    pub text: String,
}

impl FailureReply {
    /// Creates a failure reply with the given text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The default text used when no failure detail was supplied.
    #[must_use]
    pub fn no_response_for(response_tag: &str) -> Self {
        Self::new(format!("No response found for: {response_tag}!"))
    }

    /// Failure reply for `fault`, falling back to the default text for `response_tag`.
    #[must_use]
    pub fn for_fault(fault: &FaultSpecification, response_tag: &str) -> Self {
        if fault.failure_detail.is_empty() {
            Self::no_response_for(response_tag)
        } else {
            Self::new(fault.failure_detail.clone())
        }
    }
}

impl ParleyMessage for FailureReply {
    const TYPE_TAG: &'static str = "ExceptionResponse";
}
