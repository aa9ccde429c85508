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

use dashmap::DashMap;
use tracing::{instrument, trace};

use crate::common::config::RetryConfig;
use crate::message::FaultSpecification;

/// Result of evaluating a fault specification against an attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptVerdict {
    /// Run the business handler.
    Succeed,
    /// Fail this attempt and let the transport redeliver.
    FailRetryable,
    /// Stop retrying and report a terminal failure.
    FailExhausted,
}

/// Counts handling attempts per attempt key and decides the fate of
/// fault-injected messages.
///
/// Two thresholds are involved: the message's own
/// [`FaultSpecification::succeed_on_attempt`] and the receiver's
/// `max_attempts` ceiling. A message that never succeeds still stops at the
/// ceiling.
///
/// Counters for different keys live in separate map shards; observing one
/// key never waits on another.
#[derive(Debug)]
pub struct DeliveryAttemptTracker {
    attempts: DashMap<String, u32>,
    max_attempts: u32,
}

impl Default for DeliveryAttemptTracker {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl DeliveryAttemptTracker {
    /// Creates a tracker with the given ceiling. A ceiling of 0 is treated as 1.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Creates a tracker from the `[retry]` configuration section.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts)
    }

    /// The attempt number at which evaluation becomes terminal.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Records one handling attempt of `attempt_key` and returns its number.
    ///
    /// The first observation of a key returns 1; each later one returns the
    /// previous value plus one.
    #[instrument(skip(self), level = "trace")]
    pub fn observe_attempt(&self, attempt_key: &str) -> u32 {
        let attempt = {
            let mut count = self.attempts.entry(attempt_key.to_string()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };
        trace!(attempt, "observed delivery attempt");
        attempt
    }

    /// Decides what attempt number `attempt` of a message carrying `fault` should do.
    #[must_use]
    pub const fn evaluate(&self, fault: &FaultSpecification, attempt: u32) -> AttemptVerdict {
        if fault.succeed_on_attempt >= 1 && attempt >= fault.succeed_on_attempt.unsigned_abs() {
            AttemptVerdict::Succeed
        } else if attempt >= self.max_attempts {
            AttemptVerdict::FailExhausted
        } else {
            AttemptVerdict::FailRetryable
        }
    }

    /// Attempts observed so far for `attempt_key`.
    #[must_use]
    pub fn attempts(&self, attempt_key: &str) -> Option<u32> {
        self.attempts.get(attempt_key).map(|count| *count)
    }

    /// Drops the record for `attempt_key`, returning its last count.
    ///
    /// The dispatcher calls this once a message is consumed, or when its
    /// handler fails on an attempt at or past [`max_attempts`](Self::max_attempts).
    /// A message the transport dead-letters before reaching that attempt keeps
    /// its record until forgotten here.
    pub fn forget(&self, attempt_key: &str) -> Option<u32> {
        self.attempts.remove(attempt_key).map(|(_, count)| count)
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Whether no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}
