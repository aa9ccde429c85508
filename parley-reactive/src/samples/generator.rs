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

use rand::rngs::ThreadRng;
use rand::Rng;

use crate::samples::{AdvancedMessage, AdvancedMessageAddress, ProcessTimeoutRequest, SimpleMessage};

const RANDOM_CHARACTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

const NAMES: &[&str] = &["Ada", "Grace", "Linus", "Barbara", "Ken", "Margaret", "Dennis", "Frances"];
const SURNAMES: &[&str] = &["Lovelace", "Hopper", "Torvalds", "Liskov", "Thompson", "Hamilton", "Ritchie", "Allen"];
const STREETS: &[&str] = &["Main Street", "Station Road", "High Street", "Church Lane", "Mill Road"];
const CITIES: &[&str] = &["Krakow", "Lisbon", "Oslo", "Vienna", "Dublin", "Tallinn"];
const COUNTRIES: &[&str] = &["Poland", "Portugal", "Norway", "Austria", "Ireland", "Estonia"];

/// Produces random sample messages for send-only and concurrency demos.
#[derive(Debug)]
pub struct RandomMessageGenerator<R = ThreadRng> {
    rng: R,
}

impl Default for RandomMessageGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomMessageGenerator<ThreadRng> {
    /// A generator backed by the thread-local RNG.
    #[must_use]
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl<R: Rng> RandomMessageGenerator<R> {
    /// A generator backed by `rng`, e.g. a seeded one for reproducible output.
    pub const fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Random alphanumeric text (with spaces) of `min_length..=max_length` characters.
    pub fn random_text(&mut self, min_length: usize, max_length: usize) -> String {
        let length = self.rng.random_range(min_length..=max_length.max(min_length));
        (0..length)
            .map(|_| char::from(RANDOM_CHARACTERS[self.rng.random_range(0..RANDOM_CHARACTERS.len())]))
            .collect()
    }

    /// `count` simple messages with random text.
    pub fn simple_messages(&mut self, count: usize, min_length: usize, max_length: usize) -> Vec<SimpleMessage> {
        (0..count)
            .map(|_| SimpleMessage {
                text: self.random_text(min_length, max_length),
            })
            .collect()
    }

    /// `count` advanced messages with random people and addresses.
    pub fn advanced_messages(&mut self, count: usize) -> Vec<AdvancedMessage> {
        (0..count).map(|_| self.advanced_message()).collect()
    }

    /// `count` delay-simulation requests sleeping `min_ms..=max_ms` each,
    /// named `client-1`, `client-2`, ...
    pub fn process_timeout_requests(&mut self, count: usize, min_ms: u64, max_ms: u64) -> Vec<ProcessTimeoutRequest> {
        (1..=count)
            .map(|index| ProcessTimeoutRequest {
                milliseconds_timeout: self.rng.random_range(min_ms..=max_ms.max(min_ms)),
                process_name: format!("client-{index}"),
            })
            .collect()
    }

    fn advanced_message(&mut self) -> AdvancedMessage {
        let name = self.pick(NAMES);
        let surname = self.pick(SURNAMES);
        AdvancedMessage {
            email: format!("{}.{}@example.com", name.to_lowercase(), surname.to_lowercase()),
            name: name.to_string(),
            surname: surname.to_string(),
            age: self.rng.random_range(1..=100),
            description: self.random_text(1, 256),
            address: AdvancedMessageAddress {
                street_name: self.pick(STREETS).to_string(),
                building_number: self.rng.random_range(1..=300),
                city: self.pick(CITIES).to_string(),
                postal_code: format!("{:05}", self.rng.random_range(0..100_000)),
                country: self.pick(COUNTRIES).to_string(),
            },
        }
    }

    fn pick(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.random_range(0..choices.len())]
    }
}
