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

use parley_macro::parley_message;

use crate::message::FaultSpecification;

/// Plain text, sent fire-and-forget.
#[parley_message(tag = "SimpleMessage")]
#[derive(PartialEq, Eq)]
pub struct SimpleMessage {
    pub text: String,
}

/// A person with a postal address, sent fire-and-forget.
#[parley_message(tag = "AdvancedMessage")]
#[derive(PartialEq, Eq)]
pub struct AdvancedMessage {
    pub name: String,
    pub surname: String,
    pub age: u8,
    pub email: String,
    pub description: String,
    pub address: AdvancedMessageAddress,
}

/// Postal address carried by [`AdvancedMessage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdvancedMessageAddress {
    pub street_name: String,
    pub building_number: u32,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Fire-and-forget message whose handling fails until its fault specification allows success.
#[parley_message(tag = "ExceptionMessage", fault = fault)]
#[derive(PartialEq, Eq)]
pub struct ExceptionMessage {
    #[serde(flatten)]
    pub fault: FaultSpecification,
}

/// Box dimensions; answered with a [`RectangularPrismResponse`].
#[parley_message(tag = "RectangularPrismRequest", fault = fault)]
#[derive(PartialEq)]
pub struct RectangularPrismRequest {
    pub edge_a: f64,
    pub edge_b: f64,
    pub edge_c: f64,
    #[serde(flatten)]
    pub fault: FaultSpecification,
}

#[parley_message(tag = "RectangularPrismResponse")]
#[derive(PartialEq)]
pub struct RectangularPrismResponse {
    pub surface_area: f64,
    pub volume: f64,
}

/// Makes the receiver sleep before answering, to simulate workload.
#[parley_message(tag = "ProcessTimeoutRequest")]
#[derive(PartialEq, Eq)]
pub struct ProcessTimeoutRequest {
    pub milliseconds_timeout: u64,
    pub process_name: String,
}

#[parley_message(tag = "ProcessTimeoutResponse")]
#[derive(PartialEq, Eq)]
pub struct ProcessTimeoutResponse {
    pub process_name: String,
}

impl RectangularPrismRequest {
    /// A request that succeeds on the first attempt.
    #[must_use]
    pub const fn new(edge_a: f64, edge_b: f64, edge_c: f64) -> Self {
        Self {
            edge_a,
            edge_b,
            edge_c,
            fault: FaultSpecification::succeed_on(1),
        }
    }

    /// Replaces the fault specification.
    #[must_use]
    pub fn with_fault(mut self, fault: FaultSpecification) -> Self {
        self.fault = fault;
        self
    }
}

impl RectangularPrismResponse {
    /// Surface area and volume of a box with the given edges.
    #[must_use]
    pub fn for_edges(edge_a: f64, edge_b: f64, edge_c: f64) -> Self {
        Self {
            surface_area: 2.0 * (edge_a * edge_b + edge_a * edge_c + edge_b * edge_c),
            volume: edge_a * edge_b * edge_c,
        }
    }
}

impl std::fmt::Display for RectangularPrismRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Edge A: {}, Edge B: {}, Edge C: {}", self.edge_a, self.edge_b, self.edge_c)
    }
}

impl std::fmt::Display for RectangularPrismResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Surface Area: {}, Volume: {}", self.surface_area, self.volume)
    }
}
