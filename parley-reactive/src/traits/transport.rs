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

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::WireMessage;

/// An at-least-once publish/subscribe transport.
///
/// Connection bootstrap and queue provisioning belong to the implementation.
/// Publishing must be safe to repeat: nothing in the core relies on
/// exactly-once publish.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Publishes `message` to `destination`.
    async fn publish(&self, destination: &str, message: WireMessage) -> Result<(), TransportError>;

    /// Starts consuming from `source`.
    ///
    /// Several subscriptions on the same source compete for its messages.
    async fn subscribe(&self, source: &str) -> Result<Box<dyn Subscription>, TransportError>;
}

/// A stream of deliveries from one source.
#[async_trait]
pub trait Subscription: Send {
    /// Waits for the next delivery. `None` once the subscription has ended.
    async fn next_delivery(&mut self) -> Option<Delivery>;
}

/// Settles one delivery on the transport.
#[async_trait]
pub trait DeliveryHandle: Send + Debug {
    /// Acknowledges or rejects the delivery. Consumes the handle.
    async fn settle(self: Box<Self>, settlement: Settlement) -> Result<(), TransportError>;
}

/// How a delivery is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Remove the message from the transport.
    Ack,
    /// Make the message available for redelivery.
    Nack,
}

/// One delivery handed to a processing lane.
#[derive(Debug)]
pub struct Delivery {
    /// Headers and body as received.
    pub message: WireMessage,
    /// 1 on first delivery, incremented by each redelivery.
    pub delivery_count: u32,
    /// Settles this delivery.
    pub handle: Box<dyn DeliveryHandle>,
}
