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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::common::config::TransportConfig;
use crate::error::TransportError;
use crate::message::WireMessage;
use crate::traits::{Delivery, DeliveryHandle, Settlement, Subscription, Transport};

/// Counters for an [`InMemoryTransport`].
#[derive(Debug, Default)]
pub struct TransportStats {
    /// Messages accepted by `publish`.
    pub published: AtomicUsize,
    /// Deliveries acknowledged.
    pub acked: AtomicUsize,
    /// Deliveries rejected and queued again.
    pub requeued: AtomicUsize,
    /// Deliveries rejected past the redelivery ceiling.
    pub dead_lettered: AtomicUsize,
}

impl TransportStats {
    /// Get the number of messages published.
    #[must_use]
    pub fn published(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }

    /// Get the number of deliveries acknowledged.
    #[must_use]
    pub fn acked(&self) -> usize {
        self.acked.load(Ordering::Relaxed)
    }

    /// Get the number of deliveries requeued.
    #[must_use]
    pub fn requeued(&self) -> usize {
        self.requeued.load(Ordering::Relaxed)
    }

    /// Get the number of deliveries dead-lettered.
    #[must_use]
    pub fn dead_lettered(&self) -> usize {
        self.dead_lettered.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Queued {
    message: WireMessage,
    delivery_count: u32,
}

#[derive(Debug)]
struct MemoryQueue {
    name: String,
    sender: mpsc::UnboundedSender<Queued>,
    receiver: Mutex<mpsc::UnboundedReceiver<Queued>>,
}

#[derive(Debug)]
struct Inner {
    queues: DashMap<String, Arc<MemoryQueue>>,
    dead_letters: DashMap<String, Vec<WireMessage>>,
    unavailable: DashSet<String>,
    max_redeliveries: u32,
    stats: TransportStats,
    closed: CancellationToken,
}

impl Inner {
    fn queue(&self, name: &str) -> Arc<MemoryQueue> {
        if let Some(queue) = self.queues.get(name) {
            return Arc::clone(queue.value());
        }
        let queue = self
            .queues
            .entry(name.to_string())
            .or_insert_with(|| {
                trace!(queue = name, "queue created");
                let (sender, receiver) = mpsc::unbounded_channel();
                Arc::new(MemoryQueue {
                    name: name.to_string(),
                    sender,
                    receiver: Mutex::new(receiver),
                })
            });
        Arc::clone(queue.value())
    }

    fn enqueue(&self, queue: &MemoryQueue, queued: Queued) -> Result<(), TransportError> {
        queue.sender.send(queued).map_err(|_| TransportError::Closed)
    }
}

/// An at-least-once transport backed by process-local queues.
///
/// Queues are created on first use. Every subscription on a queue competes
/// for its messages. A rejected delivery goes back to the end of its queue
/// with its delivery count incremented; once a message has been redelivered
/// `max_redeliveries` times, the next rejection moves it to the queue's
/// dead-letter list instead.
///
/// Clones share the same queues.
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    inner: Arc<Inner>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

impl InMemoryTransport {
    /// Creates a transport with the default redelivery ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport allowing `max_redeliveries` redeliveries per message.
    #[must_use]
    pub fn with_max_redeliveries(max_redeliveries: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                queues: DashMap::new(),
                dead_letters: DashMap::new(),
                unavailable: DashSet::new(),
                max_redeliveries,
                stats: TransportStats::default(),
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Creates a transport from the `[transport]` configuration section.
    #[must_use]
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::with_max_redeliveries(config.max_redeliveries)
    }

    /// Transport counters.
    #[must_use]
    pub fn stats(&self) -> &TransportStats {
        &self.inner.stats
    }

    /// Makes publishing to `destination` fail (or succeed again).
    pub fn set_unavailable(&self, destination: &str, unavailable: bool) {
        if unavailable {
            self.inner.unavailable.insert(destination.to_string());
        } else {
            self.inner.unavailable.remove(destination);
        }
        debug!(destination, unavailable, "destination availability changed");
    }

    /// Messages dead-lettered from `queue`.
    #[must_use]
    pub fn dead_letters(&self, queue: &str) -> Vec<WireMessage> {
        self.inner
            .dead_letters
            .get(queue)
            .map(|letters| letters.value().clone())
            .unwrap_or_default()
    }

    /// Ends every subscription and refuses further publishing.
    pub fn close(&self) {
        self.inner.closed.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    #[instrument(skip(self, message), level = "trace")]
    async fn publish(&self, destination: &str, message: WireMessage) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.inner.unavailable.contains(destination) {
            warn!(destination, "publish to unavailable destination");
            return Err(TransportError::Unavailable(destination.to_string()));
        }
        let queue = self.inner.queue(destination);
        self.inner.enqueue(
            &queue,
            Queued {
                message,
                delivery_count: 1,
            },
        )?;
        self.inner.stats.published.fetch_add(1, Ordering::Relaxed);
        trace!(destination, "message published");
        Ok(())
    }

    async fn subscribe(&self, source: &str) -> Result<Box<dyn Subscription>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(Box::new(MemorySubscription {
            queue: self.inner.queue(source),
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemorySubscription {
    queue: Arc<MemoryQueue>,
    inner: Arc<Inner>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        let queued = tokio::select! {
            biased;
            () = self.inner.closed.cancelled() => None,
            queued = async { self.queue.receiver.lock().await.recv().await } => queued,
        };
        let queued = queued?;
        trace!(queue = %self.queue.name, delivery_count = queued.delivery_count, "delivering");
        Some(Delivery {
            message: queued.message.clone(),
            delivery_count: queued.delivery_count,
            handle: Box::new(MemoryDeliveryHandle {
                queue: Arc::clone(&self.queue),
                inner: Arc::clone(&self.inner),
                queued,
            }),
        })
    }
}

#[derive(Debug)]
struct MemoryDeliveryHandle {
    queue: Arc<MemoryQueue>,
    inner: Arc<Inner>,
    queued: Queued,
}

#[async_trait]
impl DeliveryHandle for MemoryDeliveryHandle {
    async fn settle(self: Box<Self>, settlement: Settlement) -> Result<(), TransportError> {
        let Self {
            queue,
            inner,
            queued,
        } = *self;
        match settlement {
            Settlement::Ack => {
                inner.stats.acked.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Settlement::Nack if queued.delivery_count > inner.max_redeliveries => {
                warn!(
                    queue = %queue.name,
                    delivery_count = queued.delivery_count,
                    "redelivery ceiling reached; dead-lettering"
                );
                inner
                    .dead_letters
                    .entry(queue.name.clone())
                    .or_default()
                    .push(queued.message);
                inner.stats.dead_lettered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Settlement::Nack => {
                inner.enqueue(
                    &queue,
                    Queued {
                        message: queued.message,
                        delivery_count: queued.delivery_count + 1,
                    },
                )?;
                inner.stats.requeued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> WireMessage {
        WireMessage::new(body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn nack_redelivers_with_incremented_count() -> anyhow::Result<()> {
        let transport = InMemoryTransport::with_max_redeliveries(5);
        let mut subscription = transport.subscribe("q").await?;
        transport.publish("q", message("a")).await?;

        let first = subscription.next_delivery().await.expect("first delivery");
        assert_eq!(first.delivery_count, 1);
        first.handle.settle(Settlement::Nack).await?;

        let second = subscription.next_delivery().await.expect("redelivery");
        assert_eq!(second.delivery_count, 2);
        assert_eq!(second.message.body, b"a");
        second.handle.settle(Settlement::Ack).await?;

        assert_eq!(transport.stats().requeued(), 1);
        assert_eq!(transport.stats().acked(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn exhausted_redeliveries_are_dead_lettered() -> anyhow::Result<()> {
        let transport = InMemoryTransport::with_max_redeliveries(2);
        let mut subscription = transport.subscribe("q").await?;
        transport.publish("q", message("poison")).await?;

        for expected in 1..=3 {
            let delivery = subscription.next_delivery().await.expect("delivery");
            assert_eq!(delivery.delivery_count, expected);
            delivery.handle.settle(Settlement::Nack).await?;
        }

        assert_eq!(transport.dead_letters("q"), vec![message("poison")]);
        assert_eq!(transport.stats().dead_lettered(), 1);
        assert_eq!(transport.stats().requeued(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_destination_refuses_publish() -> anyhow::Result<()> {
        let transport = InMemoryTransport::new();
        transport.set_unavailable("q", true);
        assert_eq!(
            transport.publish("q", message("a")).await,
            Err(TransportError::Unavailable("q".to_string()))
        );
        transport.set_unavailable("q", false);
        transport.publish("q", message("a")).await?;
        assert_eq!(transport.stats().published(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn close_ends_subscriptions() -> anyhow::Result<()> {
        let transport = InMemoryTransport::new();
        let mut subscription = transport.subscribe("q").await?;
        transport.close();
        assert!(subscription.next_delivery().await.is_none());
        assert_eq!(
            transport.publish("q", message("a")).await,
            Err(TransportError::Closed)
        );
        Ok(())
    }
}
