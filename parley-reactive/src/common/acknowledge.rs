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

use std::sync::Arc;

use tracing::{instrument, trace, warn};

use crate::common::dispatcher::{DispatchOutcome, ReplyDispatcher};
use crate::error::{DispatchError, TransportError};
use crate::message::Envelope;
use crate::traits::{Delivery, DeliveryHandle, Settlement};

impl DispatchOutcome {
    /// The transport settlement this outcome calls for.
    #[must_use]
    pub const fn settlement(self) -> Settlement {
        match self {
            Self::Consumed | Self::Ignored => Settlement::Ack,
            Self::Rejected => Settlement::Nack,
        }
    }
}

/// Runs each delivery through the dispatcher and settles it on the transport.
///
/// Consumed and ignored messages are acknowledged; rejected ones are handed
/// back for redelivery. A reply that could not be published makes the whole
/// attempt a rejection, so the caller's request is retried instead of left to
/// time out.
#[derive(Debug, Clone)]
pub struct AcknowledgeDiscipline {
    dispatcher: Arc<ReplyDispatcher>,
}

impl AcknowledgeDiscipline {
    /// Wraps `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: Arc<ReplyDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// The wrapped dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<ReplyDispatcher> {
        &self.dispatcher
    }

    /// Collapses a dispatch result into an outcome; every error is a rejection.
    #[must_use]
    pub fn outcome_of(result: Result<DispatchOutcome, DispatchError>) -> DispatchOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, outcome = "rejected", "dispatch failed");
                DispatchOutcome::Rejected
            }
        }
    }

    /// Decodes, dispatches and settles one delivery.
    ///
    /// Returns the outcome that was settled. Only a failure to settle is an error.
    #[instrument(skip(self, delivery), fields(delivery_count = delivery.delivery_count))]
    pub async fn handle(&self, delivery: Delivery) -> Result<DispatchOutcome, TransportError> {
        let Delivery {
            message, handle, ..
        } = delivery;

        let outcome = match Envelope::from_wire(&message) {
            Ok(envelope) => Self::outcome_of(self.dispatcher.try_dispatch(envelope).await),
            Err(err) => Self::outcome_of(Err(err.into())),
        };

        Self::settle(handle, outcome).await?;
        Ok(outcome)
    }

    /// Applies `outcome` to the transport through `handle`.
    pub async fn settle(
        handle: Box<dyn DeliveryHandle>,
        outcome: DispatchOutcome,
    ) -> Result<Settlement, TransportError> {
        let settlement = outcome.settlement();
        handle.settle(settlement).await?;
        trace!(?outcome, ?settlement, "delivery settled");
        Ok(settlement)
    }
}
