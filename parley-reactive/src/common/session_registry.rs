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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use derive_new::new;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, trace};

use crate::error::CorrelationError;
use crate::message::{Envelope, FailureReply};

/// What a resolver hands to a waiting caller.
#[derive(Debug)]
pub enum SessionReply {
    /// The matching reply envelope.
    Delivered(Envelope),
    /// The receiver gave up and said so.
    Exhausted(FailureReply),
}

/// How a wait on a session ended. Exactly one of these is produced per session.
#[derive(Debug)]
pub enum ReplyOutcome {
    /// The matching reply envelope.
    Delivered(Envelope),
    /// The receiver reported a terminal failure.
    Exhausted(FailureReply),
    /// The deadline elapsed first.
    TimedOut,
}

impl From<SessionReply> for ReplyOutcome {
    fn from(reply: SessionReply) -> Self {
        match reply {
            SessionReply::Delivered(envelope) => Self::Delivered(envelope),
            SessionReply::Exhausted(failure) => Self::Exhausted(failure),
        }
    }
}

#[derive(new, Debug)]
struct PendingSession {
    id: u64,
    deadline: Instant,
    slot: oneshot::Sender<SessionReply>,
}

/// Maps outstanding correlation keys to single-assignment reply slots.
///
/// Each key lives in its own map entry; nothing is locked while a caller
/// waits, so resolving one key never blocks a wait or abandonment on another.
///
/// ```rust,ignore
/// let registry = Arc::new(CorrelationSessionRegistry::new());
/// let handle = registry.open("req_1", Instant::now() + Duration::from_millis(200))?;
/// // ... publish the request ...
/// match handle.wait().await {
///     ReplyOutcome::Delivered(envelope) => { /* decode it */ }
///     ReplyOutcome::Exhausted(failure) => { /* receiver gave up */ }
///     ReplyOutcome::TimedOut => { /* no response */ }
/// }
/// ```
#[derive(Debug, Default)]
pub struct CorrelationSessionRegistry {
    sessions: DashMap<String, PendingSession>,
    next_id: AtomicU64,
}

impl CorrelationSessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `key` that expires at `deadline`.
    ///
    /// Fails with [`CorrelationError::DuplicateKey`] while another session for
    /// `key` is still open.
    pub fn open(
        self: &Arc<Self>,
        key: impl Into<String>,
        deadline: Instant,
    ) -> Result<SessionHandle, CorrelationError> {
        let key = key.into();
        match self.sessions.entry(key.clone()) {
            Entry::Occupied(_) => {
                error!(correlation_key = %key, "correlation key reused while still open");
                Err(CorrelationError::DuplicateKey(key))
            }
            Entry::Vacant(vacant) => {
                let (slot, receiver) = oneshot::channel();
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                vacant.insert(PendingSession::new(id, deadline, slot));
                trace!(correlation_key = %key, "session opened");
                Ok(SessionHandle {
                    key,
                    id,
                    deadline,
                    receiver: Some(receiver),
                    registry: Arc::clone(self),
                })
            }
        }
    }

    /// Hands `reply` to the session waiting on `key`.
    ///
    /// Returns `false` when no session is open for `key`, for instance because
    /// its caller already timed out. At most one call per session returns `true`.
    pub fn resolve(&self, key: &str, reply: SessionReply) -> bool {
        self.try_resolve(key, reply).is_ok()
    }

    /// Like [`resolve`](Self::resolve), but gives the reply back when nobody takes it.
    pub fn try_resolve(&self, key: &str, reply: SessionReply) -> Result<(), SessionReply> {
        match self.sessions.remove(key) {
            Some((_, session)) => {
                let delivered = session.slot.send(reply);
                if delivered.is_ok() {
                    trace!(correlation_key = %key, "session resolved");
                }
                delivered
            }
            None => {
                debug!(correlation_key = %key, "no open session for reply");
                Err(reply)
            }
        }
    }

    /// Removes the session for `key` without resolving it.
    ///
    /// Its caller observes [`ReplyOutcome::TimedOut`].
    pub fn abandon(&self, key: &str) -> bool {
        let removed = self.sessions.remove(key).is_some();
        if removed {
            debug!(correlation_key = %key, "session abandoned");
        }
        removed
    }

    /// Whether a session is open for `key`.
    #[must_use]
    pub fn is_open(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    /// Deadline of the session open for `key`.
    #[must_use]
    pub fn deadline(&self, key: &str) -> Option<Instant> {
        self.sessions.get(key).map(|session| session.deadline)
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // Only removes the entry this handle opened; a later session reusing the
    // key after abandonment is left alone.
    fn release(&self, key: &str, id: u64) -> bool {
        self.sessions.remove_if(key, |_, session| session.id == id).is_some()
    }
}

/// Caller-side handle to one open session.
///
/// Dropping the handle without waiting abandons the session.
#[derive(Debug)]
pub struct SessionHandle {
    key: String,
    id: u64,
    deadline: Instant,
    receiver: Option<oneshot::Receiver<SessionReply>>,
    registry: Arc<CorrelationSessionRegistry>,
}

impl SessionHandle {
    /// Correlation key of this session.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// When this session expires.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Waits until the session is resolved or its deadline elapses.
    ///
    /// On expiry the session is abandoned. A reply that won the race against
    /// the abandonment is still returned.
    pub async fn wait(mut self) -> ReplyOutcome {
        let Some(mut receiver) = self.receiver.take() else {
            return ReplyOutcome::TimedOut;
        };

        match tokio::time::timeout_at(self.deadline, &mut receiver).await {
            Ok(Ok(reply)) => reply.into(),
            Ok(Err(_)) => {
                debug!(correlation_key = %self.key, "session closed without a reply");
                ReplyOutcome::TimedOut
            }
            Err(_) => {
                self.registry.release(&self.key, self.id);
                match receiver.try_recv() {
                    Ok(reply) => reply.into(),
                    Err(_) => {
                        debug!(correlation_key = %self.key, "session timed out");
                        ReplyOutcome::TimedOut
                    }
                }
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.registry.release(&self.key, self.id) {
            trace!(correlation_key = %self.key, "session released on drop");
        }
    }
}
