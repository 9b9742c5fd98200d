//! Request/response correlation by message id.
//!
//! The correlator is a passive table owned by the connection task. It never
//! touches the link and never sleeps: the owner feeds it inbound messages and
//! the current time, and sleeps until [`Correlator::next_deadline`].

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};
use tradelink_core::error::RequestError;

use crate::envelope::Envelope;

/// Ids remembered after expiry or cancellation so late responses are swallowed.
const EXPIRED_MEMORY: usize = 256;

/// Completion handle of one outstanding request.
pub type Responder = oneshot::Sender<Result<Envelope, RequestError>>;

struct PendingRequest {
    responder: Responder,
    deadline: Instant,
    timeout: Duration,
}

/// Outstanding requests keyed by correlation id.
#[derive(Default)]
pub struct Correlator {
    pending: HashMap<String, PendingRequest>,
    expired: VecDeque<String>,
}

impl Correlator {
    /// Creates an empty correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request.
    ///
    /// Returns false, after rejecting `responder` with `DuplicateId`, when
    /// `id` is already outstanding.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        responder: Responder,
        timeout: Duration,
        now: Instant,
    ) -> bool {
        let id = id.into();
        if self.pending.contains_key(&id) {
            let _ = responder.send(Err(RequestError::DuplicateId { id }));
            return false;
        }
        self.expired.retain(|old| old != &id);
        self.pending.insert(
            id,
            PendingRequest {
                responder,
                deadline: now + timeout,
                timeout,
            },
        );
        true
    }

    /// Returns true if `id` is outstanding.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Offers an inbound message.
    ///
    /// Returns true when the message answered an outstanding request, or was
    /// a late answer to one that already expired or was cancelled. Either way the caller must
    /// not route it further.
    pub fn on_message(&mut self, envelope: &Envelope) -> bool {
        let Some(id) = envelope.id.as_deref() else {
            return false;
        };

        if let Some(entry) = self.pending.remove(id) {
            let outcome = if envelope.is_error() {
                Err(RequestError::Remote {
                    id: id.to_string(),
                    message: envelope
                        .error_message()
                        .unwrap_or_else(|| envelope.message_type.clone()),
                })
            } else {
                Ok(envelope.clone())
            };
            if entry.responder.send(outcome).is_err() {
                debug!(request_id = %id, "requester went away before the response arrived");
            }
            return true;
        }

        if self.expired.iter().any(|old| old == id) {
            debug!(request_id = %id, "ignoring late response");
            return true;
        }

        false
    }

    /// Rejects every request whose deadline is at or before `now`.
    pub fn expire_due(&mut self, now: Instant) -> usize {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &due {
            if let Some(entry) = self.pending.remove(id) {
                let timeout_ms = u64::try_from(entry.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(request_id = %id, timeout_ms, "request timed out");
                let _ = entry.responder.send(Err(RequestError::Timeout {
                    id: id.clone(),
                    timeout_ms,
                }));
                self.remember_expired(id.clone());
            }
        }
        due.len()
    }

    /// Rejects one request, e.g. when its frame could not be sent.
    pub fn reject(&mut self, id: &str, error: RequestError) -> bool {
        match self.pending.remove(id) {
            Some(entry) => {
                let _ = entry.responder.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Earliest deadline among outstanding requests.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|entry| entry.deadline).min()
    }

    /// Rejects every outstanding request with `Cancelled`.
    pub fn cancel_all(&mut self, reason: &str) -> usize {
        let drained: Vec<(String, PendingRequest)> = self.pending.drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            let _ = entry.responder.send(Err(RequestError::Cancelled {
                id: id.clone(),
                reason: reason.to_string(),
            }));
            self.remember_expired(id);
        }
        if count > 0 {
            debug!(count, reason, "cancelled outstanding requests");
        }
        count
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn remember_expired(&mut self, id: String) {
        if self.expired.len() == EXPIRED_MEMORY {
            self.expired.pop_front();
        }
        self.expired.push_back(id);
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending.len())
            .field("expired", &self.expired.len())
            .finish()
    }
}
