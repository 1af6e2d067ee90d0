//! Confirm-then-delete with a single level of undo.
//!
//! ```text
//! Idle -> ConfirmPending -> Deleting -> Deleted -> Idle
//!              |               |
//!              +-> Idle        +-> Idle (delete failed)
//! ```
//!
//! The record is converted to a create payload before the delete request is
//! issued, since the server cannot give it back afterwards. Only the most
//! recent successful delete can be undone.

use crate::events::{EventCreatePayload, EventItem};

/// Key under which clients persist the pending undo payload.
pub const UNDO_STORAGE_KEY: &str = "ledger.events.undo";

#[derive(Debug, Clone, PartialEq)]
pub enum DeletePhase {
    Idle,
    ConfirmPending(EventItem),
    Deleting { id: i64, payload: EventCreatePayload },
    /// The last delete succeeded and its payload is available for undo.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("no delete is awaiting confirmation")]
    NothingPending,
    #[error("a delete request is already in flight")]
    Busy,
    #[error("no delete request is in flight")]
    NotDeleting,
}

#[derive(Debug, Clone)]
pub struct DeleteFlow {
    phase: DeletePhase,
    undo: Option<EventCreatePayload>,
}

impl Default for DeleteFlow {
    fn default() -> Self {
        Self {
            phase: DeletePhase::Idle,
            undo: None,
        }
    }
}

impl DeleteFlow {
    /// Start from a payload left over by an earlier session.
    pub fn with_undo(payload: Option<EventCreatePayload>) -> Self {
        let phase = if payload.is_some() {
            DeletePhase::Deleted
        } else {
            DeletePhase::Idle
        };
        Self { phase, undo: payload }
    }

    pub fn phase(&self) -> &DeletePhase {
        &self.phase
    }

    pub fn undo_payload(&self) -> Option<&EventCreatePayload> {
        self.undo.as_ref()
    }

    /// Ask for confirmation before deleting `item`. Replaces any confirmation
    /// that was still pending.
    pub fn request(&mut self, item: EventItem) -> Result<(), FlowError> {
        if matches!(self.phase, DeletePhase::Deleting { .. }) {
            return Err(FlowError::Busy);
        }
        self.phase = DeletePhase::ConfirmPending(item);
        Ok(())
    }

    /// User declined; nothing happens.
    pub fn decline(&mut self) -> Result<(), FlowError> {
        match self.phase {
            DeletePhase::ConfirmPending(_) => {
                self.phase = self.resting_phase();
                Ok(())
            }
            _ => Err(FlowError::NothingPending),
        }
    }

    /// User confirmed. Snapshots the record and returns the id to delete.
    pub fn confirm(&mut self) -> Result<i64, FlowError> {
        let DeletePhase::ConfirmPending(item) = &self.phase else {
            return Err(FlowError::NothingPending);
        };
        let id = item.id;
        let payload = EventCreatePayload::from(item);
        self.phase = DeletePhase::Deleting { id, payload };
        Ok(id)
    }

    /// The delete request succeeded; its snapshot becomes the undo payload,
    /// replacing any earlier one.
    pub fn succeeded(&mut self) -> Result<i64, FlowError> {
        match std::mem::replace(&mut self.phase, DeletePhase::Deleted) {
            DeletePhase::Deleting { id, payload } => {
                self.undo = Some(payload);
                Ok(id)
            }
            other => {
                self.phase = other;
                Err(FlowError::NotDeleting)
            }
        }
    }

    /// The delete request failed; the previous undo payload survives.
    pub fn failed(&mut self) -> Result<(), FlowError> {
        if !matches!(self.phase, DeletePhase::Deleting { .. }) {
            return Err(FlowError::NotDeleting);
        }
        self.phase = self.resting_phase();
        Ok(())
    }

    /// Hand out the undo payload, clearing it.
    pub fn take_undo(&mut self) -> Option<EventCreatePayload> {
        let payload = self.undo.take()?;
        if matches!(self.phase, DeletePhase::Deleted) {
            self.phase = DeletePhase::Idle;
        }
        Some(payload)
    }

    fn resting_phase(&self) -> DeletePhase {
        if self.undo.is_some() {
            DeletePhase::Deleted
        } else {
            DeletePhase::Idle
        }
    }
}
