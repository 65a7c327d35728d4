//! timeline - ticket to continuation map
//!
//! every deferred step (a pipeline stage, a removal, a timeout) is parked
//! here under a fresh ticket and resumed when the surface reports that
//! ticket complete. tickets are never reused, so completions arriving
//! after a reset find nothing and are dropped.

use std::collections::HashMap;

use crate::card::CardId;
use crate::surface::Ticket;

pub type PipelineId = u64;

/// what to do when a ticket completes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation {
    /// advance a move pipeline past `step`
    Stage { pipeline: PipelineId, step: usize },
    /// a card finished flying into its pile
    Removal(CardId),
    /// pending move was never confirmed
    Failsafe(CardId),
    /// acknowledge on behalf of an idle ai seat
    AutoAck,
    /// the scene has settled; refresh the turn marker
    TurnSettle,
}

#[derive(Debug, Default)]
pub struct Timeline {
    next: Ticket,
    pending: HashMap<Ticket, Continuation>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, continuation: Continuation) -> Ticket {
        self.next += 1;
        self.pending.insert(self.next, continuation);
        self.next
    }

    pub fn take(&mut self, ticket: Ticket) -> Option<Continuation> {
        self.pending.remove(&ticket)
    }

    pub fn has(&self, pred: impl Fn(&Continuation) -> bool) -> bool {
        self.pending.values().any(pred)
    }

    /// drop every pending continuation matching `pred`
    pub fn cancel(&mut self, pred: impl Fn(&Continuation) -> bool) {
        self.pending.retain(|_, c| !pred(c));
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_resolves_once() {
        let mut t = Timeline::new();
        let ticket = t.issue(Continuation::AutoAck);
        assert_eq!(t.take(ticket), Some(Continuation::AutoAck));
        assert_eq!(t.take(ticket), None);
    }

    #[test]
    fn test_stale_after_clear() {
        let mut t = Timeline::new();
        let old = t.issue(Continuation::TurnSettle);
        t.clear();
        let fresh = t.issue(Continuation::TurnSettle);
        assert_ne!(old, fresh);
        assert_eq!(t.take(old), None);
        assert!(t.take(fresh).is_some());
    }

    #[test]
    fn test_cancel_by_kind() {
        let mut t = Timeline::new();
        t.issue(Continuation::AutoAck);
        t.issue(Continuation::Removal("7H".into()));
        t.cancel(|c| matches!(c, Continuation::AutoAck));
        assert!(!t.has(|c| matches!(c, Continuation::AutoAck)));
        assert_eq!(t.len(), 1);
    }
}
