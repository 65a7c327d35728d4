//! input - pointer gestures to move intents
//!
//! at most one move is outstanding. the pending token is set when a
//! PLAY_CARD goes out and cleared by the first snapshot that no longer has
//! the card in the local hand, or by the failsafe timer.

use crate::card::CardId;
use crate::layout::Point;
use crate::protocol::ClientMessage;
use crate::snapshot::Snapshot;
use crate::surface::Surface;
use crate::timeline::{Continuation, Timeline};

#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    DragStart { card: CardId },
    /// pointer let go of a dragged card at `at`
    DragRelease { card: CardId, at: Point },
    /// press and release on a card
    Tap { card: CardId, held_ms: u64 },
}

impl PointerEvent {
    pub fn card(&self) -> &CardId {
        match self {
            Self::DragStart { card } | Self::DragRelease { card, .. } | Self::Tap { card, .. } => card,
        }
    }
}

/// why a gesture produced no intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejected {
    /// a move is already waiting for confirmation
    Pending(CardId),
    NotInLocalHand,
    /// held too long to be a tap
    LongPress,
    NoState,
    /// drag start; the host moves the card, the release decides
    NoIntent,
}

#[derive(Debug)]
pub struct InputController {
    pending: Option<CardId>,
    tap_threshold_ms: u64,
    failsafe_ms: u64,
}

impl InputController {
    pub fn new(tap_threshold_ms: u64, failsafe_ms: u64) -> Self {
        Self {
            pending: None,
            tap_threshold_ms,
            failsafe_ms,
        }
    }

    pub fn pending(&self) -> Option<&CardId> {
        self.pending.as_ref()
    }

    /// turn a gesture into at most one PLAY_CARD
    pub fn handle<S: Surface + ?Sized>(
        &mut self,
        event: &PointerEvent,
        snapshot: Option<&Snapshot>,
        local: usize,
        timeline: &mut Timeline,
        surface: &mut S,
    ) -> Result<ClientMessage, Rejected> {
        let card = match event {
            PointerEvent::DragStart { .. } => return Err(Rejected::NoIntent),
            PointerEvent::DragRelease { card, .. } => card,
            PointerEvent::Tap { card, held_ms } => {
                if *held_ms >= self.tap_threshold_ms {
                    return Err(Rejected::LongPress);
                }
                card
            }
        };

        if let Some(pending) = &self.pending {
            tracing::debug!(card = %card, pending = %pending, "input ignored, move pending");
            return Err(Rejected::Pending(pending.clone()));
        }
        let snapshot = snapshot.ok_or(Rejected::NoState)?;
        let in_hand = snapshot
            .seats
            .get(local)
            .map(|s| s.holds(card))
            .unwrap_or(false);
        if !in_hand {
            return Err(Rejected::NotInLocalHand);
        }

        self.pending = Some(card.clone());
        let ticket = timeline.issue(Continuation::Failsafe(card.clone()));
        surface.start_timer(self.failsafe_ms, ticket);
        tracing::info!(card = %card, seat = local, "proposing move");

        Ok(ClientMessage::PlayCard {
            player_index: local,
            card_id: card.clone(),
            combo_index: 0,
        })
    }

    /// clear the token once the card has left the local hand
    pub fn confirm(&mut self, snapshot: &Snapshot, local: usize) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        let still_held = snapshot
            .seats
            .get(local)
            .map(|s| s.holds(pending))
            .unwrap_or(false);
        if still_held {
            return false;
        }
        tracing::debug!(card = %pending, "pending move confirmed");
        self.pending = None;
        true
    }

    /// failsafe fired; clears the token only if it still names `card`
    pub fn expire(&mut self, card: &CardId) -> bool {
        if self.pending.as_ref() == Some(card) {
            tracing::warn!(card = %card, "move not confirmed in time, unlocking input");
            self.pending = None;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::*;
    use crate::surface::recording::RecordingSurface;

    fn snap(hand: &[&str]) -> Snapshot {
        snapshot(&[], vec![seat("Alice", hand, &[], false), seat("Bot", &["3D"], &[], true)], 0)
    }

    fn tap(card: &str, held_ms: u64) -> PointerEvent {
        PointerEvent::Tap {
            card: card.into(),
            held_ms,
        }
    }

    #[test]
    fn test_tap_emits_play_card() {
        let mut input = InputController::new(200, 1000);
        let mut timeline = Timeline::new();
        let mut surface = RecordingSurface::new();
        let msg = input
            .handle(&tap("1D", 50), Some(&snap(&["1D", "2D"])), 0, &mut timeline, &mut surface)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlayCard {
                player_index: 0,
                card_id: "1D".into(),
                combo_index: 0
            }
        );
        assert_eq!(input.pending(), Some(&CardId::from("1D")));
        assert!(timeline.has(|c| *c == Continuation::Failsafe("1D".into())));
    }

    #[test]
    fn test_debounced_while_pending() {
        let mut input = InputController::new(200, 1000);
        let mut timeline = Timeline::new();
        let mut surface = RecordingSurface::new();
        let s = snap(&["1D", "2D"]);
        input.handle(&tap("1D", 50), Some(&s), 0, &mut timeline, &mut surface).unwrap();
        assert_eq!(
            input.handle(&tap("2D", 50), Some(&s), 0, &mut timeline, &mut surface),
            Err(Rejected::Pending("1D".into()))
        );
    }

    #[test]
    fn test_rejects_foreign_and_long_press() {
        let mut input = InputController::new(200, 1000);
        let mut timeline = Timeline::new();
        let mut surface = RecordingSurface::new();
        let s = snap(&["1D"]);
        assert_eq!(
            input.handle(&tap("3D", 50), Some(&s), 0, &mut timeline, &mut surface),
            Err(Rejected::NotInLocalHand)
        );
        assert_eq!(
            input.handle(&tap("1D", 200), Some(&s), 0, &mut timeline, &mut surface),
            Err(Rejected::LongPress)
        );
        assert_eq!(
            input.handle(&tap("1D", 10), None, 0, &mut timeline, &mut surface),
            Err(Rejected::NoState)
        );
        assert!(input.pending().is_none());
    }

    #[test]
    fn test_drag_release_proposes() {
        let mut input = InputController::new(200, 1000);
        let mut timeline = Timeline::new();
        let mut surface = RecordingSurface::new();
        let s = snap(&["1D"]);
        let start = PointerEvent::DragStart { card: "1D".into() };
        assert_eq!(
            input.handle(&start, Some(&s), 0, &mut timeline, &mut surface),
            Err(Rejected::NoIntent)
        );
        assert!(input.pending().is_none());
        assert!(timeline.is_empty());
        let release = PointerEvent::DragRelease {
            card: "1D".into(),
            at: Point::new(600.0, 300.0),
        };
        assert!(input.handle(&release, Some(&s), 0, &mut timeline, &mut surface).is_ok());
        assert_eq!(input.pending(), Some(&CardId::from("1D")));
    }

    #[test]
    fn test_confirm_and_expire() {
        let mut input = InputController::new(200, 1000);
        let mut timeline = Timeline::new();
        let mut surface = RecordingSurface::new();
        input
            .handle(&tap("1D", 50), Some(&snap(&["1D", "2D"])), 0, &mut timeline, &mut surface)
            .unwrap();

        assert!(!input.confirm(&snap(&["1D", "2D"]), 0));
        assert!(input.pending().is_some());
        assert!(input.confirm(&snap(&["2D"]), 0));
        assert!(input.pending().is_none());

        // late failsafe for a confirmed move is a no-op
        assert!(!input.expire(&"1D".into()));
    }
}
