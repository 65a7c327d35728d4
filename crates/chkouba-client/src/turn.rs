//! turn - whose turn the table shows
//!
//! while a remote move is still animating the marker stays on the seat
//! that made it, even if the snapshot already moved the turn on.

use crate::layout::{Layout, SeatRegion};
use crate::snapshot::Snapshot;
use crate::surface::{Cue, Surface};

/// seat to highlight: the animating seat first, else the snapshot's
pub fn active_seat(snapshot: &Snapshot, in_flight: Option<usize>) -> usize {
    in_flight.unwrap_or(snapshot.current_seat_index)
}

#[derive(Debug, Default)]
pub struct TurnIndicator {
    /// last seat the marker was moved to
    last: Option<usize>,
}

impl TurnIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// move the marker if the active seat changed. plays the turn cue once
    /// per transition onto the local seat. returns the new seat on change.
    pub fn refresh<S: Surface + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        in_flight: Option<usize>,
        local: usize,
        layout: &Layout,
        surface: &mut S,
    ) -> Option<usize> {
        if snapshot.seats.is_empty() {
            return None;
        }
        let seat = active_seat(snapshot, in_flight);
        if self.last == Some(seat) {
            return None;
        }

        let anchor = layout.seat_anchor(seat, local, snapshot.seat_count(), SeatRegion::NamePlate);
        surface.move_turn_marker(seat, &anchor);
        if seat == local {
            surface.play_cue(Cue::YourTurn);
        }
        tracing::debug!(seat, local = seat == local, "turn marker moved");
        self.last = Some(seat);
        Some(seat)
    }

    /// re-place the marker after a relayout, without a cue
    pub fn redraw<S: Surface + ?Sized>(&self, snapshot: &Snapshot, local: usize, layout: &Layout, surface: &mut S) {
        if let Some(seat) = self.last.filter(|s| *s < snapshot.seat_count()) {
            let anchor = layout.seat_anchor(seat, local, snapshot.seat_count(), SeatRegion::NamePlate);
            surface.move_turn_marker(seat, &anchor);
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportConfig;
    use crate::snapshot::fixtures::*;
    use crate::surface::recording::RecordingSurface;

    fn snap(current: usize) -> Snapshot {
        snapshot(&[], vec![seat("Alice", &[], &[], false), seat("Bot", &[], &[], true)], current)
    }

    #[test]
    fn test_in_flight_seat_wins() {
        assert_eq!(active_seat(&snap(0), Some(1)), 1);
        assert_eq!(active_seat(&snap(0), None), 0);
    }

    #[test]
    fn test_cue_once_per_transition() {
        let layout = Layout::new(ViewportConfig::default());
        let mut surface = RecordingSurface::new();
        let mut turn = TurnIndicator::new();

        assert_eq!(turn.refresh(&snap(1), None, 0, &layout, &mut surface), Some(1));
        assert_eq!(surface.cues(), 0);

        assert_eq!(turn.refresh(&snap(0), None, 0, &layout, &mut surface), Some(0));
        assert_eq!(turn.refresh(&snap(0), None, 0, &layout, &mut surface), None);
        assert_eq!(surface.cues(), 1);

        turn.refresh(&snap(1), None, 0, &layout, &mut surface);
        turn.refresh(&snap(0), None, 0, &layout, &mut surface);
        assert_eq!(surface.cues(), 2);
        assert_eq!(surface.turn_marker(), Some(0));
    }

    #[test]
    fn test_marker_held_during_animation() {
        let layout = Layout::new(ViewportConfig::default());
        let mut surface = RecordingSurface::new();
        let mut turn = TurnIndicator::new();
        turn.refresh(&snap(1), None, 0, &layout, &mut surface);
        // snapshot says it is our turn but the bot's move is still playing
        assert_eq!(turn.refresh(&snap(0), Some(1), 0, &layout, &mut surface), None);
        assert_eq!(surface.cues(), 0);
    }
}
