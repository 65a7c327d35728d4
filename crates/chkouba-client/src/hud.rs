//! hud - scores, deck count and turn status

use crate::layout::{Anchor, Layout, SeatRegion};
use crate::snapshot::Snapshot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// no snapshot yet
    Waiting,
    YourTurn,
    TheirTurn(String),
    RoundFinished,
    GameOver,
    /// the server went away; nothing more will arrive
    ConnectionLost(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HudSeat {
    pub name: String,
    pub score: i64,
    pub chkoubas: u32,
    pub captured: usize,
    pub is_ai: bool,
    pub is_local: bool,
    pub plate: Anchor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HudView {
    pub seats: Vec<HudSeat>,
    pub deck_remaining: usize,
    pub status: Status,
}

impl HudView {
    pub fn waiting() -> Self {
        Self {
            seats: Vec::new(),
            deck_remaining: 0,
            status: Status::Waiting,
        }
    }

    pub fn build(snapshot: &Snapshot, local: usize, active: usize, layout: &Layout) -> Self {
        let count = snapshot.seat_count();
        let seats = snapshot
            .seats
            .iter()
            .enumerate()
            .map(|(idx, seat)| HudSeat {
                name: seat.name.clone(),
                score: snapshot.score_of(&seat.name),
                chkoubas: seat.chkoubas,
                captured: seat.captured_cards.len(),
                is_ai: seat.is_ai,
                is_local: idx == local,
                plate: layout.seat_anchor(idx, local, count, SeatRegion::NamePlate),
            })
            .collect();

        let status = if snapshot.game_over {
            Status::GameOver
        } else if snapshot.round_finished {
            Status::RoundFinished
        } else if snapshot.seats.is_empty() {
            Status::Waiting
        } else if active == local {
            Status::YourTurn
        } else {
            let name = snapshot
                .seats
                .get(active)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            Status::TheirTurn(name)
        };

        Self {
            seats,
            deck_remaining: snapshot.deck_remaining(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportConfig;
    use crate::snapshot::fixtures::*;

    #[test]
    fn test_status_follows_active_seat() {
        let layout = Layout::new(ViewportConfig::default());
        let mut snap = snapshot(
            &[],
            vec![seat("Alice", &["1D"], &[], false), seat("Bot", &["3D"], &["7H"], true)],
            1,
        );
        snap.scores.insert("Bot".into(), 4);

        let hud = HudView::build(&snap, 0, 1, &layout);
        assert_eq!(hud.status, Status::TheirTurn("Bot".into()));
        assert_eq!(hud.seats[1].score, 4);
        assert_eq!(hud.seats[1].captured, 1);
        assert!(hud.seats[0].is_local);

        assert_eq!(HudView::build(&snap, 0, 0, &layout).status, Status::YourTurn);

        snap.round_finished = true;
        assert_eq!(HudView::build(&snap, 0, 0, &layout).status, Status::RoundFinished);
        snap.game_over = true;
        assert_eq!(HudView::build(&snap, 0, 0, &layout).status, Status::GameOver);
    }
}
