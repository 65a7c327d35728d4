//! diff - infer the move a remote seat just made
//!
//! the server only ever sends whole states. comparing two consecutive
//! snapshots recovers the one card a remote seat played and, for a
//! capture, the table cards it took.

use std::collections::HashSet;

use crate::card::{Card, CardId};
use crate::error::ProtocolAnomaly;
use crate::snapshot::Snapshot;

/// a move recovered from two snapshots
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteMove {
    pub seat_index: usize,
    pub played: Card,
    /// table cards taken with the played card, empty for a drop
    pub captured: Vec<CardId>,
}

impl RemoteMove {
    pub fn is_capture(&self) -> bool {
        !self.captured.is_empty()
    }

    /// every id the move animates
    pub fn ids(&self) -> impl Iterator<Item = &CardId> {
        std::iter::once(&self.played.id).chain(self.captured.iter())
    }
}

/// infer the move of the single non-local seat whose hand shrank.
/// `local` is the local seat's index in `curr`.
///
/// `Ok(None)` when no remote hand shrank or the shrink cannot be tied to
/// a card (e.g. a round boundary). two or more shrinking hands are an
/// anomaly.
pub fn infer_remote_move(
    prev: &Snapshot,
    curr: &Snapshot,
    local: usize,
) -> Result<Option<RemoteMove>, ProtocolAnomaly> {
    let shrunk: Vec<usize> = curr
        .seats
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != local)
        .filter_map(|(idx, seat)| {
            let before = prev.seats.iter().find(|s| s.name == seat.name)?;
            (seat.hand.len() < before.hand.len()).then_some(idx)
        })
        .collect();

    let seat_index = match shrunk.len() {
        0 => return Ok(None),
        1 => shrunk[0],
        _ => return Err(ProtocolAnomaly::MultipleSeatsMoved { seats: shrunk }),
    };

    let seat = &curr.seats[seat_index];
    let Some(before) = prev.seats.iter().find(|s| s.name == seat.name) else {
        return Ok(None);
    };

    if seat.captured_cards.len() > before.captured_cards.len() {
        let had: HashSet<&CardId> = before.captured_cards.iter().map(|c| &c.id).collect();
        let played = seat
            .captured_cards
            .iter()
            .filter(|c| !had.contains(&c.id))
            .find(|c| before.holds(&c.id) && !prev.table_contains(&c.id));

        if let Some(played) = played {
            let captured = prev
                .table
                .iter()
                .filter(|c| !curr.table_contains(&c.id) && c.id != played.id)
                .map(|c| c.id.clone())
                .collect();
            return Ok(Some(RemoteMove {
                seat_index,
                played: played.clone(),
                captured,
            }));
        }
    }

    let played = curr
        .table
        .iter()
        .filter(|c| !prev.table_contains(&c.id))
        .find(|c| before.holds(&c.id));

    match played {
        Some(played) => Ok(Some(RemoteMove {
            seat_index,
            played: played.clone(),
            captured: Vec::new(),
        })),
        None => {
            tracing::debug!(seat = %seat.name, "hand shrank but no played card could be found");
            Ok(None)
        }
    }
}
