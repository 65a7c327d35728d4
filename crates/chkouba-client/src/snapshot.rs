//! snapshot - authoritative game state as received from the server
//!
//! snapshots are immutable and always arrive whole. the client keeps the
//! previous one around only to diff against the next.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::card::{Card, CardId};
use crate::error::ProtocolAnomaly;

/// one seat at the table. seat order in the snapshot is turn order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// stable identity of the seat
    pub name: String,
    /// display order only
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub captured_cards: Vec<Card>,
    /// bonus count for clearing the table
    #[serde(default)]
    pub chkoubas: u32,
    /// hint only, never used for legality
    #[serde(default)]
    pub is_ai: bool,
}

impl Seat {
    pub fn holds(&self, id: &CardId) -> bool {
        self.hand.iter().any(|c| &c.id == id)
    }

    pub fn has_captured(&self, id: &CardId) -> bool {
        self.captured_cards.iter().any(|c| &c.id == id)
    }
}

/// full game state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// undealt cards; only the length matters to the client
    #[serde(default)]
    pub deck: Vec<Card>,
    /// alternative to `deck` for servers that only send a count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_count: Option<usize>,
    #[serde(default)]
    pub table: Vec<Card>,
    #[serde(rename = "players", default)]
    pub seats: Vec<Seat>,
    #[serde(default)]
    pub last_capture_player_index: Option<usize>,
    #[serde(rename = "current_player_index", default)]
    pub current_seat_index: usize,
    #[serde(default)]
    pub round_finished: bool,
    #[serde(default)]
    pub game_over: bool,
    /// scores keyed by seat name
    #[serde(default)]
    pub scores: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<serde_json::Value>,
}

/// where a card id lives inside a snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardRegion {
    Table,
    Hand(usize),
    Captured(usize),
}

impl fmt::Display for CardRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Hand(seat) => write!(f, "hand of seat {}", seat),
            Self::Captured(seat) => write!(f, "pile of seat {}", seat),
        }
    }
}

impl Snapshot {
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck_count.unwrap_or(self.deck.len())
    }

    pub fn seat_index_by_name(&self, name: &str) -> Option<usize> {
        self.seats.iter().position(|s| s.name == name)
    }

    /// seat rendered at the bottom. falls back to seat 0 when the
    /// local name is not seated.
    pub fn local_seat_index(&self, local_name: &str) -> usize {
        match self.seat_index_by_name(local_name) {
            Some(idx) => idx,
            None => {
                if !self.seats.is_empty() {
                    tracing::warn!(name = local_name, "local player not seated, using seat 0");
                }
                0
            }
        }
    }

    pub fn current_seat(&self) -> Option<&Seat> {
        self.seats.get(self.current_seat_index)
    }

    pub fn table_contains(&self, id: &CardId) -> bool {
        self.table.iter().any(|c| &c.id == id)
    }

    pub fn table_ordinal(&self, id: &CardId) -> Option<usize> {
        self.table.iter().position(|c| &c.id == id)
    }

    /// region currently holding `id`, table first then seats in order
    pub fn region_of(&self, id: &CardId) -> Option<CardRegion> {
        if self.table_contains(id) {
            return Some(CardRegion::Table);
        }
        for (idx, seat) in self.seats.iter().enumerate() {
            if seat.holds(id) {
                return Some(CardRegion::Hand(idx));
            }
            if seat.has_captured(id) {
                return Some(CardRegion::Captured(idx));
            }
        }
        None
    }

    /// seat whose capture pile contains `id`
    pub fn pile_owner(&self, id: &CardId) -> Option<usize> {
        self.seats.iter().position(|s| s.has_captured(id))
    }

    /// every card on the table or in a hand, with its region
    pub fn cards_in_play(&self) -> impl Iterator<Item = (&Card, CardRegion)> {
        let table = self.table.iter().map(|c| (c, CardRegion::Table));
        let hands = self
            .seats
            .iter()
            .enumerate()
            .flat_map(|(idx, s)| s.hand.iter().map(move |c| (c, CardRegion::Hand(idx))));
        table.chain(hands)
    }

    pub fn score_of(&self, name: &str) -> i64 {
        self.scores.get(name).copied().unwrap_or(0)
    }

    /// every id must live in exactly one of table, a hand or a pile
    pub fn check_invariants(&self) -> Result<(), ProtocolAnomaly> {
        if !self.seats.is_empty() && self.current_seat_index >= self.seats.len() {
            return Err(ProtocolAnomaly::SeatIndexOutOfRange {
                index: self.current_seat_index,
                count: self.seats.len(),
            });
        }

        let mut seen: HashMap<&CardId, CardRegion> = HashMap::new();
        let captured = self.seats.iter().enumerate().flat_map(|(idx, s)| {
            s.captured_cards
                .iter()
                .map(move |c| (c, CardRegion::Captured(idx)))
        });

        for (card, region) in self.cards_in_play().chain(captured) {
            if let Some(first) = seen.insert(&card.id, region) {
                return Err(ProtocolAnomaly::DuplicateCard {
                    card: card.id.clone(),
                    first,
                    second: region,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::card::Suit;

    pub fn card(id: &str) -> Card {
        let (rank, suit) = id.split_at(id.len() - 1);
        let suit = match suit {
            "H" => Suit::Hearts,
            "S" => Suit::Spades,
            "D" => Suit::Diamonds,
            "C" => Suit::Clubs,
            _ => Suit::Batons,
        };
        Card::new(rank.parse().unwrap_or(1), suit)
    }

    pub fn cards(ids: &[&str]) -> Vec<Card> {
        ids.iter().map(|id| card(id)).collect()
    }

    pub fn seat(name: &str, hand: &[&str], captured: &[&str], is_ai: bool) -> Seat {
        Seat {
            name: name.to_string(),
            hand: cards(hand),
            captured_cards: cards(captured),
            chkoubas: 0,
            is_ai,
        }
    }

    pub fn snapshot(table: &[&str], seats: Vec<Seat>, current: usize) -> Snapshot {
        Snapshot {
            table: cards(table),
            seats,
            current_seat_index: current,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_decode_server_state() {
        let json = r#"{
            "deck": [{"suit":"C","value":4,"id":"4C"}],
            "table": [{"suit":"H","value":7,"id":"7H"}],
            "players": [
                {"name":"Alice","hand":[],"captured_cards":[],"chkoubas":0,"is_ai":false},
                {"name":"Bot","hand":[{"suit":"D","value":3,"id":"3D"}],"captured_cards":[],"chkoubas":1,"is_ai":true}
            ],
            "last_capture_player_index": null,
            "current_player_index": 1,
            "round_finished": false,
            "game_over": false,
            "scores": {"Alice": 3, "Bot": 5}
        }"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.seat_count(), 2);
        assert_eq!(snap.deck_remaining(), 1);
        assert_eq!(snap.current_seat_index, 1);
        assert_eq!(snap.seats[1].chkoubas, 1);
        assert_eq!(snap.score_of("Bot"), 5);
        assert_eq!(snap.score_of("Nobody"), 0);
        assert!(snap.check_invariants().is_ok());
    }

    #[test]
    fn test_deck_count_overrides_list() {
        let snap: Snapshot = serde_json::from_str(r#"{"deck_count": 12, "players": []}"#).unwrap();
        assert_eq!(snap.deck_remaining(), 12);
    }

    #[test]
    fn test_region_lookup() {
        let snap = snapshot(
            &["7H"],
            vec![
                seat("Alice", &["1D"], &["2S"], false),
                seat("Bot", &["3D"], &[], true),
            ],
            0,
        );
        assert_eq!(snap.region_of(&"7H".into()), Some(CardRegion::Table));
        assert_eq!(snap.region_of(&"3D".into()), Some(CardRegion::Hand(1)));
        assert_eq!(snap.region_of(&"2S".into()), Some(CardRegion::Captured(0)));
        assert_eq!(snap.region_of(&"9C".into()), None);
        assert_eq!(snap.pile_owner(&"2S".into()), Some(0));
    }

    #[test]
    fn test_local_seat_fallback() {
        let snap = snapshot(&[], vec![seat("Bot", &[], &[], true), seat("Alice", &[], &[], false)], 0);
        assert_eq!(snap.local_seat_index("Alice"), 1);
        assert_eq!(snap.local_seat_index("Carol"), 0);
    }

    #[test]
    fn test_duplicate_card_detected() {
        let snap = snapshot(
            &["7H"],
            vec![seat("Alice", &["7H"], &[], false), seat("Bot", &[], &[], true)],
            0,
        );
        match snap.check_invariants() {
            Err(ProtocolAnomaly::DuplicateCard { card, first, second }) => {
                assert_eq!(card.as_str(), "7H");
                assert_eq!(first, CardRegion::Table);
                assert_eq!(second, CardRegion::Hand(0));
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn test_current_seat_out_of_range() {
        let snap = snapshot(&[], vec![seat("Alice", &[], &[], false)], 3);
        assert!(matches!(
            snap.check_invariants(),
            Err(ProtocolAnomaly::SeatIndexOutOfRange { index: 3, count: 1 })
        ));
    }
}
