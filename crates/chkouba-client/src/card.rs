//! card - identity and wire shape of a single card
//!
//! a card id is the rank followed by the suit letter ("7H", "10D").
//! ids are unique across the whole game, so the client keys every
//! visual entity by id and never by position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// opaque card identity, unique across the game
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// suit letter as sent by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "H")]
    Hearts,
    #[serde(rename = "S")]
    Spades,
    #[serde(rename = "D")]
    Diamonds,
    #[serde(rename = "C")]
    Clubs,
    /// bastoni, used by the italian-suited deck
    #[serde(rename = "B")]
    Batons,
}

impl Suit {
    pub fn letter(&self) -> char {
        match self {
            Self::Hearts => 'H',
            Self::Spades => 'S',
            Self::Diamonds => 'D',
            Self::Clubs => 'C',
            Self::Batons => 'B',
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Hearts => "♥",
            Self::Spades => "♠",
            Self::Diamonds => "♦",
            Self::Clubs => "♣",
            Self::Batons => "B",
        }
    }
}

/// card as carried inside a snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    /// rank 1..=10
    pub value: u8,
    pub id: CardId,
}

impl Card {
    pub fn new(value: u8, suit: Suit) -> Self {
        Self {
            suit,
            value,
            id: CardId(format!("{}{}", value, suit.letter())),
        }
    }

    /// short label used when no texture exists for the face
    pub fn label(&self) -> String {
        let rank = match self.value {
            1 => "A".to_string(),
            8 => "Q".to_string(),
            9 => "J".to_string(),
            10 => "K".to_string(),
            v => v.to_string(),
        };
        format!("{}{}", rank, self.suit.symbol())
    }

    /// texture key for the face-up side
    pub fn texture_key(&self) -> String {
        format!("card_{}", self.id)
    }
}
