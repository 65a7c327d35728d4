//! error types

use crate::card::CardId;
use crate::config::ConfigError;
use crate::snapshot::CardRegion;

/// snapshot contents the client cannot make sense of.
///
/// never fatal: the cycle that hit it skips move inference and
/// falls back to a plain resync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolAnomaly {
    #[error("more than one seat's hand shrank in a single update: {seats:?}")]
    MultipleSeatsMoved { seats: Vec<usize> },
    #[error("card {card} present in both {first} and {second}")]
    DuplicateCard {
        card: CardId,
        first: CardRegion,
        second: CardRegion,
    },
    #[error("current seat index {index} out of range for {count} seats")]
    SeatIndexOutOfRange { index: usize, count: usize },
}

/// client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
