//! protocol - websocket message types
//!
//! the server pushes whole snapshots; the client pushes move intents and
//! lifecycle requests. every frame is a json object tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::card::CardId;
use crate::snapshot::Snapshot;

/// server -> client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// full replace, hard reset of the scene before sync
    Init { state: Snapshot },
    /// diff against the previous snapshot, then sync
    Update { state: Snapshot },
}

impl ServerMessage {
    pub fn state(&self) -> &Snapshot {
        match self {
            Self::Init { state } | Self::Update { state } => state,
        }
    }
}

/// client -> server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// sent once after the connection opens
    GetState,
    PlayCard {
        player_index: usize,
        card_id: CardId,
        combo_index: usize,
    },
    /// a remote move finished animating
    AnimationComplete,
    Reset,
    StartGame,
    NextRound,
}

pub fn decode(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn encode(msg: &ClientMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
