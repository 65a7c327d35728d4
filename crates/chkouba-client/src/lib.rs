//! chkouba-client - presentation core for a server-authoritative chkouba table
//!
//! the server owns the rules and sends whole snapshots. this crate diffs
//! consecutive snapshots to recover remote moves, choreographs them on a
//! rendering [`surface::Surface`], keeps every other card in sync with the
//! latest snapshot and turns pointer gestures into move intents.
//!
//! ## architecture
//!
//! ```text
//! Client
//! ├── diff:      prev + curr snapshot -> RemoteMove
//! ├── sequencer: RemoteMove -> staged animation, lock set, ack
//! ├── registry:  card id -> entity, sync of unlocked ids
//! ├── layout:    seat rotation, hand/table/pile anchors
//! ├── turn:      active seat marker + cue
//! └── input:     gestures -> PLAY_CARD, pending token
//! ```

pub mod card;
pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod hud;
pub mod input;
pub mod layout;
pub mod protocol;
pub mod registry;
pub mod sequencer;
pub mod snapshot;
pub mod surface;
pub mod timeline;
pub mod turn;

pub use card::{Card, CardId, Suit};
pub use client::{Client, ConnectionState, UpdateReport};
pub use config::{ClientConfig, ConfigError};
pub use diff::{infer_remote_move, RemoteMove};
pub use error::{ClientError, ProtocolAnomaly};
pub use input::PointerEvent;
pub use protocol::{ClientMessage, ServerMessage};
pub use snapshot::{Seat, Snapshot};
pub use surface::{Surface, Ticket};
