//! headless surface - logs draw commands, completes tickets on real time
//!
//! tweens and timers finish by sleeping on the tokio clock and sending the
//! ticket back over a channel the main loop feeds to `Client::on_complete`.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use chkouba_client::card::CardId;
use chkouba_client::hud::{HudView, Status};
use chkouba_client::layout::Anchor;
use chkouba_client::surface::{Cue, PileView, Surface, Ticket, Transform, Tween, Visual};

pub struct HeadlessSurface {
    completions: UnboundedSender<Ticket>,
    last_status: Option<Status>,
}

impl HeadlessSurface {
    pub fn new(completions: UnboundedSender<Ticket>) -> Self {
        Self {
            completions,
            last_status: None,
        }
    }

    fn complete_after(&self, ms: u64, ticket: Ticket) {
        let tx = self.completions.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            // receiver gone means the client is shutting down
            let _ = tx.send(ticket);
        });
    }
}

fn describe(visual: &Visual) -> String {
    match visual {
        Visual::Image(key) => key.clone(),
        Visual::Placeholder { label, .. } if label.is_empty() => "[back]".to_string(),
        Visual::Placeholder { label, .. } => format!("[{}]", label),
    }
}

impl Surface for HeadlessSurface {
    fn has_texture(&self, _key: &str) -> bool {
        false
    }

    fn spawn(&mut self, id: &CardId, visual: &Visual, transform: Transform, depth: i32) {
        debug!(card = %id, visual = %describe(visual), x = transform.position.x, y = transform.position.y, depth, "spawn");
    }

    fn set_visual(&mut self, id: &CardId, visual: &Visual) {
        debug!(card = %id, visual = %describe(visual), "set visual");
    }

    fn set_depth(&mut self, id: &CardId, depth: i32) {
        debug!(card = %id, depth, "set depth");
    }

    fn place(&mut self, id: &CardId, transform: Transform) {
        debug!(card = %id, x = transform.position.x, y = transform.position.y, "place");
    }

    fn tween(&mut self, ids: &[CardId], tween: &Tween, ticket: Option<Ticket>) {
        debug!(cards = ?ids, ms = tween.duration_ms, delay = tween.delay_ms, ease = ?tween.ease, "tween");
        if let Some(ticket) = ticket {
            self.complete_after(tween.total_ms(), ticket);
        }
    }

    fn pulse(&mut self, id: &CardId) {
        debug!(card = %id, "pulse");
    }

    fn destroy(&mut self, id: &CardId) {
        debug!(card = %id, "destroy");
    }

    fn start_timer(&mut self, delay_ms: u64, ticket: Ticket) {
        self.complete_after(delay_ms, ticket);
    }

    fn draw_pile(&mut self, pile: &PileView) {
        debug!(seat = pile.seat, stack = pile.stack_height, chkoubas = pile.markers.len(), "pile");
    }

    fn move_turn_marker(&mut self, seat: usize, _anchor: &Anchor) {
        debug!(seat, "turn marker");
    }

    fn play_cue(&mut self, cue: Cue) {
        match cue {
            Cue::YourTurn => info!("your turn"),
        }
    }

    fn update_hud(&mut self, hud: &HudView) {
        if self.last_status.as_ref() != Some(&hud.status) {
            let scores: Vec<String> = hud
                .seats
                .iter()
                .map(|s| format!("{}={} ({} chkouba)", s.name, s.score, s.chkoubas))
                .collect();
            info!(status = ?hud.status, deck = hud.deck_remaining, scores = %scores.join(", "), "table");
            self.last_status = Some(hud.status.clone());
        }
    }

    fn clear(&mut self) {
        debug!("clear");
    }
}
