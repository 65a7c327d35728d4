//! recording surface - in-memory backend with a virtual clock
//!
//! keeps the last commanded state of every entity and a log of commands.
//! tweens apply their target immediately; their tickets come due on a
//! virtual clock the caller advances with [`RecordingSurface::next_due`]
//! or [`RecordingSurface::advance`].

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{Cue, PileView, Surface, Ticket, Transform, Tween, Visual};
use crate::card::CardId;
use crate::hud::HudView;
use crate::layout::Anchor;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Spawn { id: CardId, visual: Visual, transform: Transform, depth: i32 },
    SetVisual { id: CardId, visual: Visual },
    SetDepth { id: CardId, depth: i32 },
    Place { id: CardId, transform: Transform },
    Tween { ids: Vec<CardId>, tween: Tween, ticket: Option<Ticket> },
    Pulse { id: CardId },
    Destroy { id: CardId },
    Timer { delay_ms: u64, ticket: Ticket },
    Pile { seat: usize, stack_height: usize, markers: usize },
    TurnMarker { seat: usize },
    Cue(Cue),
    Hud,
    Clear,
}

impl Command {
    /// whether this command moves or animates an entity
    pub fn is_movement(&self) -> bool {
        matches!(self, Self::Place { .. } | Self::Tween { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEntity {
    pub transform: Transform,
    pub scale_x: f32,
    pub visual: Visual,
    pub depth: i32,
}

#[derive(Default)]
pub struct RecordingSurface {
    textures: HashSet<String>,
    probes: Cell<usize>,
    entities: HashMap<CardId, RecordedEntity>,
    log: Vec<Command>,
    /// (due, sequence) -> ticket
    pending: BTreeMap<(u64, u64), Ticket>,
    seq: u64,
    now: u64,
    piles: HashMap<usize, PileView>,
    marker: Option<(usize, Anchor)>,
    hud: Option<HudView>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_texture(&mut self, key: impl Into<String>) {
        self.textures.insert(key.into());
    }

    pub fn texture_probes(&self) -> usize {
        self.probes.get()
    }

    pub fn entity(&self, id: &str) -> Option<&RecordedEntity> {
        self.entities.get(&CardId::from(id))
    }

    pub fn entity_ids(&self) -> Vec<CardId> {
        let mut ids: Vec<_> = self.entities.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn commands(&self) -> &[Command] {
        &self.log
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.log)
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pending_tickets(&self) -> usize {
        self.pending.len()
    }

    /// pop the earliest ticket and move the clock to its due time
    pub fn next_due(&mut self) -> Option<Ticket> {
        let key = *self.pending.keys().next()?;
        let ticket = self.pending.remove(&key)?;
        self.now = self.now.max(key.0);
        Some(ticket)
    }

    /// move the clock forward and return every ticket that came due, in order
    pub fn advance(&mut self, ms: u64) -> Vec<Ticket> {
        self.now += ms;
        let mut due = Vec::new();
        loop {
            let key = match self.pending.keys().next() {
                Some(key) if key.0 <= self.now => *key,
                _ => break,
            };
            if let Some(ticket) = self.pending.remove(&key) {
                due.push(ticket);
            }
        }
        due
    }

    pub fn pile(&self, seat: usize) -> Option<&PileView> {
        self.piles.get(&seat)
    }

    pub fn turn_marker(&self) -> Option<usize> {
        self.marker.map(|(seat, _)| seat)
    }

    pub fn hud(&self) -> Option<&HudView> {
        self.hud.as_ref()
    }

    pub fn cues(&self) -> usize {
        self.log.iter().filter(|c| matches!(c, Command::Cue(_))).count()
    }

    fn schedule(&mut self, after_ms: u64, ticket: Ticket) {
        self.seq += 1;
        self.pending.insert((self.now + after_ms, self.seq), ticket);
    }
}

impl Surface for RecordingSurface {
    fn has_texture(&self, key: &str) -> bool {
        self.probes.set(self.probes.get() + 1);
        self.textures.contains(key)
    }

    fn spawn(&mut self, id: &CardId, visual: &Visual, transform: Transform, depth: i32) {
        self.entities.insert(
            id.clone(),
            RecordedEntity {
                transform,
                scale_x: 1.0,
                visual: visual.clone(),
                depth,
            },
        );
        self.log.push(Command::Spawn {
            id: id.clone(),
            visual: visual.clone(),
            transform,
            depth,
        });
    }

    fn set_visual(&mut self, id: &CardId, visual: &Visual) {
        if let Some(e) = self.entities.get_mut(id) {
            e.visual = visual.clone();
        }
        self.log.push(Command::SetVisual {
            id: id.clone(),
            visual: visual.clone(),
        });
    }

    fn set_depth(&mut self, id: &CardId, depth: i32) {
        if let Some(e) = self.entities.get_mut(id) {
            e.depth = depth;
        }
        self.log.push(Command::SetDepth { id: id.clone(), depth });
    }

    fn place(&mut self, id: &CardId, transform: Transform) {
        if let Some(e) = self.entities.get_mut(id) {
            e.transform = transform;
        }
        self.log.push(Command::Place { id: id.clone(), transform });
    }

    fn tween(&mut self, ids: &[CardId], tween: &Tween, ticket: Option<Ticket>) {
        for id in ids {
            if let Some(e) = self.entities.get_mut(id) {
                let to = &tween.to;
                if let Some(p) = to.position {
                    e.transform.position = p;
                }
                if let Some(r) = to.rotation {
                    e.transform.rotation = r;
                }
                if let Some(s) = to.scale {
                    e.transform.scale = s;
                    e.scale_x = 1.0;
                }
                if let Some(sx) = to.scale_x {
                    e.scale_x = sx;
                }
                if let Some(o) = to.opacity {
                    e.transform.opacity = o;
                }
            }
        }
        if let Some(ticket) = ticket {
            self.schedule(tween.total_ms(), ticket);
        }
        self.log.push(Command::Tween {
            ids: ids.to_vec(),
            tween: *tween,
            ticket,
        });
    }

    fn pulse(&mut self, id: &CardId) {
        self.log.push(Command::Pulse { id: id.clone() });
    }

    fn destroy(&mut self, id: &CardId) {
        self.entities.remove(id);
        self.log.push(Command::Destroy { id: id.clone() });
    }

    fn start_timer(&mut self, delay_ms: u64, ticket: Ticket) {
        self.schedule(delay_ms, ticket);
        self.log.push(Command::Timer { delay_ms, ticket });
    }

    fn draw_pile(&mut self, pile: &PileView) {
        self.piles.insert(pile.seat, pile.clone());
        self.log.push(Command::Pile {
            seat: pile.seat,
            stack_height: pile.stack_height,
            markers: pile.markers.len(),
        });
    }

    fn move_turn_marker(&mut self, seat: usize, anchor: &Anchor) {
        self.marker = Some((seat, *anchor));
        self.log.push(Command::TurnMarker { seat });
    }

    fn play_cue(&mut self, cue: Cue) {
        self.log.push(Command::Cue(cue));
    }

    fn update_hud(&mut self, hud: &HudView) {
        self.hud = Some(hud.clone());
        self.log.push(Command::Hud);
    }

    fn clear(&mut self) {
        self.entities.clear();
        self.pending.clear();
        self.piles.clear();
        self.marker = None;
        self.log.push(Command::Clear);
    }
}
