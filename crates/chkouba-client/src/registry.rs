//! registry - card id to visual entity map
//!
//! the registry is the only owner of entity state. ordinary sync and the
//! animation sequencer both go through it, so the stored transform always
//! matches the last command sent to the surface.
//!
//! ```text
//! sync(snapshot, locks)
//! ├── table + hands, minus locks: spawn / reface / snap / tween
//! └── known ids gone from play, minus locks: fly to pile, then destroy
//! ```

use std::collections::{HashMap, HashSet};

use crate::card::{Card, CardId, Suit};
use crate::config::{AnimationTimings, SnapTolerance};
use crate::layout::{Layout, Point, SeatRegion, SlotTransform};
use crate::snapshot::{CardRegion, Snapshot};
use crate::surface::{depth, AssetResolver, Ease, Face, PileView, Surface, Ticket, Transform, Tween, TweenTo};
use crate::timeline::{Continuation, Timeline};

/// removed cards shrink to this on their way into a pile
pub const PILE_SCALE: f32 = 0.3;
/// fresh cards leave the deck at half size
const DECK_SPAWN_SCALE: f32 = 0.5;

/// owning region of an entity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityRegion {
    Table,
    Hand(usize),
    Pile(usize),
    /// held by a move pipeline, off the regular grid
    Stage,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub transform: Transform,
    pub face: Face,
    pub region: EntityRegion,
    pub depth: i32,
    /// flying into a pile, destroyed on arrival
    pub leaving: bool,
    /// moved by the pointer; next sync always re-animates it
    pub displaced: bool,
}

/// per-sync inputs that do not belong to the registry
#[derive(Clone, Copy, Debug)]
pub struct SyncContext<'a> {
    pub layout: &'a Layout,
    pub local: usize,
    pub timings: &'a AnimationTimings,
    pub snap: SnapTolerance,
    pub previous: Option<&'a Snapshot>,
    /// a remote move was inferred this cycle; fresh deals wait for it
    pub move_inferred: bool,
}

/// what a sync pass did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub spawned: Vec<CardId>,
    pub moved: Vec<CardId>,
    pub snapped: Vec<CardId>,
    pub removing: Vec<CardId>,
    pub destroyed: Vec<CardId>,
    /// lock-held ids left alone
    pub skipped: Vec<CardId>,
}

impl SyncReport {
    /// nothing moved, spawned or left
    pub fn is_still(&self) -> bool {
        self.spawned.is_empty()
            && self.moved.is_empty()
            && self.snapped.is_empty()
            && self.removing.is_empty()
            && self.destroyed.is_empty()
    }
}

#[derive(Debug)]
pub struct EntityRegistry {
    entities: HashMap<CardId, Entity>,
    assets: AssetResolver,
}

impl EntityRegistry {
    pub fn new(assets: AssetResolver) -> Self {
        Self {
            entities: HashMap::new(),
            assets,
        }
    }

    pub fn get(&self, id: &CardId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// reconcile every unlocked entity with `snapshot`
    pub fn sync<S: Surface + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        locks: &HashSet<CardId>,
        ctx: &SyncContext<'_>,
        surface: &mut S,
        timeline: &mut Timeline,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let count = snapshot.seat_count();
        let mut in_play: HashSet<CardId> = HashSet::new();

        for (ordinal, card) in snapshot.table.iter().enumerate() {
            in_play.insert(card.id.clone());
            if locks.contains(&card.id) {
                report.skipped.push(card.id.clone());
                continue;
            }
            let slot = ctx.layout.table_card(ordinal, snapshot.table.len());
            self.sync_one(card, CardRegion::Table, slot, None, ctx, surface, timeline, &mut report);
        }

        for (seat_idx, seat) in snapshot.seats.iter().enumerate() {
            let was_in_hand = |id: &CardId| {
                ctx.previous
                    .and_then(|p| p.seats.get(seat_idx))
                    .map(|s| s.name == seat.name && s.holds(id))
                    .unwrap_or(false)
            };
            for (ordinal, card) in seat.hand.iter().enumerate() {
                in_play.insert(card.id.clone());
                if locks.contains(&card.id) {
                    report.skipped.push(card.id.clone());
                    continue;
                }
                let slot = ctx.layout.hand_card(seat_idx, ctx.local, count, ordinal, seat.hand.len());
                let delay = if ctx.move_inferred && !was_in_hand(&card.id) {
                    Some(ctx.timings.deal_delay)
                } else {
                    None
                };
                self.sync_one(card, CardRegion::Hand(seat_idx), slot, delay, ctx, surface, timeline, &mut report);
            }
        }

        let mut gone: Vec<CardId> = Vec::new();
        for (id, entity) in &self.entities {
            if in_play.contains(id) {
                continue;
            }
            if locks.contains(id) {
                report.skipped.push(id.clone());
            } else if !entity.leaving {
                gone.push(id.clone());
            }
        }
        gone.sort();

        for id in gone {
            match snapshot.pile_owner(&id) {
                Some(seat) => {
                    let anchor = ctx.layout.seat_anchor(seat, ctx.local, count, SeatRegion::CapturePile);
                    let ticket = timeline.issue(Continuation::Removal(id.clone()));
                    self.send_to_pile(&id, seat, anchor.point(), ctx.timings.removal, ticket, surface);
                    report.removing.push(id);
                }
                None => {
                    tracing::warn!(card = %id, "card left play with no pile to go to, dropping it");
                    self.destroy(&id, surface);
                    report.destroyed.push(id);
                }
            }
        }

        report
    }

    #[allow(clippy::too_many_arguments)]
    fn sync_one<S: Surface + ?Sized>(
        &mut self,
        card: &Card,
        region: CardRegion,
        slot: SlotTransform,
        delay: Option<u64>,
        ctx: &SyncContext<'_>,
        surface: &mut S,
        timeline: &mut Timeline,
        report: &mut SyncReport,
    ) {
        let (face, region, layer) = match region {
            CardRegion::Table => (Face::Up, EntityRegion::Table, depth::TABLE),
            CardRegion::Hand(seat) if seat == ctx.local => (Face::Up, EntityRegion::Hand(seat), depth::HAND),
            CardRegion::Hand(seat) => (Face::Down, EntityRegion::Hand(seat), depth::HAND),
            CardRegion::Captured(seat) => (Face::Down, EntityRegion::Pile(seat), depth::PILE),
        };
        let target = Transform::at(slot.position, slot.rotation, slot.scale);

        if !self.entities.contains_key(&card.id) {
            let from_hidden_hand = region == EntityRegion::Table
                && ctx.previous.map(|p| !p.table_contains(&card.id)).unwrap_or(false);
            let origin = if from_hidden_hand {
                Transform::at(ctx.layout.stage_center(), 0.0, 1.0)
            } else {
                Transform::at(ctx.layout.deck_origin(), 0.0, DECK_SPAWN_SCALE)
            };
            self.spawn(card, face, region, origin, layer, surface);
            report.spawned.push(card.id.clone());
        }

        let assets = &mut self.assets;
        let Some(entity) = self.entities.get_mut(&card.id) else {
            return;
        };

        if entity.leaving {
            // back in play before it reached the pile
            entity.leaving = false;
            let id = card.id.clone();
            timeline.cancel(|c| *c == Continuation::Removal(id.clone()));
        }
        if entity.face != face {
            entity.face = face;
            let visual = assets.visual(card, face, &*surface);
            surface.set_visual(&card.id, &visual);
        }
        if entity.depth != layer {
            entity.depth = layer;
            surface.set_depth(&card.id, layer);
        }
        entity.region = region;

        let close = entity
            .transform
            .near(&target, ctx.snap.position_px, ctx.snap.rotation_deg);
        if close && !entity.displaced {
            if entity.transform != target {
                entity.transform = target;
                surface.place(&card.id, target);
                report.snapped.push(card.id.clone());
            }
            return;
        }

        let mut tween = Tween::new(TweenTo::transform(target), ctx.timings.sync, Ease::CubicOut);
        if let Some(delay) = delay {
            tween = tween.delayed(delay);
        }
        surface.tween(std::slice::from_ref(&card.id), &tween, None);
        entity.transform = target;
        entity.displaced = false;
        report.moved.push(card.id.clone());
    }

    /// create an entity unless one already exists
    pub fn spawn<S: Surface + ?Sized>(
        &mut self,
        card: &Card,
        face: Face,
        region: EntityRegion,
        transform: Transform,
        layer: i32,
        surface: &mut S,
    ) {
        if self.entities.contains_key(&card.id) {
            return;
        }
        let visual = self.assets.visual(card, face, &*surface);
        surface.spawn(&card.id, &visual, transform, layer);
        self.entities.insert(
            card.id.clone(),
            Entity {
                transform,
                face,
                region,
                depth: layer,
                leaving: false,
                displaced: false,
            },
        );
    }

    /// flip to `face`, swapping the visual
    pub fn set_face<S: Surface + ?Sized>(&mut self, card: &Card, face: Face, surface: &mut S) {
        let visual = self.assets.visual(card, face, &*surface);
        if let Some(entity) = self.entities.get_mut(&card.id) {
            entity.face = face;
            surface.set_visual(&card.id, &visual);
        }
    }

    pub fn set_depth<S: Surface + ?Sized>(&mut self, id: &CardId, layer: i32, surface: &mut S) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.depth = layer;
            surface.set_depth(id, layer);
        }
    }

    pub fn set_region(&mut self, id: &CardId, region: EntityRegion) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.region = region;
        }
    }

    /// animate a group, keeping stored transforms in step
    pub fn tween<S: Surface + ?Sized>(&mut self, ids: &[CardId], tween: &Tween, ticket: Option<Ticket>, surface: &mut S) {
        for id in ids {
            if let Some(entity) = self.entities.get_mut(id) {
                let to = &tween.to;
                let t = &mut entity.transform;
                t.position = to.position.unwrap_or(t.position);
                t.rotation = to.rotation.unwrap_or(t.rotation);
                t.scale = to.scale.unwrap_or(t.scale);
                t.opacity = to.opacity.unwrap_or(t.opacity);
            }
        }
        surface.tween(ids, tween, ticket);
    }

    pub fn pulse<S: Surface + ?Sized>(&self, id: &CardId, surface: &mut S) {
        if self.entities.contains_key(id) {
            surface.pulse(id);
        }
    }

    pub fn destroy<S: Surface + ?Sized>(&mut self, id: &CardId, surface: &mut S) {
        if self.entities.remove(id).is_some() {
            surface.destroy(id);
        }
    }

    /// pointer dropped the entity at `at`
    pub fn mark_displaced(&mut self, id: &CardId, at: Point) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.transform.position = at;
            entity.displaced = true;
        }
    }

    /// a removal tween landed
    pub fn finish_removal<S: Surface + ?Sized>(&mut self, id: &CardId, surface: &mut S) {
        if self.entities.get(id).map(|e| e.leaving).unwrap_or(false) {
            self.destroy(id, surface);
        }
    }

    fn send_to_pile<S: Surface + ?Sized>(
        &mut self,
        id: &CardId,
        seat: usize,
        to: Point,
        duration_ms: u64,
        ticket: Ticket,
        surface: &mut S,
    ) {
        surface.pulse(id);
        self.set_depth(id, depth::ANIMATING, surface);
        let tween = Tween::new(
            TweenTo {
                position: Some(to),
                scale: Some(PILE_SCALE),
                opacity: Some(0.0),
                ..Default::default()
            },
            duration_ms,
            Ease::BackIn,
        );
        self.tween(std::slice::from_ref(id), &tween, Some(ticket), surface);
        if let Some(entity) = self.entities.get_mut(id) {
            entity.leaving = true;
            entity.region = EntityRegion::Pile(seat);
        }
    }

    /// capture pile decoration for `seat`
    pub fn pile_view<S: Surface + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        seat: usize,
        local: usize,
        layout: &Layout,
        surface: &S,
    ) -> Option<PileView> {
        let s = snapshot.seats.get(seat)?;
        let anchor = layout.seat_anchor(seat, local, snapshot.seat_count(), SeatRegion::CapturePile);
        let fallback = Card::new(1, Suit::Hearts);
        let markers = (0..s.chkoubas as usize)
            .map(|i| {
                let card = if s.captured_cards.is_empty() {
                    &fallback
                } else {
                    &s.captured_cards[i % s.captured_cards.len()]
                };
                self.assets.face_up(card, surface)
            })
            .collect();
        Some(PileView {
            seat,
            anchor,
            stack_height: s.captured_cards.len().div_ceil(2),
            markers,
        })
    }

    pub fn clear<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        self.entities.clear();
        surface.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnimationTimings, ViewportConfig};
    use crate::snapshot::fixtures::*;
    use crate::surface::recording::RecordingSurface;

    struct Fixture {
        layout: Layout,
        timings: AnimationTimings,
        registry: EntityRegistry,
        surface: RecordingSurface,
        timeline: Timeline,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                layout: Layout::new(ViewportConfig::default()),
                timings: AnimationTimings::default(),
                registry: EntityRegistry::new(AssetResolver::new("card_back")),
                surface: RecordingSurface::new(),
                timeline: Timeline::new(),
            }
        }

        fn sync(&mut self, snap: &Snapshot, prev: Option<&Snapshot>, locks: &HashSet<CardId>) -> SyncReport {
            let ctx = SyncContext {
                layout: &self.layout,
                local: 0,
                timings: &self.timings,
                snap: SnapTolerance::default(),
                previous: prev,
                move_inferred: false,
            };
            self.registry
                .sync(snap, locks, &ctx, &mut self.surface, &mut self.timeline)
        }
    }

    fn two_seats() -> Snapshot {
        snapshot(
            &["7H", "2C"],
            vec![
                seat("Alice", &["1D", "4S"], &[], false),
                seat("Bot", &["3D", "5H", "6C"], &[], true),
            ],
            0,
        )
    }

    #[test]
    fn test_sync_spawns_everything_in_play() {
        let mut f = Fixture::new();
        let report = f.sync(&two_seats(), None, &HashSet::new());
        assert_eq!(report.spawned.len(), 7);
        assert_eq!(report.moved.len(), 7);
        assert_eq!(f.registry.len(), 7);
    }

    #[test]
    fn test_faces_by_region() {
        let mut f = Fixture::new();
        f.sync(&two_seats(), None, &HashSet::new());
        assert_eq!(f.registry.get(&"7H".into()).unwrap().face, Face::Up);
        assert_eq!(f.registry.get(&"1D".into()).unwrap().face, Face::Up);
        assert_eq!(f.registry.get(&"3D".into()).unwrap().face, Face::Down);
    }

    #[test]
    fn test_second_sync_is_still() {
        let mut f = Fixture::new();
        let snap = two_seats();
        f.sync(&snap, None, &HashSet::new());
        f.surface.take_commands();
        let report = f.sync(&snap, Some(&snap), &HashSet::new());
        assert!(report.is_still());
        assert!(f.surface.commands().iter().all(|c| !c.is_movement()));
    }

    #[test]
    fn test_locked_ids_untouched() {
        let mut f = Fixture::new();
        let locks: HashSet<CardId> = ["3D".into(), "7H".into()].into_iter().collect();
        let report = f.sync(&two_seats(), None, &locks);
        let mut skipped = report.skipped.clone();
        skipped.sort();
        assert_eq!(skipped, vec![CardId::from("3D"), CardId::from("7H")]);
        assert!(!f.registry.contains(&"3D".into()));
        assert!(!f.registry.contains(&"7H".into()));
    }

    #[test]
    fn test_new_table_card_spawns_at_stage() {
        let mut f = Fixture::new();
        let prev = two_seats();
        f.sync(&prev, None, &HashSet::new());
        let mut curr = prev.clone();
        curr.table.push(card("9S"));
        f.surface.take_commands();
        f.sync(&curr, Some(&prev), &HashSet::new());
        let spawned = f.surface.commands().iter().find_map(|c| match c {
            crate::surface::recording::Command::Spawn { id, transform, .. } if id.as_str() == "9S" => Some(*transform),
            _ => None,
        });
        assert_eq!(spawned.map(|t| t.position), Some(f.layout.stage_center()));
    }

    #[test]
    fn test_gone_card_flies_to_owner_pile() {
        let mut f = Fixture::new();
        let prev = two_seats();
        f.sync(&prev, None, &HashSet::new());
        let mut curr = prev.clone();
        curr.table.retain(|c| c.id.as_str() != "2C");
        curr.seats[1].captured_cards.push(card("2C"));

        let report = f.sync(&curr, Some(&prev), &HashSet::new());
        assert_eq!(report.removing, vec![CardId::from("2C")]);
        let e = f.registry.get(&"2C".into()).unwrap();
        assert!(e.leaving);
        assert_eq!(e.region, EntityRegion::Pile(1));
        assert_eq!(e.depth, depth::ANIMATING);

        let ticket = f.surface.next_due().unwrap();
        match f.timeline.take(ticket) {
            Some(Continuation::Removal(id)) => f.registry.finish_removal(&id, &mut f.surface),
            other => panic!("unexpected continuation {:?}", other),
        }
        assert!(!f.registry.contains(&"2C".into()));
        assert!(f.surface.entity("2C").is_none());
    }

    #[test]
    fn test_unresolvable_card_destroyed_at_once() {
        let mut f = Fixture::new();
        let prev = two_seats();
        f.sync(&prev, None, &HashSet::new());
        let mut curr = prev.clone();
        curr.table.clear();
        let report = f.sync(&curr, Some(&prev), &HashSet::new());
        assert_eq!(report.destroyed.len(), 2);
        assert!(f.timeline.is_empty());
    }

    #[test]
    fn test_displaced_card_snaps_back() {
        let mut f = Fixture::new();
        let snap = two_seats();
        f.sync(&snap, None, &HashSet::new());
        let home = f.registry.get(&"1D".into()).unwrap().transform;
        f.registry.mark_displaced(&"1D".into(), Point::new(home.position.x + 0.2, home.position.y));
        let report = f.sync(&snap, Some(&snap), &HashSet::new());
        assert_eq!(report.moved, vec![CardId::from("1D")]);
        assert_eq!(f.registry.get(&"1D".into()).unwrap().transform, home);
    }

    #[test]
    fn test_pile_view_markers() {
        let mut f = Fixture::new();
        let mut snap = two_seats();
        snap.seats[1].captured_cards = cards(&["7S", "8S", "9S"]);
        snap.seats[1].chkoubas = 2;
        snap.seats[0].chkoubas = 1;

        let bot = f.registry.pile_view(&snap, 1, 0, &f.layout, &f.surface).unwrap();
        assert_eq!(bot.stack_height, 2);
        assert_eq!(bot.markers.len(), 2);

        let alice = f.registry.pile_view(&snap, 0, 0, &f.layout, &f.surface).unwrap();
        assert_eq!(alice.stack_height, 0);
        assert_eq!(
            alice.markers[0],
            crate::surface::Visual::Placeholder {
                label: "A♥".into(),
                face: Face::Up
            }
        );
    }
}
