//! sequencer - choreography for inferred remote moves
//!
//! each move becomes a pipeline: an explicit list of [`Stage`]s advanced
//! one at a time by ticket completions. every id a pipeline touches is in
//! the lock set from `begin` until the pipeline finishes, and ordinary
//! sync leaves locked ids alone.
//!
//! ```text
//! present -> [flip out -> flip in] -> hold -> capture: highlight -> contact -> gather -> collect
//!                                          -> drop:    drop
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::card::CardId;
use crate::config::AnimationTimings;
use crate::diff::RemoteMove;
use crate::layout::{Layout, SeatRegion};
use crate::protocol::ClientMessage;
use crate::registry::{EntityRegion, EntityRegistry, PILE_SCALE};
use crate::snapshot::Snapshot;
use crate::surface::{depth, Ease, Face, Surface, Transform, Tween, TweenTo};
use crate::timeline::{Continuation, PipelineId, Timeline};

/// remote hand cards are drawn at this scale
const REMOTE_SPAWN_SCALE: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// played card travels to the stage point
    Present,
    /// first half of the reveal, scale x to zero
    FlipOut,
    /// face swapped, scale x back to one
    FlipIn,
    Hold,
    /// captured cards pulse
    Highlight,
    /// played card touches down at table center
    Contact,
    Gather,
    /// everything flies into the capturing pile and is destroyed
    Collect,
    /// played card settles into its table slot
    Drop,
}

/// everything a stage may touch, borrowed from the client for one call
pub struct Scene<'a, S: Surface + ?Sized> {
    pub layout: &'a Layout,
    pub timings: &'a AnimationTimings,
    pub local: usize,
    /// latest snapshot, used to place drops and piles
    pub snapshot: &'a Snapshot,
    pub registry: &'a mut EntityRegistry,
    pub surface: &'a mut S,
    pub timeline: &'a mut Timeline,
    pub outbound: &'a mut Vec<ClientMessage>,
}

#[derive(Clone, Debug)]
struct Pipeline {
    mv: RemoteMove,
    stages: Vec<Stage>,
    /// index of the running stage; `None` while waiting for a conflicting pipeline
    step: Option<usize>,
}

impl Pipeline {
    fn ids(&self) -> impl Iterator<Item = &CardId> {
        self.mv.ids()
    }
}

#[derive(Debug, Default)]
pub struct AnimationSequencer {
    next: PipelineId,
    pipelines: BTreeMap<PipelineId, Pipeline>,
    locks: HashSet<CardId>,
}

impl AnimationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// ids under animated control
    pub fn locks(&self) -> &HashSet<CardId> {
        &self.locks
    }

    pub fn is_locked(&self, id: &CardId) -> bool {
        self.locks.contains(id)
    }

    pub fn is_idle(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn running(&self) -> usize {
        self.pipelines.len()
    }

    /// seat of the oldest pipeline still animating
    pub fn in_flight_seat(&self) -> Option<usize> {
        self.pipelines.values().next().map(|p| p.mv.seat_index)
    }

    /// lock the move's ids and start its first stage.
    ///
    /// a move that shares an id with a running pipeline holds its locks
    /// but waits until that pipeline is done.
    pub fn begin<S: Surface + ?Sized>(&mut self, mv: RemoteMove, scene: &mut Scene<'_, S>) -> PipelineId {
        self.next += 1;
        let id = self.next;
        let conflict = mv.ids().any(|c| self.locks.contains(c));

        tracing::debug!(
            pipeline = id,
            seat = mv.seat_index,
            played = %mv.played.id,
            captured = mv.captured.len(),
            waiting = conflict,
            "move pipeline begins"
        );

        self.locks.extend(mv.ids().cloned());
        self.pipelines.insert(
            id,
            Pipeline {
                mv,
                stages: Vec::new(),
                step: None,
            },
        );
        if !conflict {
            self.start(id, scene);
        }
        id
    }

    /// a stage ticket completed. returns true when the pipeline finished
    /// and released its locks.
    pub fn advance<S: Surface + ?Sized>(&mut self, pipeline: PipelineId, step: usize, scene: &mut Scene<'_, S>) -> bool {
        let Some(p) = self.pipelines.get(&pipeline) else {
            return false;
        };
        if p.step != Some(step) {
            tracing::debug!(pipeline, step, "stale stage completion");
            return false;
        }
        let stage = p.stages[step];
        let mv = p.mv.clone();
        let total = p.stages.len();

        self.finish_stage(stage, &mv, scene);

        if step + 1 < total {
            if let Some(p) = self.pipelines.get_mut(&pipeline) {
                p.step = Some(step + 1);
            }
            self.start_stage(pipeline, step + 1, scene);
            return false;
        }

        self.pipelines.remove(&pipeline);
        self.refresh_locks();
        scene.outbound.push(ClientMessage::AnimationComplete);
        tracing::debug!(pipeline, played = %mv.played.id, "move pipeline complete");

        let ready: Vec<PipelineId> = self
            .pipelines
            .iter()
            .filter(|(_, p)| p.step.is_none())
            .map(|(id, _)| *id)
            .collect();
        for id in ready {
            if !self.conflicts_with_running(id) {
                self.start(id, scene);
            }
        }
        true
    }

    /// queue a delayed acknowledgement for an ai seat nobody is animating
    pub fn schedule_nudge<S: Surface + ?Sized>(&self, inferred: bool, scene: &mut Scene<'_, S>) -> bool {
        let snap = scene.snapshot;
        let Some(current) = snap.current_seat() else {
            return false;
        };
        let wanted = current.is_ai
            && snap.current_seat_index != scene.local
            && !snap.round_finished
            && !snap.game_over
            && self.is_idle()
            && !inferred;
        if !wanted || scene.timeline.has(|c| *c == Continuation::AutoAck) {
            return false;
        }
        let ticket = scene.timeline.issue(Continuation::AutoAck);
        scene.surface.start_timer(scene.timings.auto_ack, ticket);
        true
    }

    pub fn clear(&mut self) {
        self.pipelines.clear();
        self.locks.clear();
    }

    fn refresh_locks(&mut self) {
        self.locks = self
            .pipelines
            .values()
            .flat_map(|p| p.ids().cloned())
            .collect();
    }

    fn conflicts_with_running(&self, id: PipelineId) -> bool {
        let Some(candidate) = self.pipelines.get(&id) else {
            return false;
        };
        let ids: HashSet<&CardId> = candidate.ids().collect();
        self.pipelines
            .iter()
            .filter(|(other, p)| **other != id && p.step.is_some())
            .any(|(_, p)| p.ids().any(|c| ids.contains(c)))
    }

    fn start<S: Surface + ?Sized>(&mut self, pipeline: PipelineId, scene: &mut Scene<'_, S>) {
        let Some(p) = self.pipelines.get_mut(&pipeline) else {
            return;
        };
        let mv = &p.mv;
        let count = scene.snapshot.seat_count().max(mv.seat_index + 1);

        if !scene.registry.contains(&mv.played.id) {
            let hand = scene
                .layout
                .seat_anchor(mv.seat_index, scene.local, count, SeatRegion::Hand);
            scene.registry.spawn(
                &mv.played,
                Face::Down,
                EntityRegion::Stage,
                Transform::at(hand.point(), hand.rotation, REMOTE_SPAWN_SCALE),
                depth::ANIMATING,
                scene.surface,
            );
        }
        let face_down = scene
            .registry
            .get(&mv.played.id)
            .map(|e| e.face == Face::Down)
            .unwrap_or(true);

        let mut stages = vec![Stage::Present];
        if face_down {
            stages.extend([Stage::FlipOut, Stage::FlipIn]);
        }
        stages.push(Stage::Hold);
        if mv.is_capture() {
            stages.extend([Stage::Highlight, Stage::Contact, Stage::Gather, Stage::Collect]);
        } else {
            stages.push(Stage::Drop);
        }
        p.stages = stages;
        p.step = Some(0);
        self.start_stage(pipeline, 0, scene);
    }

    fn start_stage<S: Surface + ?Sized>(&self, pipeline: PipelineId, step: usize, scene: &mut Scene<'_, S>) {
        let Some(p) = self.pipelines.get(&pipeline) else {
            return;
        };
        let stage = p.stages[step];
        let mv = &p.mv;
        let played = std::slice::from_ref(&mv.played.id);
        let t = scene.timings;
        let ticket = scene.timeline.issue(Continuation::Stage { pipeline, step });

        match stage {
            Stage::Present => {
                scene.registry.set_depth(&mv.played.id, depth::ANIMATING, scene.surface);
                scene.registry.set_region(&mv.played.id, EntityRegion::Stage);
                let to = TweenTo {
                    position: Some(scene.layout.stage_center()),
                    rotation: Some(0.0),
                    scale: Some(1.0),
                    opacity: Some(1.0),
                    ..Default::default()
                };
                let tween = Tween::new(to, t.present, Ease::CubicOut);
                scene.registry.tween(played, &tween, Some(ticket), scene.surface);
            }
            Stage::FlipOut => {
                let to = TweenTo {
                    scale_x: Some(0.0),
                    ..Default::default()
                };
                let tween = Tween::new(to, t.flip_half, Ease::Linear);
                scene.registry.tween(played, &tween, Some(ticket), scene.surface);
            }
            Stage::FlipIn => {
                scene.registry.set_face(&mv.played, Face::Up, scene.surface);
                let to = TweenTo {
                    scale_x: Some(1.0),
                    ..Default::default()
                };
                let tween = Tween::new(to, t.flip_half, Ease::Linear);
                scene.registry.tween(played, &tween, Some(ticket), scene.surface);
            }
            Stage::Hold => scene.surface.start_timer(t.hold, ticket),
            Stage::Highlight => {
                for id in &mv.captured {
                    scene.registry.pulse(id, scene.surface);
                }
                scene.surface.start_timer(t.highlight, ticket);
            }
            Stage::Contact => {
                let tween = Tween::new(TweenTo::position(scene.layout.table_center()), t.contact, Ease::BackOut);
                scene.registry.tween(played, &tween, Some(ticket), scene.surface);
            }
            Stage::Gather => scene.surface.start_timer(t.gather, ticket),
            Stage::Collect => {
                let count = scene.snapshot.seat_count().max(mv.seat_index + 1);
                let pile = scene
                    .layout
                    .seat_anchor(mv.seat_index, scene.local, count, SeatRegion::CapturePile);
                let group: Vec<CardId> = mv
                    .ids()
                    .filter(|id| scene.registry.contains(id))
                    .cloned()
                    .collect();
                for id in &group {
                    scene.registry.set_depth(id, depth::ANIMATING, scene.surface);
                }
                let to = TweenTo {
                    position: Some(pile.point()),
                    scale: Some(PILE_SCALE),
                    opacity: Some(0.0),
                    ..Default::default()
                };
                let tween = Tween::new(to, t.collect, Ease::BackIn);
                scene.registry.tween(&group, &tween, Some(ticket), scene.surface);
            }
            Stage::Drop => {
                let snap = scene.snapshot;
                let slot = match snap.table_ordinal(&mv.played.id) {
                    Some(ordinal) => scene.layout.table_card(ordinal, snap.table.len()),
                    None => scene.layout.table_card(0, 1),
                };
                let to = TweenTo::transform(Transform::at(slot.position, slot.rotation, slot.scale));
                let tween = Tween::new(to, t.drop, Ease::CubicOut);
                scene.registry.tween(played, &tween, Some(ticket), scene.surface);
            }
        }
    }

    fn finish_stage<S: Surface + ?Sized>(&self, stage: Stage, mv: &RemoteMove, scene: &mut Scene<'_, S>) {
        match stage {
            Stage::Collect => {
                for id in mv.ids() {
                    scene.registry.destroy(id, scene.surface);
                }
            }
            Stage::Drop => {
                scene.registry.set_depth(&mv.played.id, depth::TABLE, scene.surface);
                scene.registry.set_region(&mv.played.id, EntityRegion::Table);
            }
            _ => {}
        }
    }
}
