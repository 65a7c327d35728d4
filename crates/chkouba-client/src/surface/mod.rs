//! surface - the drawing seam
//!
//! the client core never draws. it drives a [`Surface`] with primitive
//! commands on card entities (spawn, place, tween, destroy) plus a few
//! table decorations, and receives completions back as tickets.
//!
//! a ticketed tween or timer must eventually be reported back through
//! `Client::on_complete`, exactly once, even when its duration is zero.

pub mod recording;

use std::collections::HashMap;

use crate::card::{Card, CardId};
use crate::hud::HudView;
use crate::layout::{Anchor, Point};

/// completion handle for a tween group or a timer
pub type Ticket = u64;

/// draw order
pub mod depth {
    pub const PILE: i32 = 5;
    pub const TABLE: i32 = 10;
    pub const HAND: i32 = 20;
    pub const ANIMATING: i32 = 100;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Point,
    /// degrees, clockwise
    pub rotation: f32,
    pub scale: f32,
    pub opacity: f32,
}

impl Transform {
    pub fn at(position: Point, rotation: f32, scale: f32) -> Self {
        Self {
            position,
            rotation,
            scale,
            opacity: 1.0,
        }
    }

    /// within snapping distance of `other`
    pub fn near(&self, other: &Transform, position_px: f32, rotation_deg: f32) -> bool {
        self.position.distance(&other.position) <= position_px
            && angle_delta(self.rotation, other.rotation) <= rotation_deg
            && (self.scale - other.scale).abs() <= 1e-3
            && (self.opacity - other.opacity).abs() <= 1e-3
    }
}

/// smallest absolute difference between two angles, degrees
pub fn angle_delta(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ease {
    Linear,
    CubicOut,
    BackOut,
    BackIn,
}

/// tween target; unset fields keep their current value
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TweenTo {
    pub position: Option<Point>,
    pub rotation: Option<f32>,
    pub scale: Option<f32>,
    /// horizontal scale only, for the flip
    pub scale_x: Option<f32>,
    pub opacity: Option<f32>,
}

impl TweenTo {
    pub fn transform(t: Transform) -> Self {
        Self {
            position: Some(t.position),
            rotation: Some(t.rotation),
            scale: Some(t.scale),
            scale_x: None,
            opacity: Some(t.opacity),
        }
    }

    pub fn position(p: Point) -> Self {
        Self {
            position: Some(p),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    pub to: TweenTo,
    pub duration_ms: u64,
    pub delay_ms: u64,
    pub ease: Ease,
}

impl Tween {
    pub fn new(to: TweenTo, duration_ms: u64, ease: Ease) -> Self {
        Self {
            to,
            duration_ms,
            delay_ms: 0,
            ease,
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn total_ms(&self) -> u64 {
        self.delay_ms.saturating_add(self.duration_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    Up,
    Down,
}

/// what an entity shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Visual {
    /// loaded texture
    Image(String),
    /// no texture for this key: plain rectangle with a text label
    Placeholder { label: String, face: Face },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// the local seat just got the turn
    YourTurn,
}

/// capture pile decoration for one seat
#[derive(Clone, Debug, PartialEq)]
pub struct PileView {
    pub seat: usize,
    pub anchor: Anchor,
    /// number of stacked card backs
    pub stack_height: usize,
    /// one face-up card per chkouba
    pub markers: Vec<Visual>,
}

/// rendering backend
pub trait Surface {
    /// whether a texture is loaded under `key`
    fn has_texture(&self, key: &str) -> bool;

    fn spawn(&mut self, id: &CardId, visual: &Visual, transform: Transform, depth: i32);

    fn set_visual(&mut self, id: &CardId, visual: &Visual);

    fn set_depth(&mut self, id: &CardId, depth: i32);

    /// jump to `transform` without animating
    fn place(&mut self, id: &CardId, transform: Transform);

    /// animate a group of entities; `ticket` completes once for the group
    fn tween(&mut self, ids: &[CardId], tween: &Tween, ticket: Option<Ticket>);

    /// short highlight flash
    fn pulse(&mut self, id: &CardId);

    fn destroy(&mut self, id: &CardId);

    fn start_timer(&mut self, delay_ms: u64, ticket: Ticket);

    fn draw_pile(&mut self, pile: &PileView);

    fn move_turn_marker(&mut self, seat: usize, anchor: &Anchor);

    fn play_cue(&mut self, cue: Cue);

    fn update_hud(&mut self, hud: &HudView);

    /// drop every entity and decoration
    fn clear(&mut self);
}

/// decides texture vs placeholder once per key
#[derive(Debug)]
pub struct AssetResolver {
    back_key: String,
    probed: HashMap<String, bool>,
}

impl AssetResolver {
    pub fn new(back_key: impl Into<String>) -> Self {
        Self {
            back_key: back_key.into(),
            probed: HashMap::new(),
        }
    }

    fn available<S: Surface + ?Sized>(&mut self, key: &str, surface: &S) -> bool {
        if let Some(hit) = self.probed.get(key) {
            return *hit;
        }
        let hit = surface.has_texture(key);
        if !hit {
            tracing::debug!(key, "texture missing, using placeholder");
        }
        self.probed.insert(key.to_string(), hit);
        hit
    }

    pub fn face_up<S: Surface + ?Sized>(&mut self, card: &Card, surface: &S) -> Visual {
        let key = card.texture_key();
        if self.available(&key, surface) {
            Visual::Image(key)
        } else {
            Visual::Placeholder {
                label: card.label(),
                face: Face::Up,
            }
        }
    }

    pub fn face_down<S: Surface + ?Sized>(&mut self, surface: &S) -> Visual {
        let key = self.back_key.clone();
        if self.available(&key, surface) {
            Visual::Image(key)
        } else {
            Visual::Placeholder {
                label: String::new(),
                face: Face::Down,
            }
        }
    }

    pub fn visual<S: Surface + ?Sized>(&mut self, card: &Card, face: Face, surface: &S) -> Visual {
        match face {
            Face::Up => self.face_up(card, surface),
            Face::Down => self.face_down(surface),
        }
    }
}
