//! layout - seat rotation and card placement
//!
//! pure functions of (viewport, seat indices). the local seat is always
//! drawn at the bottom; other seats are placed by their distance from it
//! in turn order, going right, top, left.
//!
//! rotations are in degrees, clockwise positive (screen y grows down).
//! a seat's rotation turns its cards to face the table center: bottom 0,
//! right -90, top 180, left 90.

use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;

/// fan step between adjacent local hand cards, degrees
const LOCAL_FAN_STEP: f32 = 8.0;
/// tilt step between adjacent remote hand cards, degrees
const REMOTE_FAN_STEP: f32 = 5.0;
/// remote hands are drawn smaller than the local one
const REMOTE_HAND_SCALE: f32 = 0.7;
/// where fresh cards come from before they travel to their slot
pub const DECK_ORIGIN: Point = Point { x: 60.0, y: 220.0 };

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// offset (dx, dy) given in a frame rotated by `degrees`
    fn offset_rotated(&self, dx: f32, dy: f32, degrees: f32) -> Point {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point {
            x: self.x + dx * cos - dy * sin,
            y: self.y + dx * sin + dy * cos,
        }
    }
}

/// seat-relative region an anchor is computed for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeatRegion {
    Hand,
    NamePlate,
    CapturePile,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub region: SeatRegion,
}

impl Anchor {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// where a seat sits relative to the local seat
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeatPosition {
    Bottom,
    Right,
    Top,
    Left,
    /// any other seat count: angle on the table ellipse, degrees
    Arc(f32),
}

impl SeatPosition {
    /// angle on the table ellipse, 90 = bottom, 0 = right
    fn ellipse_angle(&self) -> f32 {
        match self {
            Self::Bottom => 90.0,
            Self::Right => 0.0,
            Self::Top => -90.0,
            Self::Left => -180.0,
            Self::Arc(angle) => *angle,
        }
    }

    pub fn rotation(&self) -> f32 {
        normalize_degrees(self.ellipse_angle() - 90.0)
    }
}

/// distance from the local seat in turn order
pub fn relative_seat(target: usize, local: usize, seat_count: usize) -> usize {
    if seat_count == 0 {
        return 0;
    }
    (target % seat_count + seat_count - local % seat_count) % seat_count
}

pub fn seat_position(target: usize, local: usize, seat_count: usize) -> SeatPosition {
    let relative = relative_seat(target, local, seat_count);
    if relative == 0 {
        return SeatPosition::Bottom;
    }
    match seat_count {
        // the only other seat always sits across the table
        2 => SeatPosition::Top,
        4 => match relative {
            1 => SeatPosition::Right,
            2 => SeatPosition::Top,
            _ => SeatPosition::Left,
        },
        n => SeatPosition::Arc(90.0 - relative as f32 * 360.0 / n as f32),
    }
}

/// map into (-180, 180]
fn normalize_degrees(deg: f32) -> f32 {
    let mut d = deg % 360.0;
    if d <= -180.0 {
        d += 360.0;
    } else if d > 180.0 {
        d -= 360.0;
    }
    d
}

/// target transform of a card slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotTransform {
    pub position: Point,
    pub rotation: f32,
    pub scale: f32,
}

/// card and mat sizes derived from the viewport
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub table_card_w: f32,
    pub hand_card_w: f32,
    pub mat_w: f32,
}

impl Layout {
    pub fn new(viewport: ViewportConfig) -> Self {
        let width = viewport.width;
        Self {
            width,
            height: viewport.height,
            table_card_w: (width * 0.14).min(80.0),
            hand_card_w: (width * 0.22).min(120.0),
            mat_w: (width * 0.85).min(800.0),
        }
    }

    pub fn hand_card_h(&self) -> f32 {
        self.hand_card_w * 1.5
    }

    pub fn table_card_h(&self) -> f32 {
        self.table_card_w * 1.5
    }

    /// entities are sized for a hand card; table cards are drawn smaller
    pub fn table_scale(&self) -> f32 {
        self.table_card_w / self.hand_card_w
    }

    pub fn table_center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// where a remote move is shown before it resolves
    pub fn stage_center(&self) -> Point {
        Point::new(self.width / 2.0, self.height * 0.35)
    }

    pub fn deck_origin(&self) -> Point {
        DECK_ORIGIN
    }

    pub fn seat_anchor(&self, target: usize, local: usize, seat_count: usize, region: SeatRegion) -> Anchor {
        let position = seat_position(target, local, seat_count);
        let angle = position.ellipse_angle().to_radians();
        let inset = self.hand_card_h() * 0.6;
        let rx = (self.width / 2.0 - inset).max(0.0);
        let ry = (self.height / 2.0 - inset).max(0.0);
        let center = self.table_center();
        let hand = Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin());
        let rotation = position.rotation();

        let point = match region {
            SeatRegion::Hand => hand,
            SeatRegion::NamePlate => hand.offset_rotated(-self.hand_card_w * 1.4, 0.0, rotation),
            SeatRegion::CapturePile => {
                let p = hand.offset_rotated(self.mat_w / 2.0 + 50.0, -self.hand_card_h() * 0.9, rotation);
                self.clamp(p, self.hand_card_w * REMOTE_HAND_SCALE / 2.0)
            }
        };

        Anchor {
            x: point.x,
            y: point.y,
            rotation,
            region,
        }
    }

    /// evenly spaced, horizontally centered, squeezed to fit the mat
    pub fn table_slot(&self, ordinal: usize, total: usize) -> Point {
        let total = total.max(1);
        let mut spacing = self.table_card_w * 1.1;
        let room = (self.mat_w - self.table_card_w).max(0.0);
        if total > 1 && spacing * (total - 1) as f32 > room {
            spacing = room / (total - 1) as f32;
        }
        let span = spacing * (total - 1) as f32;
        let start = self.width / 2.0 - span / 2.0;
        Point::new(start + ordinal as f32 * spacing, self.height / 2.0)
    }

    pub fn table_card(&self, ordinal: usize, total: usize) -> SlotTransform {
        SlotTransform {
            position: self.table_slot(ordinal, total),
            rotation: 0.0,
            scale: self.table_scale(),
        }
    }

    /// slot of the `ordinal`-th of `total` cards in a seat's hand
    pub fn hand_card(&self, target: usize, local: usize, seat_count: usize, ordinal: usize, total: usize) -> SlotTransform {
        let anchor = self.seat_anchor(target, local, seat_count, SeatRegion::Hand);
        let offset = ordinal as f32 - (total.max(1) - 1) as f32 / 2.0;

        if target == local {
            let a = (offset * LOCAL_FAN_STEP).to_radians();
            let radius = self.hand_card_h() * 1.5;
            let position = anchor
                .point()
                .offset_rotated(radius * 1.2 * a.sin(), radius * (1.0 - a.cos()), anchor.rotation);
            SlotTransform {
                position,
                rotation: anchor.rotation + offset * LOCAL_FAN_STEP,
                scale: 1.0,
            }
        } else {
            let position = anchor
                .point()
                .offset_rotated(offset * self.hand_card_w * 0.5, 0.0, anchor.rotation);
            SlotTransform {
                position,
                rotation: anchor.rotation - offset * REMOTE_FAN_STEP,
                scale: REMOTE_HAND_SCALE,
            }
        }
    }

    fn clamp(&self, p: Point, margin: f32) -> Point {
        let max_x = (self.width - margin).max(margin);
        let max_y = (self.height - margin).max(margin);
        Point::new(p.x.clamp(margin, max_x), p.y.clamp(margin, max_y))
    }
}
