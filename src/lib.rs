//! Wizard Arena - simulation core of a top-down arena shooter
//!
//! Core modules:
//! - `sim`: Frame-stepped entity simulation (pools, physics, collisions, render buffers)
//! - `tunables`: Slider-tuned parameters and construction-time configuration
//! - `error`: Error taxonomy shared by every pool
//!
//! Rendering, windowing and input polling are external collaborators: the core
//! consumes per-frame scalars and produces flat `Pod` buffers.

pub mod error;
pub mod sim;
pub mod tunables;

pub use error::SimError;
pub use tunables::{SimConfig, Tunables};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed frame step used by the headless driver and tests
    pub const FRAME_DT: f32 = 1.0 / 60.0;

    /// Arena dimensions (world units)
    pub const ARENA_WIDTH: f32 = 23.0;
    pub const ARENA_HEIGHT: f32 = 13.0;

    /// Pool capacities
    pub const MAX_PROJECTILES: usize = 255;
    pub const MAX_ENEMIES: usize = 255;
    pub const MAX_PORTAL_PAIRS: usize = 16;
    pub const MAX_BUTTONS: usize = 32;

    /// Render row widths (floats)
    pub const SLIM_ROW_FLOATS: usize = 8;
    pub const WIDE_ROW_FLOATS: usize = 12;

    /// Damage dealt by one projectile hit
    pub const HIT_DAMAGE: f32 = 5.0;

    /// Added to separation distances before normalizing
    pub const SEPARATION_EPSILON: f32 = 1e-4;

    /// Cap on `separation_rate * dt`; a pair closes four times this share of
    /// its overlap per frame
    pub const MAX_SEPARATION_STEP: f32 = 0.25;
}

/// Unit heading along `delta`, measured with `atan2(dx, dy)`.
///
/// The angle is taken from the +y axis toward +x (screen convention), so the
/// result is `(sin a, cos a)`. A zero delta yields `(0, 1)`.
#[inline]
pub fn heading(delta: Vec2) -> Vec2 {
    let angle = delta.x.atan2(delta.y);
    Vec2::new(angle.sin(), angle.cos())
}

/// Unit direction from `from` toward `to`
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    heading(to - from)
}

/// Vector pointing from `b` to `a`
#[inline]
pub fn vector_between(a: Vec2, b: Vec2) -> Vec2 {
    a - b
}

/// Rescale `vel` to exactly `max` keeping its angle
#[inline]
pub fn cap_velocity(vel: Vec2, max: f32) -> Vec2 {
    let angle = vel.y.atan2(vel.x);
    Vec2::new(angle.cos() * max, angle.sin() * max)
}

/// Circle overlap test between a small body (`a`, radius `a_scale / 3`) and a
/// larger one (`b`, radius `b_scale / 2`).
///
/// `overlap` shrinks the threshold in proportion to the radius ratio, so a
/// positive value demands deeper penetration before reporting a hit.
pub fn circles_overlap(a: Vec2, a_scale: f32, b: Vec2, b_scale: f32, overlap: f32) -> bool {
    let ra = a_scale / 3.0;
    let rb = b_scale / 2.0;
    a.distance(b) <= (ra + rb) * (1.0 - overlap * (ra / rb))
}

/// Whether `entity` sees a player of `player_scale` at `player` given its range
#[inline]
pub fn in_awareness_range(player: Vec2, player_scale: f32, entity: Vec2, range: f32) -> bool {
    player.distance(entity) <= player_scale / 3.0 + range / 2.0
}

/// Clamp `pos` into `±bounds` inset by `half`, zeroing velocity on each clamped
/// axis (an inelastic stop, not a bounce)
pub fn clamp_to_bounds(pos: &mut Vec2, vel: &mut Vec2, bounds: Vec2, half: f32) {
    let min = -bounds + half;
    let max = bounds - half;
    if pos.x < min.x {
        pos.x = min.x;
        vel.x = 0.0;
    } else if pos.x > max.x {
        pos.x = max.x;
        vel.x = 0.0;
    }
    if pos.y < min.y {
        pos.y = min.y;
        vel.y = 0.0;
    } else if pos.y > max.y {
        pos.y = max.y;
        vel.y = 0.0;
    }
}
