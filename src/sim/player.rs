//! The player: input-driven movement, facing and fire cooldown

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::portals::PortalManager;
use super::projectiles::Projectile;
use super::render::{WideInstance, colors};
use crate::tunables::{SimConfig, Tunables};
use crate::{cap_velocity, clamp_to_bounds};

/// Normalizes diagonal movement to axis-aligned speed
pub const DIAG_MOVE_MULTIPLIER: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Which way the player shoots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Down,
    Up,
    Left,
    Right,
}

impl Facing {
    /// Tie-break order when several fire keys go down on the same frame
    pub const ORDER: [Facing; 4] = [Facing::Down, Facing::Up, Facing::Left, Facing::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn direction(self) -> Vec2 {
        match self {
            Facing::Down => Vec2::NEG_Y,
            Facing::Up => Vec2::Y,
            Facing::Left => Vec2::NEG_X,
            Facing::Right => Vec2::X,
        }
    }
}

/// Held-key state for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldKeys {
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub fire_up: bool,
    pub fire_down: bool,
    pub fire_left: bool,
    pub fire_right: bool,
}

impl HeldKeys {
    pub fn fire(&self, facing: Facing) -> bool {
        match facing {
            Facing::Down => self.fire_down,
            Facing::Up => self.fire_up,
            Facing::Left => self.fire_left,
            Facing::Right => self.fire_right,
        }
    }

    /// Convenience: hold a single fire key
    pub fn firing(facing: Facing) -> Self {
        let mut keys = Self::default();
        match facing {
            Facing::Down => keys.fire_down = true,
            Facing::Up => keys.fire_up = true,
            Facing::Left => keys.fire_left = true,
            Facing::Right => keys.fire_right = true,
        }
        keys
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub scale: f32,
    pub color: [f32; 4],
    pub max_health: f32,
    pub max_shield: f32,
    pub health: f32,
    pub shield: f32,
    pub facing: Facing,
    /// Fire keys held on the previous frame, indexed by `Facing::index`
    held_fire: [bool; 4],
    /// Earliest time of the next shot
    pub next_shot_at: f32,
    /// Earliest time the player may use a portal again
    pub next_portal_at: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            scale: 3.0,
            color: colors::WHITE,
            max_health: 100.0,
            max_shield: 100.0,
            health: 100.0,
            shield: 100.0,
            facing: Facing::default(),
            held_fire: [false; 4],
            next_shot_at: 0.0,
            next_portal_at: 0.0,
        }
    }

    /// Apply movement input, speed limits and decay, then integrate.
    ///
    /// Acceleration and decay are per-frame quantities; only the position
    /// step scales with `dt`.
    pub fn handle_movement(&mut self, keys: &HeldKeys, tunables: &Tunables, dt: f32) {
        let moving_y = keys.move_up || keys.move_down;
        let moving_x = keys.move_left || keys.move_right;
        let multiplier = if moving_x && moving_y { DIAG_MOVE_MULTIPLIER } else { 1.0 };
        let accel = tunables.base_acceleration * multiplier;

        let ax = if !moving_x { 0.0 } else if keys.move_right { accel } else { -accel };
        let ay = if !moving_y { 0.0 } else if keys.move_up { accel } else { -accel };
        self.vel += Vec2::new(ax, ay);

        let speed = self.vel.length();
        if speed > tunables.max_velocity {
            self.vel = cap_velocity(self.vel, tunables.max_velocity);
        }
        if speed < tunables.min_velocity && !(moving_x || moving_y) {
            self.vel = Vec2::ZERO;
        }

        self.vel *= 1.0 - tunables.decay_rate;
        self.pos += self.vel * dt;
    }

    /// Track fire keys and return a projectile if the cooldown allows a shot.
    ///
    /// A key that was not held last frame turns the player to face it; when
    /// several go down together the first in `Facing::ORDER` wins.
    pub fn handle_firing(
        &mut self,
        keys: &HeldKeys,
        now: f32,
        tunables: &Tunables,
        config: &SimConfig,
    ) -> Option<Projectile> {
        let mut pressed = [false; 4];
        for facing in Facing::ORDER {
            pressed[facing.index()] = keys.fire(facing);
        }
        let newly_pressed = Facing::ORDER
            .into_iter()
            .find(|f| pressed[f.index()] && !self.held_fire[f.index()]);
        self.held_fire = pressed;

        if !pressed.contains(&true) {
            return None;
        }
        if let Some(facing) = newly_pressed {
            self.facing = facing;
        }
        if self.next_shot_at >= now {
            return None;
        }
        self.next_shot_at = now + 1.0 / tunables.fire_rate.max(f32::EPSILON);

        let speed = config.player_projectile_speed * tunables.projectile_speed_multiplier;
        Some(Projectile::new(
            self.pos,
            self.facing.direction() * speed + self.vel,
            tunables.range,
            config.player_projectile_scale,
            tunables.projectile_decay_rate,
            config.player_projectile_color,
            now,
        ))
    }

    /// Keep the player inside `±bounds`, stopping on the clamped axis
    pub fn clamp_to(&mut self, bounds: Vec2) {
        clamp_to_bounds(&mut self.pos, &mut self.vel, bounds, self.scale / 2.0);
    }

    /// Jump to the companion portal when touching one and off cooldown.
    ///
    /// Returns whether the player moved.
    pub fn teleport_through(&mut self, portals: &PortalManager, now: f32, cooldown: f32, slack: f32) -> bool {
        if self.next_portal_at >= now {
            return false;
        }
        let hits = portals.check_collisions(self.pos, self.scale / 3.0, slack);
        let Some(dest) = hits.first().and_then(|&id| portals.destination(id)) else {
            return false;
        };
        self.pos = dest;
        self.next_portal_at = now + cooldown;
        true
    }

    pub fn pack(&self) -> WideInstance {
        WideInstance {
            position: self.pos.to_array(),
            scale: self.scale,
            tag: self.facing.index() as f32,
            color: self.color,
            health: [self.max_health, self.max_shield, self.health, self.shield],
        }
    }
}
