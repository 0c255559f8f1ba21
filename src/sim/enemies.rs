//! Enemy pool: aggro, steering, separation, wall clamping and volley fire
//!
//! Variant behavior is data only: an `EnemyKind` selects a constant
//! `EnemyStats` table that seeds the row at spawn time.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::{SlotId, SlotPool};
use super::portals::PortalTraveler;
use super::projectiles::{Projectile, ProjectileManager};
use super::render::{RenderBuffer, WideInstance, colors};
use crate::consts::{HIT_DAMAGE, MAX_SEPARATION_STEP, SEPARATION_EPSILON};
use crate::error::SimError;
use crate::tunables::SimConfig;
use crate::{clamp_to_bounds, heading, in_awareness_range};

/// Enemy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Drifts toward the player once it notices them and fires aimed shots
    #[default]
    FloatingFollower,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 1] = [EnemyKind::FloatingFollower];

    /// Variant index written into the render tag
    pub fn index(self) -> usize {
        match self {
            EnemyKind::FloatingFollower => 0,
        }
    }

    pub fn stats(self) -> &'static EnemyStats {
        &STATS[self.index()]
    }
}

/// Per-variant constants copied into a row at spawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    pub scale: f32,
    pub color: [f32; 4],
    pub max_health: f32,
    pub max_shield: f32,
    /// Range at which an idle enemy notices the player
    pub awareness_range: f32,
    /// Range within which an aggroed enemy keeps chasing
    pub follow_range: f32,
    /// Fraction of velocity lost per second
    pub movement_decay: f32,
    pub max_velocity: f32,
    pub base_acceleration: f32,
    /// Seconds between volleys
    pub attack_cooldown: f32,
    pub projectile_range: f32,
    pub projectile_scale: f32,
    pub projectile_decay: f32,
    pub projectile_color: [f32; 4],
    pub projectile_speed: f32,
}

const STATS: [EnemyStats; 1] = [EnemyStats {
    scale: 3.0,
    color: colors::ORANGE,
    max_health: 20.0,
    max_shield: 20.0,
    awareness_range: 36.0,
    follow_range: 60.0,
    movement_decay: 0.7,
    max_velocity: 10.0,
    base_acceleration: 15.0,
    attack_cooldown: 1.1,
    projectile_range: 1.75,
    projectile_scale: 1.75,
    projectile_decay: 0.005,
    projectile_color: colors::RED,
    projectile_speed: 13.0,
}];

/// One enemy row
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Enemy {
    pub pos: Vec2,
    pub scale: f32,
    pub kind: EnemyKind,
    pub color: [f32; 4],
    pub vel: Vec2,
    pub acc: Vec2,
    pub portal_ready_at: f32,
    pub base_acceleration: f32,
    pub movement_decay: f32,
    pub max_velocity: f32,
    pub spawn_time: f32,
    pub max_health: f32,
    pub max_shield: f32,
    pub health: f32,
    pub shield: f32,
    pub awareness_range: f32,
    pub follow_range: f32,
    pub attack_cooldown: f32,
    pub next_fire_at: f32,
    pub projectile_range: f32,
    pub projectile_scale: f32,
    pub projectile_decay: f32,
    pub projectile_color: [f32; 4],
    pub projectile_speed: f32,
    pub aggro: bool,
}

impl Enemy {
    pub fn new(kind: EnemyKind, pos: Vec2, vel: Vec2, acc: Vec2, now: f32) -> Self {
        let s = kind.stats();
        Self {
            pos,
            scale: s.scale,
            kind,
            color: s.color,
            vel,
            acc,
            portal_ready_at: now,
            base_acceleration: s.base_acceleration,
            movement_decay: s.movement_decay,
            max_velocity: s.max_velocity,
            spawn_time: now,
            max_health: s.max_health,
            max_shield: s.max_shield,
            health: s.max_health,
            shield: s.max_shield,
            awareness_range: s.awareness_range,
            follow_range: s.follow_range,
            attack_cooldown: s.attack_cooldown,
            next_fire_at: now + s.attack_cooldown,
            projectile_range: s.projectile_range,
            projectile_scale: s.projectile_scale,
            projectile_decay: s.projectile_decay,
            projectile_color: s.projectile_color,
            projectile_speed: s.projectile_speed,
            aggro: false,
        }
    }

    /// Current detection range (hysteresis: following reaches further)
    #[inline]
    fn sight_range(&self) -> f32 {
        if self.aggro { self.follow_range } else { self.awareness_range }
    }

    fn pack(&self) -> WideInstance {
        WideInstance {
            position: self.pos.to_array(),
            scale: self.scale,
            tag: self.kind.index() as f32,
            color: self.color,
            health: [self.max_health, self.max_shield, self.health, self.shield],
        }
    }
}

/// Snapshot of the player as seen by enemies for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub pos: Vec2,
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct EnemyManager {
    pool: SlotPool<Enemy>,
    kinds: Vec<EnemyKind>,
    /// Enemies are clamped inside `±bounds` (inset by half their scale)
    bounds: Vec2,
    separation_rate: f32,
    player_overlap_divisor: f32,
    player_overlap_push: f32,
    volley_drag_divisor: f32,
    render: RenderBuffer<WideInstance>,
}

impl EnemyManager {
    pub fn new(config: &SimConfig, kinds: &[EnemyKind]) -> Self {
        let arena = Vec2::new(config.arena_width, config.arena_height);
        Self {
            pool: SlotPool::new(config.enemy_capacity),
            kinds: kinds.to_vec(),
            bounds: arena * config.enemy_bounds_factor,
            separation_rate: config.separation_rate,
            player_overlap_divisor: config.player_overlap_divisor,
            player_overlap_push: config.player_overlap_push,
            volley_drag_divisor: config.volley_drag_divisor,
            render: RenderBuffer::with_capacity(config.enemy_capacity),
        }
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn get(&self, id: SlotId) -> Option<&Enemy> {
        self.pool.get(id)
    }

    /// Spawn a registered variant.
    ///
    /// `Ok(None)` means the pool is full; an unregistered kind is a
    /// configuration error.
    pub fn spawn(
        &mut self,
        kind: EnemyKind,
        pos: Vec2,
        vel: Vec2,
        acc: Vec2,
        now: f32,
    ) -> Result<Option<SlotId>, SimError> {
        if !self.kinds.contains(&kind) {
            return Err(SimError::UnregisteredVariant(kind));
        }
        let id = self.pool.spawn(Enemy::new(kind, pos, vel, acc, now));
        if id.is_none() {
            log::debug!("Enemy pool full, {:?} not spawned", kind);
        }
        Ok(id)
    }

    pub fn despawn(&mut self, id: SlotId) -> bool {
        self.pool.despawn(id)
    }

    pub fn despawn_multiple<I: IntoIterator<Item = SlotId>>(&mut self, ids: I) -> usize {
        self.pool.despawn_multiple(ids)
    }

    /// `(id, position, scale)` for every live enemy, in id order
    pub fn hitboxes(&self) -> Vec<(SlotId, Vec2, f32)> {
        self.pool.iter_live().map(|(id, e)| (id, e.pos, e.scale)).collect()
    }

    /// Advance every live enemy one frame.
    ///
    /// Volleys from enemies whose cooldown has expired are spawned into
    /// `volleys` in a single batch. Returns the number of shots in that batch
    /// (zero when nothing fired or the batch was rejected).
    pub fn update(
        &mut self,
        dt: f32,
        now: f32,
        target: Target,
        gravity: f32,
        volleys: &mut ProjectileManager,
    ) -> usize {
        if self.pool.live_count() == 0 {
            return 0;
        }

        for (_, e) in self.pool.iter_live_mut() {
            // Aggro with hysteresis, then steer
            if in_awareness_range(target.pos, target.scale, e.pos, e.sight_range()) {
                e.aggro = true;
                e.acc = heading(target.pos - e.pos) * e.base_acceleration;
                e.vel += e.acc * dt;
            } else {
                // Coast to a stop via decay
                e.aggro = false;
                e.acc = Vec2::ZERO;
            }
            e.vel.y -= gravity;
        }

        self.resolve_overlaps(dt);
        self.resolve_target_overlap(target);

        let bounds = self.bounds;
        for (_, e) in self.pool.iter_live_mut() {
            e.vel *= 1.0 - e.movement_decay * dt;
            clamp_to_bounds(&mut e.pos, &mut e.vel, bounds, e.scale / 2.0);
            e.pos += e.vel * dt;
        }

        self.fire_volleys(now, target, volleys)
    }

    /// Gather every ready, aggroed enemy into one volley
    fn fire_volleys(&mut self, now: f32, target: Target, volleys: &mut ProjectileManager) -> usize {
        let drag = self.volley_drag_divisor;
        let mut volley = Vec::new();

        for (_, e) in self.pool.iter_live_mut() {
            if !e.aggro || e.next_fire_at >= now {
                continue;
            }
            let aim = heading(target.pos - e.pos);
            let vel = 2.0 * aim * e.projectile_speed + e.vel / drag;
            volley.push(Projectile::new(
                e.pos,
                vel,
                e.projectile_range,
                e.projectile_scale,
                e.projectile_decay,
                e.projectile_color,
                now,
            ));
            e.next_fire_at = now + e.attack_cooldown;
        }

        if volley.is_empty() {
            return 0;
        }
        match volleys.spawn_bulk(&volley) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("{} volley dropped: {}", volleys.name(), e);
                0
            }
        }
    }

    /// Push overlapping enemies apart.
    ///
    /// Each enemy's correction is the push it receives from every overlapping
    /// neighbor minus the push it exerts on them, scaled by the separation
    /// rate (capped per frame so long frames stop at contact). Coincident
    /// enemies get no push (the epsilon only prevents NaN).
    pub fn resolve_overlaps(&mut self, dt: f32) {
        let bodies = self.hitboxes();
        let n = bodies.len();
        if n < 2 {
            return;
        }

        let mut corrections = vec![Vec2::ZERO; n];
        for i in 0..n {
            let (_, pi, si) = bodies[i];
            for j in (i + 1)..n {
                let (_, pj, sj) = bodies[j];
                let diff = pi - pj;
                let dist = diff.length();
                let min_dist = (si + sj) / 2.0;
                if dist >= min_dist {
                    continue;
                }
                let push = (min_dist - dist) * diff / (dist + SEPARATION_EPSILON);
                // i receives `push` from j and exerts `-push` on j; the
                // (j, i) term mirrors it, so each side moves by twice the push
                corrections[i] += 2.0 * push;
                corrections[j] -= 2.0 * push;
            }
        }

        let rate = (self.separation_rate * dt).min(MAX_SEPARATION_STEP);
        for ((id, _, _), correction) in bodies.into_iter().zip(corrections) {
            if let Some(e) = self.pool.get_mut(id) {
                e.pos += correction * rate;
            }
        }
    }

    /// Push enemies out of the player's circle; the player does not move
    pub fn resolve_target_overlap(&mut self, target: Target) {
        let divisor = self.player_overlap_divisor;
        let push = self.player_overlap_push;
        for (_, e) in self.pool.iter_live_mut() {
            let diff = e.pos - target.pos;
            let dist = diff.length();
            let min_dist = (e.scale + target.scale) / divisor;
            if dist < min_dist && dist > 0.0 {
                e.pos += (min_dist - dist) * diff / (dist + SEPARATION_EPSILON) * push;
            }
        }
    }

    /// Apply `hits` projectile hits: shield absorbs first, then health.
    ///
    /// Returns `None` for a stale id, otherwise whether the enemy died and
    /// was despawned.
    pub fn apply_hits(&mut self, id: SlotId, hits: usize) -> Option<bool> {
        let e = self.pool.get_mut(id)?;
        let damage = HIT_DAMAGE * hits as f32;
        if e.shield > 0.0 {
            e.shield = (e.shield - damage).max(0.0);
        } else {
            e.health = (e.health - damage).max(0.0);
        }
        let dead = e.health <= 0.0;
        if dead {
            self.pool.despawn(id);
        }
        Some(dead)
    }

    pub fn refresh_render_buffer(&mut self) {
        self.pool.pack_live(&mut self.render, Enemy::pack);
    }

    pub fn render_buffer(&self) -> &RenderBuffer<WideInstance> {
        &self.render
    }
}

impl PortalTraveler for EnemyManager {
    fn portal_candidates(&self, now: f32) -> Vec<(SlotId, Vec2, f32)> {
        self.pool
            .iter_live()
            .filter(|(_, e)| e.portal_ready_at < now)
            .map(|(id, e)| (id, e.pos, e.scale))
            .collect()
    }

    fn relocate(&mut self, id: SlotId, pos: Vec2, ready_at: f32) {
        if let Some(e) = self.pool.get_mut(id) {
            e.pos = pos;
            e.portal_ready_at = ready_at;
        }
    }
}
