//! Frame orchestration
//!
//! Owns every pool and steps them in a fixed order each frame. Later stages
//! read positions written by earlier ones, so the order here is part of the
//! contract: player movement and firing, player shots, enemy AI, enemy shots,
//! hit resolution, portals, then render packing.

use std::ops::Range;

use glam::Vec2;
use serde::Serialize;

use super::buttons::ButtonManager;
use super::enemies::{EnemyKind, EnemyManager, Target};
use super::player::{HeldKeys, Player};
use super::portals::PortalManager;
use super::projectiles::ProjectileManager;
use super::render::{RenderFrame, colors};
use crate::consts::FRAME_DT;
use crate::error::SimError;
use crate::tunables::{SimConfig, Tunables};

/// Input for a single frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    /// Seconds since the previous frame
    pub dt: f32,
    pub keys: HeldKeys,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            dt: FRAME_DT,
            keys: HeldKeys::default(),
        }
    }
}

impl FrameInput {
    pub fn new(keys: HeldKeys) -> Self {
        Self { keys, ..Default::default() }
    }
}

/// Wall-clock cost of each stage of the last frame, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub player: f32,
    pub projectiles: f32,
    pub enemies: f32,
    pub collisions: f32,
    pub portals: f32,
    pub render: f32,
}

/// Snapshot for the profiler overlay / headless output
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStats {
    pub frame: u64,
    pub elapsed: f32,
    pub player_pos: Vec2,
    pub player_vel: Vec2,
    pub total_speed: f32,
    pub player_projectiles: usize,
    pub enemy_projectiles: usize,
    pub enemies: usize,
    pub portal_pairs: usize,
    pub buttons: usize,
    pub timings: StageTimings,
}

/// Measures consecutive stages. Profiling only: nothing in the simulation
/// reads these numbers back.
#[cfg(not(target_arch = "wasm32"))]
struct StageClock(std::time::Instant);

#[cfg(not(target_arch = "wasm32"))]
impl StageClock {
    fn start() -> Self {
        Self(std::time::Instant::now())
    }

    /// Milliseconds since the last lap
    fn lap(&mut self) -> f32 {
        let now = std::time::Instant::now();
        let ms = now.duration_since(self.0).as_secs_f32() * 1000.0;
        self.0 = now;
        ms
    }
}

/// No monotonic clock on wasm32; timings read as zero
#[cfg(target_arch = "wasm32")]
struct StageClock;

#[cfg(target_arch = "wasm32")]
impl StageClock {
    fn start() -> Self {
        Self
    }

    fn lap(&mut self) -> f32 {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub config: SimConfig,
    pub frame: u64,
    /// Seconds since the world was created
    pub elapsed: f32,
    pub player: Player,
    pub player_projectiles: ProjectileManager,
    pub enemy_projectiles: ProjectileManager,
    pub enemies: EnemyManager,
    pub portals: PortalManager,
    pub buttons: ButtonManager,
    /// Player clamp rectangle half-extent
    player_bounds: Vec2,
    timings: StageTimings,
}

impl World {
    /// Build the pools and place the starting portal pair
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let arena = Vec2::new(config.arena_width, config.arena_height);
        let projectiles = |name| {
            ProjectileManager::new(name, config.projectile_capacity, arena, config.projectile_bounds_factor)
        };

        let mut world = Self {
            frame: 0,
            elapsed: 0.0,
            player: Player::new(Vec2::ZERO),
            player_projectiles: projectiles("Player"),
            enemy_projectiles: projectiles("Enemy"),
            enemies: EnemyManager::new(&config, &EnemyKind::ALL),
            portals: PortalManager::new(config.portal_pair_capacity, config.portal_batch_slack),
            buttons: ButtonManager::new(config.button_capacity),
            player_bounds: arena * config.player_bounds_factor,
            timings: StageTimings::default(),
            config,
        };

        world.portals.add_pair(
            Vec2::new(15.0, -15.0),
            6.0,
            colors::RED,
            Vec2::new(-15.0, 15.0),
            6.0,
            colors::GREEN,
            0.0,
        )?;
        world.refresh_render_buffers();
        Ok(world)
    }

    /// Fill an integer grid with enemies, three world units apart.
    ///
    /// Stops quietly once the enemy pool is full. Returns how many were placed.
    pub fn spawn_enemy_grid(&mut self, x_range: Range<i32>, y_range: Range<i32>) -> Result<usize, SimError> {
        let mut placed = 0;
        'grid: for x in x_range {
            for y in y_range.clone() {
                let pos = Vec2::new(x as f32, y as f32) * 3.0;
                let spawned = self.enemies.spawn(
                    EnemyKind::FloatingFollower,
                    pos,
                    Vec2::ZERO,
                    Vec2::ZERO,
                    self.elapsed,
                )?;
                if spawned.is_none() {
                    break 'grid;
                }
                placed += 1;
            }
        }
        log::info!("Placed {} enemies ({} live)", placed, self.enemies.live_count());
        self.enemies.refresh_render_buffer();
        Ok(placed)
    }

    /// Advance the whole simulation by one frame.
    ///
    /// `tunables` is reread every frame and snapped into its slider ranges
    /// first, so a bad value lasts one frame at most.
    pub fn tick(&mut self, input: &FrameInput, tunables: &Tunables) {
        let tunables = &tunables.clamped();
        let dt = input.dt;
        self.frame += 1;
        self.elapsed += dt;
        let now = self.elapsed;
        let mut clock = StageClock::start();

        // Player
        self.player.handle_movement(&input.keys, tunables, dt);
        if let Some(shot) = self.player.handle_firing(&input.keys, now, tunables, &self.config) {
            self.player_projectiles.spawn(shot);
        }
        self.player.clamp_to(self.player_bounds);
        self.timings.player = clock.lap();

        self.player_projectiles.update(dt, now);
        let mut projectile_ms = clock.lap();

        // Enemies read the player after it moved this frame
        let target = Target {
            pos: self.player.pos,
            scale: self.player.scale,
        };
        self.enemies
            .update(dt, now, target, tunables.gravity, &mut self.enemy_projectiles);
        self.timings.enemies = clock.lap();

        self.enemy_projectiles.update(dt, now);
        projectile_ms += clock.lap();
        self.timings.projectiles = projectile_ms;

        self.resolve_hits();
        self.timings.collisions = clock.lap();

        self.player.teleport_through(
            &self.portals,
            now,
            self.config.player_portal_cooldown,
            self.config.player_portal_slack,
        );
        let cooldown = self.config.teleport_cooldown;
        self.portals
            .resolve_teleports(&mut self.player_projectiles, now, cooldown);
        self.portals.resolve_teleports(&mut self.enemies, now, cooldown);
        self.portals
            .resolve_teleports(&mut self.enemy_projectiles, now, cooldown);
        self.timings.portals = clock.lap();

        self.refresh_render_buffers();
        self.timings.render = clock.lap();

        log::trace!("frame {} timings {:?}", self.frame, self.timings);
    }

    /// Player shots damage enemies; enemy shots that reach the player vanish
    fn resolve_hits(&mut self) {
        let hitboxes = self.enemies.hitboxes();
        if !hitboxes.is_empty() && self.player_projectiles.live_count() > 0 {
            let points: Vec<Vec2> = hitboxes.iter().map(|h| h.1).collect();
            let scales: Vec<f32> = hitboxes.iter().map(|h| h.2).collect();
            let hits = self
                .player_projectiles
                .check_collisions_multiple(&points, &scales);

            let mut spent = Vec::new();
            for ((enemy, _, _), shots) in hitboxes.iter().zip(hits) {
                if shots.is_empty() {
                    continue;
                }
                if self.enemies.apply_hits(*enemy, shots.len()) == Some(true) {
                    log::debug!("Enemy {} destroyed", enemy);
                }
                spent.extend(shots);
            }
            // A shot touching two enemies counts for both; despawn tolerates the duplicate
            self.player_projectiles.despawn_multiple(spent);
        }

        let reached = self
            .enemy_projectiles
            .check_collisions(self.player.pos, self.player.scale);
        self.enemy_projectiles.despawn_multiple(reached);
    }

    fn refresh_render_buffers(&mut self) {
        self.player_projectiles.refresh_render_buffer();
        self.enemy_projectiles.refresh_render_buffer();
        self.enemies.refresh_render_buffer();
        self.portals.refresh_render_buffer();
        self.buttons.refresh_render_buffer();
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frame: self.frame,
            elapsed: self.elapsed,
            player_pos: self.player.pos,
            player_vel: self.player.vel,
            total_speed: self.player.vel.length(),
            player_projectiles: self.player_projectiles.live_count(),
            enemy_projectiles: self.enemy_projectiles.live_count(),
            enemies: self.enemies.live_count(),
            portal_pairs: self.portals.pair_count(),
            buttons: self.buttons.live_count(),
            timings: self.timings,
        }
    }

    /// Buffers as of the end of the last frame
    pub fn render_frame(&self) -> RenderFrame<'_> {
        RenderFrame {
            player: self.player.pack(),
            player_projectiles: self.player_projectiles.render_buffer().as_slice(),
            enemy_projectiles: self.enemy_projectiles.render_buffer().as_slice(),
            enemies: self.enemies.render_buffer().as_slice(),
            portals: self.portals.render_buffer().as_slice(),
            buttons: self.buttons.render_buffer().as_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::player::Facing;
    use crate::sim::projectiles::Projectile;

    fn world() -> World {
        World::new(SimConfig::default()).unwrap()
    }

    fn still_shot(pos: Vec2, now: f32) -> Projectile {
        Projectile::new(pos, Vec2::ZERO, 5.0, 1.75, 0.0, colors::BLUE, now)
    }

    #[test]
    fn test_new_places_portal_pair() {
        let world = world();
        let frame = world.render_frame();
        assert_eq!(world.portals.pair_count(), 1);
        assert_eq!(frame.portals.len(), 2);
        assert_eq!(frame.portals[0].position, [15.0, -15.0]);
        assert_eq!(frame.portals[1].position, [-15.0, 15.0]);
        assert_eq!(frame.portals[0].scale, 2.0);
    }

    #[test]
    fn test_fire_rate_over_one_second() {
        let mut world = world();
        let tunables = Tunables {
            fire_rate: 2.0,
            projectile_speed_multiplier: 0.5,
            ..Default::default()
        };
        let input = FrameInput::new(HeldKeys::firing(Facing::Right));

        for _ in 0..60 {
            world.tick(&input, &tunables);
        }
        assert_eq!(world.player_projectiles.live_count(), 2);
        assert_eq!(world.render_frame().player_projectiles.len(), 2);
    }

    #[test]
    fn test_firing_recovers_after_bad_tunables() {
        let mut world = world();
        let fire = FrameInput::new(HeldKeys::firing(Facing::Right));
        let broken = Tunables {
            fire_rate: 0.0,
            ..Default::default()
        };

        world.tick(&fire, &broken);
        assert!(world.player.next_shot_at.is_finite());

        let tunables = Tunables::default();
        let mut fired = 0;
        for _ in 0..600 {
            let before = world.player.next_shot_at;
            world.tick(&fire, &tunables);
            if world.player.next_shot_at != before {
                fired += 1;
            }
        }
        assert!(fired >= 15, "only {fired} shots after recovery");
        assert!(world.player.next_shot_at.is_finite());
    }

    #[test]
    fn test_player_bounds_use_own_factor() {
        let mut world = World::new(SimConfig {
            player_bounds_factor: 1.0,
            ..Default::default()
        })
        .unwrap();
        world.player.pos = Vec2::new(0.0, 30.0);

        world.tick(&FrameInput::default(), &Tunables::default());
        // 13 inset by half the player's scale
        assert_eq!(world.player.pos.y, 11.5);
        assert_eq!(world.player.vel.y, 0.0);
    }

    #[test]
    fn test_stage_timings_do_not_touch_state() {
        let mut world = world();
        world.tick(&FrameInput::default(), &Tunables::default());
        let t = world.stats().timings;
        for ms in [t.player, t.projectiles, t.enemies, t.collisions, t.portals, t.render] {
            assert!(ms.is_finite() && ms >= 0.0);
        }
    }

    #[test]
    fn test_player_uses_portal_once() {
        let mut world = world();
        world.player.pos = Vec2::new(15.0, -15.0);
        let tunables = Tunables::default();

        world.tick(&FrameInput::default(), &tunables);
        assert_eq!(world.player.pos, Vec2::new(-15.0, 15.0));

        // Standing on the exit does not bounce back while cooling down
        world.tick(&FrameInput::default(), &tunables);
        assert_eq!(world.player.pos, Vec2::new(-15.0, 15.0));
    }

    #[test]
    fn test_enemy_projectile_teleports() {
        let mut world = world();
        let id = world
            .enemy_projectiles
            .spawn(still_shot(Vec2::new(15.0, -15.0), 0.0))
            .unwrap();

        world.tick(&FrameInput::default(), &Tunables::default());
        let shot = world.enemy_projectiles.get(id).unwrap();
        assert_eq!(shot.pos, Vec2::new(-15.0, 15.0));
        assert!(shot.portal_ready_at > world.elapsed);
    }

    #[test]
    fn test_shots_wear_down_enemy() {
        let mut world = world();
        let tunables = Tunables::default();
        let enemy = world
            .enemies
            .spawn(EnemyKind::FloatingFollower, Vec2::new(-10.0, 0.0), Vec2::ZERO, Vec2::ZERO, 0.0)
            .unwrap()
            .unwrap();

        // Four hits empty the shield
        for _ in 0..4 {
            let pos = world.enemies.get(enemy).unwrap().pos;
            world.player_projectiles.spawn(still_shot(pos, world.elapsed));
        }
        world.tick(&FrameInput::default(), &tunables);
        let e = world.enemies.get(enemy).unwrap();
        assert_eq!(e.shield, 0.0);
        assert_eq!(e.health, 20.0);
        assert_eq!(world.player_projectiles.live_count(), 0);

        // Four more finish it
        for _ in 0..4 {
            let pos = world.enemies.get(enemy).unwrap().pos;
            world.player_projectiles.spawn(still_shot(pos, world.elapsed));
        }
        world.tick(&FrameInput::default(), &tunables);
        assert!(world.enemies.get(enemy).is_none());
        assert_eq!(world.render_frame().enemies.len(), 0);
    }

    #[test]
    fn test_enemy_shot_vanishes_on_player() {
        let mut world = world();
        world.enemy_projectiles.spawn(still_shot(Vec2::ZERO, 0.0));
        world.tick(&FrameInput::default(), &Tunables::default());

        assert_eq!(world.enemy_projectiles.live_count(), 0);
        // No damage model for the player
        assert_eq!(world.player.health, 100.0);
    }

    #[test]
    fn test_grid_stops_at_capacity() {
        let mut world = World::new(SimConfig {
            enemy_capacity: 4,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(world.spawn_enemy_grid(0..3, 0..3), Ok(4));
        assert_eq!(world.enemies.live_count(), 4);
        // Column-major fill, three units apart
        assert_eq!(world.enemies.get(1).unwrap().pos, Vec2::new(0.0, 3.0));
    }

    #[test]
    fn test_stats_follow_live_counts() {
        let mut world = world();
        world.spawn_enemy_grid(-2..0, -2..0).unwrap();
        world.tick(&FrameInput::default(), &Tunables::default());

        let stats = world.stats();
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.enemies, 4);
        assert_eq!(stats.portal_pairs, 1);
        assert_eq!(world.render_frame().enemies.len(), stats.enemies);

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["enemies"], 4);
    }

    #[test]
    fn test_determinism() {
        let mut a = world();
        let mut b = world();
        a.spawn_enemy_grid(-3..3, -2..2).unwrap();
        b.spawn_enemy_grid(-3..3, -2..2).unwrap();

        let tunables = Tunables::default();
        let inputs = [
            FrameInput::new(HeldKeys { move_up: true, fire_left: true, ..Default::default() }),
            FrameInput::new(HeldKeys { move_right: true, ..Default::default() }),
            FrameInput::new(HeldKeys::firing(Facing::Down)),
            FrameInput::default(),
        ];
        for _ in 0..30 {
            for input in &inputs {
                a.tick(input, &tunables);
                b.tick(input, &tunables);
            }
        }

        assert_eq!(a.player.pos, b.player.pos);
        assert_eq!(a.enemies.hitboxes(), b.enemies.hitboxes());
        assert_eq!(
            a.render_frame().enemy_projectiles,
            b.render_frame().enemy_projectiles
        );
    }
}
