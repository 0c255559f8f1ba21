//! Projectile pool: integration, expiry and circle queries
//!
//! Two instances exist per world (player-fired and enemy-fired) with the same
//! schema. Hits never mutate a projectile here; the caller decides what a
//! collision means.

use glam::Vec2;

use super::pool::{SlotId, SlotPool};
use super::portals::PortalTraveler;
use super::render::{RenderBuffer, SlimInstance};
use crate::error::SimError;

/// One projectile row
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    pub scale: f32,
    pub spawn_time: f32,
    pub color: [f32; 4],
    pub vel: Vec2,
    /// Lifetime budget in seconds (not a distance)
    pub range: f32,
    /// Fraction of velocity lost per frame
    pub decay: f32,
    /// Earliest time this projectile may use a portal
    pub portal_ready_at: f32,
}

impl Projectile {
    pub fn new(pos: Vec2, vel: Vec2, range: f32, scale: f32, decay: f32, color: [f32; 4], now: f32) -> Self {
        Self {
            pos,
            scale,
            spawn_time: now,
            color,
            vel,
            range,
            decay,
            portal_ready_at: now,
        }
    }

    #[inline]
    fn expired(&self, now: f32) -> bool {
        self.spawn_time + self.range < now
    }

    fn pack(&self) -> SlimInstance {
        SlimInstance {
            position: self.pos.to_array(),
            scale: self.scale,
            spawn_time: self.spawn_time,
            color: self.color,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectileManager {
    name: &'static str,
    pool: SlotPool<Projectile>,
    /// Rows beyond this half-extent on either axis are dropped
    expiry_extent: Vec2,
    render: RenderBuffer<SlimInstance>,
}

impl ProjectileManager {
    /// `arena` is the full arena size; rows expire beyond `bounds_factor`
    /// times its half size.
    pub fn new(name: &'static str, capacity: usize, arena: Vec2, bounds_factor: f32) -> Self {
        Self {
            name,
            pool: SlotPool::new(capacity),
            expiry_extent: arena / 2.0 * bounds_factor,
            render: RenderBuffer::with_capacity(capacity),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn get(&self, id: SlotId) -> Option<&Projectile> {
        self.pool.get(id)
    }

    pub fn spawn(&mut self, projectile: Projectile) -> Option<SlotId> {
        let id = self.pool.spawn(projectile);
        if id.is_none() {
            log::debug!("{} projectiles full, shot dropped", self.name);
        }
        id
    }

    /// All-or-nothing batch spawn
    pub fn spawn_bulk(&mut self, projectiles: &[Projectile]) -> Result<usize, SimError> {
        self.pool.spawn_bulk(projectiles)
    }

    pub fn despawn(&mut self, id: SlotId) -> bool {
        self.pool.despawn(id)
    }

    pub fn despawn_multiple<I: IntoIterator<Item = SlotId>>(&mut self, ids: I) -> usize {
        self.pool.despawn_multiple(ids)
    }

    /// Advance every live projectile and drop the ones out of bounds or time.
    ///
    /// Returns how many were dropped.
    pub fn update(&mut self, dt: f32, now: f32) -> usize {
        let extent = self.expiry_extent;
        let mut expired = Vec::new();

        for (id, p) in self.pool.iter_live_mut() {
            p.vel *= 1.0 - p.decay;
            p.pos += p.vel * dt;

            let out_of_bounds = p.pos.x.abs() > extent.x || p.pos.y.abs() > extent.y;
            if out_of_bounds || p.expired(now) {
                expired.push(id);
            }
        }

        self.pool.despawn_multiple(expired)
    }

    /// Live projectiles touching a circle of `scale` at `point`.
    ///
    /// Threshold is inclusive: `dist² <= (scale / 2 + row.scale)²`.
    pub fn check_collisions(&self, point: Vec2, scale: f32) -> Vec<SlotId> {
        self.pool
            .iter_live()
            .filter(|(_, p)| {
                let reach = scale / 2.0 + p.scale;
                p.pos.distance_squared(point) <= reach * reach
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// `check_collisions` for many circles; output order follows the input
    pub fn check_collisions_multiple(&self, points: &[Vec2], scales: &[f32]) -> Vec<Vec<SlotId>> {
        debug_assert_eq!(points.len(), scales.len());
        points
            .iter()
            .zip(scales)
            .map(|(&point, &scale)| self.check_collisions(point, scale))
            .collect()
    }

    pub fn refresh_render_buffer(&mut self) {
        self.pool.pack_live(&mut self.render, Projectile::pack);
    }

    pub fn render_buffer(&self) -> &RenderBuffer<SlimInstance> {
        &self.render
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SlotPool<Projectile> {
        &self.pool
    }
}

impl PortalTraveler for ProjectileManager {
    fn portal_candidates(&self, now: f32) -> Vec<(SlotId, Vec2, f32)> {
        self.pool
            .iter_live()
            .filter(|(_, p)| p.portal_ready_at < now)
            .map(|(id, p)| (id, p.pos, p.scale))
            .collect()
    }

    fn relocate(&mut self, id: SlotId, pos: Vec2, ready_at: f32) {
        if let Some(p) = self.pool.get_mut(id) {
            p.pos = pos;
            p.portal_ready_at = ready_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};
    use crate::sim::render::colors;

    fn manager(capacity: usize) -> ProjectileManager {
        ProjectileManager::new("Test", capacity, Vec2::new(ARENA_WIDTH, ARENA_HEIGHT), 3.0)
    }

    fn still(pos: Vec2, range: f32, now: f32) -> Projectile {
        Projectile::new(pos, Vec2::ZERO, range, 1.75, 0.0, colors::BLUE, now)
    }

    #[test]
    fn test_range_is_a_time_budget() {
        let mut pm = manager(4);
        let id = pm.spawn(still(Vec2::ZERO, 2.0, 0.0)).unwrap();

        pm.update(1.0 / 60.0, 1.9);
        assert!(pm.get(id).is_some(), "still live at t=1.9");

        pm.update(1.0 / 60.0, 2.1);
        assert!(pm.get(id).is_none(), "expired by t=2.1");
        assert_eq!(pm.live_count(), 0);
    }

    #[test]
    fn test_integration_and_decay() {
        let mut pm = manager(4);
        let p = Projectile::new(Vec2::ZERO, Vec2::new(10.0, 0.0), 10.0, 1.0, 0.5, colors::BLUE, 0.0);
        let id = pm.spawn(p).unwrap();

        pm.update(0.1, 0.1);
        let p = pm.get(id).unwrap();
        // Decay happens before integration
        assert!((p.vel.x - 5.0).abs() < 1e-6);
        assert!((p.pos.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_expiry_uses_wide_margin() {
        let mut pm = manager(4);
        // Half width is 11.5, margin is 3x that
        let inside = pm.spawn(still(Vec2::new(30.0, 0.0), 100.0, 0.0)).unwrap();
        let outside = pm.spawn(still(Vec2::new(35.0, 0.0), 100.0, 0.0)).unwrap();
        let above = pm.spawn(still(Vec2::new(0.0, -20.0), 100.0, 0.0)).unwrap();

        assert_eq!(pm.update(0.0, 0.0), 2);
        assert!(pm.get(inside).is_some());
        assert!(pm.get(outside).is_none());
        assert!(pm.get(above).is_none());
        assert!(pm.pool().is_partitioned());
    }

    #[test]
    fn test_collision_boundary_is_inclusive() {
        let mut pm = manager(4);
        // reach = 2.0 / 2 + 1.0 = 2.0
        let p = Projectile::new(Vec2::new(2.0, 0.0), Vec2::ZERO, 5.0, 1.0, 0.0, colors::RED, 0.0);
        let id = pm.spawn(p).unwrap();

        assert_eq!(pm.check_collisions(Vec2::ZERO, 2.0), vec![id]);
        assert!(pm.check_collisions(Vec2::new(-0.01, 0.0), 2.0).is_empty());
    }

    #[test]
    fn test_collisions_multiple_keeps_query_order() {
        let mut pm = manager(8);
        let a = pm.spawn(still(Vec2::new(-10.0, 0.0), 5.0, 0.0)).unwrap();
        let b = pm.spawn(still(Vec2::new(10.0, 0.0), 5.0, 0.0)).unwrap();

        let hits = pm.check_collisions_multiple(
            &[Vec2::new(10.0, 0.5), Vec2::ZERO, Vec2::new(-10.0, 0.0)],
            &[3.0, 3.0, 3.0],
        );
        assert_eq!(hits, vec![vec![b], vec![], vec![a]]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_collisions_multiple_needs_one_scale_per_point() {
        let pm = manager(4);
        pm.check_collisions_multiple(&[Vec2::ZERO, Vec2::ONE], &[1.0]);
    }

    #[test]
    fn test_bulk_rejection_leaves_pool_unchanged() {
        let mut pm = manager(3);
        pm.spawn(still(Vec2::ZERO, 5.0, 0.0)).unwrap();
        let volley = [still(Vec2::ONE, 5.0, 0.0); 3];

        assert!(pm.spawn_bulk(&volley).is_err());
        assert_eq!(pm.live_count(), 1);
        assert_eq!(pm.spawn_bulk(&volley[..2]), Ok(2));
        assert_eq!(pm.live_count(), 3);
    }

    #[test]
    fn test_render_buffer_tracks_live_rows() {
        let mut pm = manager(4);
        let a = pm.spawn(still(Vec2::new(1.0, 2.0), 5.0, 0.25)).unwrap();
        pm.spawn(still(Vec2::new(3.0, 4.0), 5.0, 0.5)).unwrap();
        pm.despawn(a);
        pm.refresh_render_buffer();

        let rows = pm.render_buffer().as_slice();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position, [3.0, 4.0]);
        assert_eq!(rows[0].spawn_time, 0.5);
        assert_eq!(rows[0].color, colors::BLUE);
    }

    #[test]
    fn test_portal_candidates_respect_cooldown() {
        let mut pm = manager(4);
        let id = pm.spawn(still(Vec2::ZERO, 5.0, 1.0)).unwrap();
        assert!(pm.portal_candidates(1.0).is_empty());
        assert_eq!(pm.portal_candidates(1.5).len(), 1);

        pm.relocate(id, Vec2::new(5.0, 5.0), 3.0);
        assert_eq!(pm.get(id).unwrap().pos, Vec2::new(5.0, 5.0));
        assert!(pm.portal_candidates(2.0).is_empty());
    }
}
