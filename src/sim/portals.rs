//! Paired teleport zones
//!
//! A pair lives in one pool slot `p`; its two ends are addressed as `p` and
//! `p + capacity`, so the companion of an end is pure arithmetic.

use glam::Vec2;

use super::pool::{SlotId, SlotPool};
use super::render::{RenderBuffer, SlimInstance};
use crate::error::SimError;

/// Anything whose live rows can be moved through portals
pub trait PortalTraveler {
    /// `(id, position, scale)` of every live row allowed to teleport at `now`
    fn portal_candidates(&self, now: f32) -> Vec<(SlotId, Vec2, f32)>;

    /// Move a row and block it from portals until `ready_at`
    fn relocate(&mut self, id: SlotId, pos: Vec2, ready_at: f32);
}

/// One end of a portal pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortalEnd {
    pub pos: Vec2,
    /// Footprint radius (a third of the placed scale)
    pub scale: f32,
    pub spawn_time: f32,
    pub color: [f32; 4],
}

impl PortalEnd {
    fn pack(&self) -> SlimInstance {
        SlimInstance {
            position: self.pos.to_array(),
            scale: self.scale,
            spawn_time: self.spawn_time,
            color: self.color,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PortalPair {
    ends: [PortalEnd; 2],
}

#[derive(Debug, Clone)]
pub struct PortalManager {
    pool: SlotPool<PortalPair>,
    /// Slack on the squared threshold for batched queries
    batch_slack: f32,
    render: RenderBuffer<SlimInstance>,
}

impl PortalManager {
    pub fn new(max_pairs: usize, batch_slack: f32) -> Self {
        Self {
            pool: SlotPool::new(max_pairs),
            batch_slack,
            render: RenderBuffer::with_capacity(max_pairs * 2),
        }
    }

    /// Number of pair slots
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn pair_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Place a pair of linked portals. Returns the id of the first end.
    #[allow(clippy::too_many_arguments)]
    pub fn add_pair(
        &mut self,
        pos_a: Vec2,
        scale_a: f32,
        color_a: [f32; 4],
        pos_b: Vec2,
        scale_b: f32,
        color_b: [f32; 4],
        now: f32,
    ) -> Result<SlotId, SimError> {
        if pos_a == pos_b {
            return Err(SimError::CoincidentPortal {
                x: pos_a.x,
                y: pos_a.y,
            });
        }
        let end = |pos: Vec2, scale: f32, color| PortalEnd {
            pos,
            scale: scale / 3.0,
            spawn_time: now,
            color,
        };
        let pair = PortalPair {
            ends: [end(pos_a, scale_a, color_a), end(pos_b, scale_b, color_b)],
        };
        let id = self.pool.spawn(pair).ok_or(SimError::PortalCapacity {
            capacity: self.capacity(),
        })?;
        log::info!(
            "Portal pair {} placed: ({}, {}) <-> ({}, {})",
            id,
            pos_a.x,
            pos_a.y,
            pos_b.x,
            pos_b.y
        );
        Ok(id)
    }

    /// Remove the pair owning end `id` (both ends go together)
    pub fn remove_pair(&mut self, id: SlotId) -> bool {
        if id >= self.capacity() * 2 {
            return false;
        }
        self.pool.despawn(id % self.capacity())
    }

    /// Id of the companion end
    #[inline]
    pub fn paired_index(&self, id: SlotId) -> SlotId {
        paired_index(id, self.capacity())
    }

    /// A live portal end by id
    pub fn end(&self, id: SlotId) -> Option<&PortalEnd> {
        let capacity = self.capacity();
        if capacity == 0 || id >= capacity * 2 {
            return None;
        }
        self.pool.get(id % capacity).map(|pair| &pair.ends[id / capacity])
    }

    pub fn position(&self, id: SlotId) -> Option<Vec2> {
        self.end(id).map(|e| e.pos)
    }

    /// Live ends as `(id, end)`: every first end, then every second end
    fn live_ends(&self) -> impl Iterator<Item = (SlotId, &PortalEnd)> + '_ {
        let capacity = self.capacity();
        (0..2).flat_map(move |half| {
            self.pool
                .iter_live()
                .map(move |(pair, p)| (pair + half * capacity, &p.ends[half]))
        })
    }

    /// Portal ends touching a circle of `scale` at `point`.
    ///
    /// Threshold: `dist² <= (scale / 2 + end.scale)² + overlap`.
    pub fn check_collisions(&self, point: Vec2, scale: f32, overlap: f32) -> Vec<SlotId> {
        self.live_ends()
            .filter(|(_, end)| {
                let reach = scale / 2.0 + end.scale;
                end.pos.distance_squared(point) <= reach * reach + overlap
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Batched query for pooled entities, using the configured slack
    pub fn check_collisions_multiple(&self, points: &[Vec2], scales: &[f32]) -> Vec<Vec<SlotId>> {
        debug_assert_eq!(points.len(), scales.len());
        points
            .iter()
            .zip(scales)
            .map(|(&point, &scale)| self.check_collisions(point, scale, self.batch_slack))
            .collect()
    }

    /// Where an entity entering end `id` comes out
    pub fn destination(&self, id: SlotId) -> Option<Vec2> {
        self.position(self.paired_index(id))
    }

    /// Teleport every eligible row of `traveler` that touches a portal.
    ///
    /// Returns how many rows moved.
    pub fn resolve_teleports<T: PortalTraveler>(&self, traveler: &mut T, now: f32, cooldown: f32) -> usize {
        if self.pair_count() == 0 {
            return 0;
        }
        let candidates = traveler.portal_candidates(now);
        if candidates.is_empty() {
            return 0;
        }
        let points: Vec<Vec2> = candidates.iter().map(|c| c.1).collect();
        let scales: Vec<f32> = candidates.iter().map(|c| c.2).collect();
        let hits = self.check_collisions_multiple(&points, &scales);

        let mut moved = 0;
        for ((id, _, _), portals) in candidates.iter().zip(hits) {
            let Some(&entered) = portals.first() else {
                continue;
            };
            if let Some(dest) = self.destination(entered) {
                traveler.relocate(*id, dest, now + cooldown);
                moved += 1;
            }
        }
        moved
    }

    pub fn refresh_render_buffer(&mut self) {
        let rows: Vec<SlimInstance> = self.live_ends().map(|(_, end)| end.pack()).collect();
        self.render.refill(rows.into_iter());
    }

    pub fn render_buffer(&self) -> &RenderBuffer<SlimInstance> {
        &self.render
    }
}

/// Companion end of `id` in a manager with `capacity` pair slots
#[inline]
pub fn paired_index(id: SlotId, capacity: usize) -> SlotId {
    if id < capacity { id + capacity } else { id - capacity }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: pairing twice returns the same end
        #[test]
        fn paired_index_is_involution(capacity in 1usize..256, raw in 0usize..512) {
            let id = raw % (capacity * 2);
            prop_assert_eq!(paired_index(paired_index(id, capacity), capacity), id);
            prop_assert_ne!(paired_index(id, capacity), id);
        }
    }
}
