//! Fixed-capacity slot pool with free-list allocation
//!
//! Every entity kind stores its rows in one of these. A slot id is a plain
//! index, never a pointer: despawning can't dangle anything held elsewhere.
//!
//! Invariants:
//! - `used[i]` is true iff `i` is not on the free list
//! - used slots and the free list partition `0..capacity`
//! - a freed row is stale and never read until the slot is respawned

use bytemuck::Pod;

use super::render::RenderBuffer;
use crate::error::SimError;

/// Index into a pool, stable until despawn
pub type SlotId = usize;

#[derive(Debug, Clone)]
pub struct SlotPool<R> {
    rows: Vec<R>,
    used: Vec<bool>,
    /// LIFO stack of free slots
    free: Vec<SlotId>,
}

impl<R: Copy + Default> SlotPool<R> {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: vec![R::default(); capacity],
            used: vec![false; capacity],
            // Reversed so the first spawns take the lowest ids
            free: (0..capacity).rev().collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.capacity() - self.free.len()
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn is_live(&self, id: SlotId) -> bool {
        self.used.get(id).copied().unwrap_or(false)
    }

    /// Claim a slot and write its row. `None` when the pool is full.
    pub fn spawn(&mut self, row: R) -> Option<SlotId> {
        let id = self.free.pop()?;
        self.used[id] = true;
        self.rows[id] = row;
        Some(id)
    }

    /// Claim one slot per row, all or nothing.
    ///
    /// Returns the number of rows written. If the batch is larger than the
    /// free list the pool is left untouched.
    pub fn spawn_bulk(&mut self, rows: &[R]) -> Result<usize, SimError> {
        if rows.len() > self.free.len() {
            return Err(SimError::CapacityExceeded {
                requested: rows.len(),
                available: self.free.len(),
            });
        }
        for row in rows {
            if let Some(id) = self.free.pop() {
                self.used[id] = true;
                self.rows[id] = *row;
            }
        }
        Ok(rows.len())
    }

    /// Release a slot. Returns whether it was live; stale ids are a no-op.
    pub fn despawn(&mut self, id: SlotId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.used[id] = false;
        self.free.push(id);
        true
    }

    /// Release many slots; duplicates and stale ids are skipped.
    /// Returns how many were actually released.
    pub fn despawn_multiple<I: IntoIterator<Item = SlotId>>(&mut self, ids: I) -> usize {
        ids.into_iter().filter(|&id| self.despawn(id)).count()
    }

    pub fn get(&self, id: SlotId) -> Option<&R> {
        if self.is_live(id) { self.rows.get(id) } else { None }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut R> {
        if self.is_live(id) { self.rows.get_mut(id) } else { None }
    }

    /// Live ids in ascending order
    pub fn live_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.used
            .iter()
            .enumerate()
            .filter_map(|(id, &used)| used.then_some(id))
    }

    /// Live rows in ascending id order
    pub fn iter_live(&self) -> impl Iterator<Item = (SlotId, &R)> + '_ {
        self.rows
            .iter()
            .zip(&self.used)
            .enumerate()
            .filter_map(|(id, (row, &used))| used.then_some((id, row)))
    }

    pub fn iter_live_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut R)> + '_ {
        self.rows
            .iter_mut()
            .zip(&self.used)
            .enumerate()
            .filter_map(|(id, (row, &used))| used.then_some((id, row)))
    }

    /// Project every live row into `buffer`, densely, in id order
    pub fn pack_live<T: Pod>(&self, buffer: &mut RenderBuffer<T>, pack: impl Fn(&R) -> T) {
        buffer.refill(self.iter_live().map(|(_, row)| pack(row)));
    }

    /// Check the used/free partition (test and debug helper)
    pub fn is_partitioned(&self) -> bool {
        let mut seen = vec![false; self.capacity()];
        for &id in &self.free {
            if id >= self.capacity() || seen[id] || self.used[id] {
                return false;
            }
            seen[id] = true;
        }
        self.used.iter().filter(|&&u| u).count() + self.free.len() == self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Row {
        value: f32,
    }

    #[test]
    fn test_spawn_until_full() {
        let mut pool = SlotPool::<Row>::new(3);
        assert_eq!(pool.spawn(Row { value: 1.0 }), Some(0));
        assert_eq!(pool.spawn(Row { value: 2.0 }), Some(1));
        assert_eq!(pool.spawn(Row { value: 3.0 }), Some(2));
        assert_eq!(pool.spawn(Row { value: 4.0 }), None);
        assert_eq!(pool.live_count(), 3);
        assert!(pool.is_partitioned());
    }

    #[test]
    fn test_spawn_despawn_round_trip() {
        let mut pool = SlotPool::<Row>::new(8);
        let ids: Vec<_> = (0..5).filter_map(|i| pool.spawn(Row { value: i as f32 })).collect();
        assert_eq!(pool.free_count(), 3);

        assert_eq!(pool.despawn_multiple(ids.iter().copied()), 5);
        assert_eq!(pool.free_count(), 8);
        assert_eq!(pool.live_count(), 0);
        assert!(pool.is_partitioned());
    }

    #[test]
    fn test_despawn_is_idempotent() {
        let mut pool = SlotPool::<Row>::new(4);
        let id = pool.spawn(Row::default()).unwrap();
        assert!(pool.despawn(id));
        assert!(!pool.despawn(id));
        assert!(!pool.despawn(99));
        assert_eq!(pool.free_count(), 4);

        // Duplicates in a batch only release once
        let a = pool.spawn(Row::default()).unwrap();
        assert_eq!(pool.despawn_multiple([a, a, a, 1000]), 1);
        assert!(pool.is_partitioned());
    }

    #[test]
    fn test_spawn_bulk_all_or_nothing() {
        let mut pool = SlotPool::<Row>::new(4);
        pool.spawn(Row { value: 9.0 }).unwrap();
        let before: Vec<_> = pool.iter_live().map(|(id, r)| (id, *r)).collect();

        let batch = [Row { value: 1.0 }; 4];
        let err = pool.spawn_bulk(&batch).unwrap_err();
        assert_eq!(
            err,
            SimError::CapacityExceeded {
                requested: 4,
                available: 3
            }
        );
        let after: Vec<_> = pool.iter_live().map(|(id, r)| (id, *r)).collect();
        assert_eq!(before, after);
        assert_eq!(pool.free_count(), 3);

        assert_eq!(pool.spawn_bulk(&batch[..3]), Ok(3));
        assert_eq!(pool.free_count(), 0);
        assert!(pool.is_partitioned());
    }

    #[test]
    fn test_stale_access_returns_none() {
        let mut pool = SlotPool::<Row>::new(2);
        let id = pool.spawn(Row { value: 5.0 }).unwrap();
        assert_eq!(pool.get(id).map(|r| r.value), Some(5.0));
        pool.despawn(id);
        assert!(pool.get(id).is_none());
        assert!(pool.get_mut(id).is_none());
    }

    #[test]
    fn test_iteration_skips_free_slots() {
        let mut pool = SlotPool::<Row>::new(5);
        for i in 0..5 {
            pool.spawn(Row { value: i as f32 });
        }
        pool.despawn(1);
        pool.despawn(3);
        let ids: Vec<_> = pool.live_ids().collect();
        assert_eq!(ids, vec![0, 2, 4]);

        for (_, row) in pool.iter_live_mut() {
            row.value *= 10.0;
        }
        let values: Vec<_> = pool.iter_live().map(|(_, r)| r.value).collect();
        assert_eq!(values, vec![0.0, 20.0, 40.0]);
    }

    #[test]
    fn test_pack_live_is_dense() {
        let mut pool = SlotPool::<Row>::new(4);
        for i in 0..4 {
            pool.spawn(Row { value: i as f32 });
        }
        pool.despawn(0);
        pool.despawn(2);

        let mut buffer = RenderBuffer::<f32>::with_capacity(4);
        pool.pack_live(&mut buffer, |r| r.value);
        assert_eq!(buffer.live_count(), 2);
        assert_eq!(buffer.as_slice(), &[1.0, 3.0]);
    }
}
