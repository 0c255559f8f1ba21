//! Packed render rows handed to the rendering boundary

use bytemuck::{Pod, Zeroable};

/// 8-float row: projectiles, portals, buttons
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SlimInstance {
    pub position: [f32; 2],
    pub scale: f32,
    /// Spawn timestamp (seconds since world start)
    pub spawn_time: f32,
    pub color: [f32; 4],
}

/// 12-float row: enemies and the player
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WideInstance {
    pub position: [f32; 2],
    pub scale: f32,
    /// Enemy variant index, or the player's facing direction
    pub tag: f32,
    pub color: [f32; 4],
    /// max health, max shield, health, shield
    pub health: [f32; 4],
}

/// Dense, live-count-sized projection of a pool, rebuilt once per frame
#[derive(Debug, Clone)]
pub struct RenderBuffer<T> {
    rows: Vec<T>,
}

impl<T: Pod> RenderBuffer<T> {
    /// Reserve room for a full pool so refills never reallocate
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Replace the contents wholesale; the buffer is never partially stale
    pub fn refill(&mut self, rows: impl Iterator<Item = T>) {
        self.rows.clear();
        self.rows.extend(rows);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.rows
    }

    /// Raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rows)
    }

    /// Number of valid leading rows
    pub fn live_count(&self) -> usize {
        self.rows.len()
    }
}

/// Colors for game elements
pub mod colors {
    pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    pub const ORANGE: [f32; 4] = [1.0, 0.5, 0.0, 1.0];
    pub const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    pub const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
    pub const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
}

/// Everything the renderer reads for one frame
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub player: WideInstance,
    pub player_projectiles: &'a [SlimInstance],
    pub enemy_projectiles: &'a [SlimInstance],
    pub enemies: &'a [WideInstance],
    pub portals: &'a [SlimInstance],
    pub buttons: &'a [SlimInstance],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{SLIM_ROW_FLOATS, WIDE_ROW_FLOATS};

    #[test]
    fn test_row_widths() {
        assert_eq!(std::mem::size_of::<SlimInstance>(), SLIM_ROW_FLOATS * 4);
        assert_eq!(std::mem::size_of::<WideInstance>(), WIDE_ROW_FLOATS * 4);
    }

    #[test]
    fn test_bytes_follow_rows() {
        let mut buffer = RenderBuffer::<SlimInstance>::with_capacity(4);
        buffer.refill(
            [
                SlimInstance {
                    position: [1.0, 2.0],
                    scale: 3.0,
                    spawn_time: 4.0,
                    color: colors::RED,
                },
                SlimInstance::default(),
            ]
            .into_iter(),
        );
        assert_eq!(buffer.live_count(), 2);
        assert_eq!(buffer.as_bytes().len(), 2 * SLIM_ROW_FLOATS * 4);

        let floats: &[f32] = bytemuck::cast_slice(buffer.as_bytes());
        assert_eq!(&floats[..8], &[1.0, 2.0, 3.0, 4.0, 1.0, 0.0, 0.0, 1.0]);

        buffer.refill(std::iter::empty());
        assert_eq!(buffer.live_count(), 0);
    }
}
