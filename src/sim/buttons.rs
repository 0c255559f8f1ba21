//! Static on-screen buttons sharing the slim render layout

use glam::Vec2;

use super::pool::{SlotId, SlotPool};
use super::render::{RenderBuffer, SlimInstance};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Button {
    pub pos: Vec2,
    pub scale: f32,
    pub spawn_time: f32,
    pub color: [f32; 4],
}

impl Button {
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
pub struct ButtonManager {
    pool: SlotPool<Button>,
    render: RenderBuffer<SlimInstance>,
}

impl ButtonManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: SlotPool::new(capacity),
            render: RenderBuffer::with_capacity(capacity),
        }
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn get(&self, id: SlotId) -> Option<&Button> {
        self.pool.get(id)
    }

    pub fn spawn(&mut self, pos: Vec2, scale: f32, color: [f32; 4], now: f32) -> Option<SlotId> {
        let id = self.pool.spawn(Button {
            pos,
            scale,
            spawn_time: now,
            color,
        });
        if id.is_none() {
            log::debug!("Button pool full");
        }
        id
    }

    pub fn despawn(&mut self, id: SlotId) -> bool {
        self.pool.despawn(id)
    }

    /// Buttons under a circle of `scale` at `point` (inclusive)
    pub fn check_collisions(&self, point: Vec2, scale: f32) -> Vec<SlotId> {
        self.pool
            .iter_live()
            .filter(|(_, b)| {
                let reach = scale / 2.0 + b.scale;
                b.pos.distance_squared(point) <= reach * reach
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn refresh_render_buffer(&mut self) {
        self.pool.pack_live(&mut self.render, Button::pack);
    }

    pub fn render_buffer(&self) -> &RenderBuffer<SlimInstance> {
        &self.render
    }
}
