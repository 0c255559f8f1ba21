//! Frame-stepped arena simulation
//!
//! Every entity kind lives in a fixed-capacity pool. The module stays free of
//! rendering and platform code:
//! - Time advances only through `World::tick`
//! - Iteration follows slot order
//! - Pools talk to each other through copies and ids, never shared references

pub mod buttons;
pub mod enemies;
pub mod player;
pub mod pool;
pub mod portals;
pub mod projectiles;
pub mod render;
pub mod world;

pub use buttons::ButtonManager;
pub use enemies::{Enemy, EnemyKind, EnemyManager, EnemyStats, Target};
pub use player::{Facing, HeldKeys, Player};
pub use pool::{SlotId, SlotPool};
pub use portals::{PortalManager, PortalTraveler};
pub use projectiles::{Projectile, ProjectileManager};
pub use render::{RenderBuffer, RenderFrame, SlimInstance, WideInstance};
pub use world::{FrameInput, FrameStats, StageTimings, World};
