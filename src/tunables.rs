//! Slider-tuned parameters and construction-time configuration
//!
//! `Tunables` is the per-frame snapshot handed to `World::tick`; it can be
//! rewritten between any two frames. `SimConfig` is fixed when the world is built.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;

/// Slider metadata for one tunable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunableRange {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

const RANGES: [TunableRange; 9] = [
    TunableRange { name: "base_acceleration", min: 0.1, max: 4.0, default: 0.6 },
    TunableRange { name: "max_velocity", min: 10.0, max: 500.0, default: 130.0 },
    TunableRange { name: "min_velocity", min: 0.01, max: 4.0, default: 0.08 },
    TunableRange { name: "decay_rate", min: 0.001, max: 0.1, default: 0.04 },
    TunableRange { name: "fire_rate", min: 0.5, max: 200.0, default: 2.0 },
    TunableRange { name: "projectile_decay_rate", min: 0.01, max: 0.03, default: 0.01 },
    TunableRange { name: "projectile_speed_multiplier", min: 0.5, max: 50.0, default: 2.0 },
    TunableRange { name: "range", min: 1.0, max: 5.0, default: 1.5 },
    TunableRange { name: "gravity", min: -2.0, max: 2.0, default: 0.0 },
];

/// Runtime-adjustable gameplay parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Player acceleration per frame while a movement key is held
    pub base_acceleration: f32,
    /// Player speed cap
    pub max_velocity: f32,
    /// Below this speed (and with no movement key) the player snaps to rest
    pub min_velocity: f32,
    /// Fraction of player velocity lost per frame
    pub decay_rate: f32,
    /// Player shots per second
    pub fire_rate: f32,
    /// Fraction of projectile velocity lost per frame
    pub projectile_decay_rate: f32,
    pub projectile_speed_multiplier: f32,
    /// Player projectile lifetime (seconds)
    pub range: f32,
    /// Downward bias subtracted from enemy vertical velocity each frame
    pub gravity: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            base_acceleration: 0.6,
            max_velocity: 130.0,
            min_velocity: 0.08,
            decay_rate: 0.04,
            fire_rate: 2.0,
            projectile_decay_rate: 0.01,
            projectile_speed_multiplier: 2.0,
            range: 1.5,
            gravity: 0.0,
        }
    }
}

impl Tunables {
    /// Slider table, in display order
    pub fn ranges() -> &'static [TunableRange] {
        &RANGES
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f32> {
        Some(match name {
            "base_acceleration" => &mut self.base_acceleration,
            "max_velocity" => &mut self.max_velocity,
            "min_velocity" => &mut self.min_velocity,
            "decay_rate" => &mut self.decay_rate,
            "fire_rate" => &mut self.fire_rate,
            "projectile_decay_rate" => &mut self.projectile_decay_rate,
            "projectile_speed_multiplier" => &mut self.projectile_speed_multiplier,
            "range" => &mut self.range,
            "gravity" => &mut self.gravity,
            _ => return None,
        })
    }

    /// Read a tunable by slider name
    pub fn get(&self, name: &str) -> Option<f32> {
        Some(match name {
            "base_acceleration" => self.base_acceleration,
            "max_velocity" => self.max_velocity,
            "min_velocity" => self.min_velocity,
            "decay_rate" => self.decay_rate,
            "fire_rate" => self.fire_rate,
            "projectile_decay_rate" => self.projectile_decay_rate,
            "projectile_speed_multiplier" => self.projectile_speed_multiplier,
            "range" => self.range,
            "gravity" => self.gravity,
            _ => return None,
        })
    }

    /// Write a tunable by slider name (value is clamped into the slider range)
    pub fn set(&mut self, name: &str, value: f32) -> Result<(), SimError> {
        let range = RANGES
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| SimError::InvalidTunables(format!("unknown tunable `{name}`")))?;
        if !value.is_finite() {
            return Err(SimError::InvalidTunables(format!("`{name}` must be finite")));
        }
        if let Some(field) = self.field_mut(name) {
            *field = value.clamp(range.min, range.max);
        }
        Ok(())
    }

    /// Copy with every field snapped into its slider range
    pub fn clamped(&self) -> Self {
        let mut out = self.clone();
        for range in &RANGES {
            if let Some(field) = out.field_mut(range.name) {
                *field = if field.is_finite() {
                    field.clamp(range.min, range.max)
                } else {
                    range.default
                };
            }
        }
        out
    }

    /// Reject any value outside its slider range
    pub fn validate(&self) -> Result<(), SimError> {
        for range in &RANGES {
            let value = self.get(range.name).unwrap_or(range.default);
            if !value.is_finite() || value < range.min || value > range.max {
                return Err(SimError::InvalidTunables(format!(
                    "`{}` = {} is outside {}..={}",
                    range.name, value, range.min, range.max
                )));
            }
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tunables: Self =
            serde_json::from_str(json).map_err(|e| SimError::InvalidTunables(e.to_string()))?;
        tunables.validate()?;
        Ok(tunables)
    }

    pub fn to_json(&self) -> String {
        // Plain f32 fields always serialize
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Construction-time configuration: capacities, arena and resolution constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub arena_width: f32,
    pub arena_height: f32,
    pub projectile_capacity: usize,
    pub enemy_capacity: usize,
    pub portal_pair_capacity: usize,
    pub button_capacity: usize,
    /// Enemy clamp rectangle half-extent, as a multiple of the arena size
    pub enemy_bounds_factor: f32,
    /// Player clamp rectangle half-extent, as a multiple of the arena size
    pub player_bounds_factor: f32,
    /// Projectile expiry half-extent, as a multiple of the half arena size
    pub projectile_bounds_factor: f32,
    /// Enemy-enemy separation speed (fraction of overlap per second)
    pub separation_rate: f32,
    /// Enemy-player threshold is `(enemy_scale + player_scale) / divisor`
    pub player_overlap_divisor: f32,
    /// Fraction of the enemy-player overlap corrected per frame
    pub player_overlap_push: f32,
    /// Enemy velocity is divided by this before being added to its shots
    pub volley_drag_divisor: f32,
    /// Seconds before the player can use a portal again
    pub player_portal_cooldown: f32,
    /// Seconds before any pooled entity can use a portal again
    pub teleport_cooldown: f32,
    /// Slack added to the squared threshold of batched portal queries
    pub portal_batch_slack: f32,
    /// Slack used for the player's single portal query
    pub player_portal_slack: f32,
    pub player_projectile_speed: f32,
    pub player_projectile_scale: f32,
    pub player_projectile_color: [f32; 4],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            projectile_capacity: MAX_PROJECTILES,
            enemy_capacity: MAX_ENEMIES,
            portal_pair_capacity: MAX_PORTAL_PAIRS,
            button_capacity: MAX_BUTTONS,
            enemy_bounds_factor: 1.5,
            player_bounds_factor: 1.5,
            projectile_bounds_factor: 3.0,
            separation_rate: 12.0,
            player_overlap_divisor: 1.5,
            player_overlap_push: 0.5,
            volley_drag_divisor: 288.0,
            player_portal_cooldown: 2.5,
            teleport_cooldown: 0.5,
            portal_batch_slack: 1.0,
            player_portal_slack: 1.0,
            player_projectile_speed: 40.0,
            player_projectile_scale: 1.75,
            player_projectile_color: [0.0, 0.0, 1.0, 1.0],
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        serde_json::from_str(json).map_err(|e| SimError::InvalidTunables(e.to_string()))
    }
}
