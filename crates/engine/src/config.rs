use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::entity::BOSS_MIN_WIDTH;

/// Tuning for the whole simulation. Every field has a default so partial JSON
/// overrides are accepted by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub clock: ClockConfig,
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub player: PlayerConfig,
    pub combat: CombatConfig,
    pub spawn: SpawnConfig,
    pub pool_capacity: usize,
    pub stage_advance_delay_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            world: WorldConfig::default(),
            physics: PhysicsConfig::default(),
            player: PlayerConfig::default(),
            combat: CombatConfig::default(),
            spawn: SpawnConfig::default(),
            pool_capacity: 100,
            stage_advance_delay_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub ticks_per_second: u32,
    pub time_scale_cap: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            time_scale_cap: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    pub floor_y: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 450.0,
            floor_y: 400.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub friction_base: f32,
    /// Speed below which a knocked-back actor counts as settled.
    pub rest_epsilon: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.8,
            friction_base: 0.85,
            rest_epsilon: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    pub spawn_x: f32,
    pub move_accel: f32,
    pub max_run_speed: f32,
    pub jump_velocity: f32,
    pub dash_speed: f32,
    pub dash_cooldown_ticks: f32,
    pub attack_window_ticks: f32,
    pub melee_reach: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 48.0,
            spawn_x: 100.0,
            move_accel: 1.2,
            max_run_speed: 6.0,
            jump_velocity: -15.0,
            dash_speed: 18.0,
            dash_cooldown_ticks: 60.0,
            attack_window_ticks: 15.0,
            melee_reach: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub score: u32,
    pub exp: u32,
    pub gold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub melee_knockback: f32,
    pub ranged_knockback: f32,
    pub contact_knockback: f32,
    pub boss_knockback_scale: f32,
    pub weakness_chance: f64,
    pub weakness_multiplier: f32,
    pub minion_contact_damage: u32,
    pub boss_contact_damage: u32,
    pub minion_hit_range: f32,
    pub boss_hit_range: f32,
    pub minion_reward: Reward,
    pub boss_reward: Reward,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            melee_knockback: 8.0,
            ranged_knockback: 5.0,
            contact_knockback: 10.0,
            boss_knockback_scale: 0.3,
            weakness_chance: 0.2,
            weakness_multiplier: 1.5,
            minion_contact_damage: 5,
            boss_contact_damage: 20,
            minion_hit_range: 40.0,
            boss_hit_range: 80.0,
            minion_reward: Reward {
                score: 100,
                exp: 10,
                gold: 5,
            },
            boss_reward: Reward {
                score: 500,
                exp: 100,
                gold: 50,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Per-tick spawn probability at a time scale of 1.0.
    pub spawn_chance: f64,
    pub max_minions: usize,
    pub initial_minions: usize,
    pub boss_threshold_per_stage: u32,
    pub minion_health: u32,
    pub boss_health: u32,
    pub stage_scaling: f32,
    pub minion_size: (f32, f32),
    pub boss_size: (f32, f32),
    pub aggro_range: f32,
    pub stop_distance: f32,
    pub minion_accel: f32,
    pub boss_accel: f32,
    pub minion_max_speed: f32,
    pub boss_max_speed: f32,
    pub boss_volley_interval_ticks: f32,
    pub boss_volley_damage: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_chance: 0.02,
            max_minions: 5,
            initial_minions: 2,
            boss_threshold_per_stage: 10,
            minion_health: 30,
            boss_health: 200,
            stage_scaling: 0.5,
            minion_size: (40.0, 40.0),
            boss_size: (96.0, 96.0),
            aggro_range: 400.0,
            stop_distance: 20.0,
            minion_accel: 0.4,
            boss_accel: 0.25,
            minion_max_speed: 3.0,
            boss_max_speed: 2.0,
            boss_volley_interval_ticks: 120.0,
            boss_volley_damage: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("ticks_per_second must be greater than zero")]
    ZeroTickRate,
    #[error("time_scale_cap must be finite and positive, got {0}")]
    InvalidTimeScaleCap(f32),
    #[error("pool_capacity must be greater than zero")]
    ZeroPoolCapacity,
    #[error("friction_base must be in (0, 1], got {0}")]
    InvalidFriction(f32),
    #[error("world dimensions must be positive and the floor inside the world ({width}x{height}, floor {floor_y})")]
    InvalidWorld {
        width: f32,
        height: f32,
        floor_y: f32,
    },
    #[error("boss width {width} is below the boss size threshold {threshold}")]
    BossTooSmall { width: f32, threshold: f32 },
    #[error("minion width {width} reaches the boss size threshold {threshold}")]
    MinionTooLarge { width: f32, threshold: f32 },
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.ticks_per_second == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        let cap = self.clock.time_scale_cap;
        if !cap.is_finite() || cap <= 0.0 {
            return Err(ConfigError::InvalidTimeScaleCap(cap));
        }
        if self.pool_capacity == 0 {
            return Err(ConfigError::ZeroPoolCapacity);
        }
        let friction = self.physics.friction_base;
        if !(friction > 0.0 && friction <= 1.0) {
            return Err(ConfigError::InvalidFriction(friction));
        }
        let world = self.world;
        if world.width <= 0.0
            || world.height <= 0.0
            || world.floor_y <= 0.0
            || world.floor_y > world.height
        {
            return Err(ConfigError::InvalidWorld {
                width: world.width,
                height: world.height,
                floor_y: world.floor_y,
            });
        }
        if self.spawn.boss_size.0 < BOSS_MIN_WIDTH {
            return Err(ConfigError::BossTooSmall {
                width: self.spawn.boss_size.0,
                threshold: BOSS_MIN_WIDTH,
            });
        }
        if self.spawn.minion_size.0 >= BOSS_MIN_WIDTH {
            return Err(ConfigError::MinionTooLarge {
                width: self.spawn.minion_size.0,
                threshold: BOSS_MIN_WIDTH,
            });
        }
        for (name, value) in [
            ("spawn_chance", self.spawn.spawn_chance),
            ("weakness_chance", self.combat.weakness_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }

    pub fn ticks_per_second(&self) -> f32 {
        self.clock.ticks_per_second as f32
    }
}
