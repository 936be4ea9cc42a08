use rand::Rng;
use tracing::{debug, info};

use super::entity::{AnimState, Body, DamageType, EnemyEntity, EnemyId, Facing, Vec2};
use super::events::{SimEvent, SimulationEvents};
use super::physics::{accelerate_horizontal, decay_timer};
use super::pool::ProjectileOwner;
use super::skills::{aim_direction, configure_projectile};
use super::state::SimulationState;

/// Health and contact damage multiplier for a stage. Stage 1 is unscaled.
pub fn stage_multiplier(stage: u32, stage_scaling: f32) -> f32 {
    1.0 + stage.saturating_sub(1) as f32 * stage_scaling.max(0.0)
}

/// Cumulative defeats required before the boss of `stage` may spawn.
pub fn boss_threshold(stage: u32, per_stage: u32) -> u32 {
    per_stage.saturating_mul(stage.max(1))
}

fn scaled(value: u32, multiplier: f32) -> u32 {
    (value as f32 * multiplier).round().max(1.0) as u32
}

/// Steers every enemy toward the player. Enemies reeling from a hit keep
/// their knockback and do not steer.
pub fn update_pursuit(state: &mut SimulationState, time_scale: f32) {
    let spawn = state.config.spawn;
    let player_alive = state.player.is_alive();
    let target_x = state.player.body.center().x;

    for enemy in &mut state.enemies {
        if matches!(enemy.anim, AnimState::Hit | AnimState::Dead) {
            continue;
        }
        let center_x = enemy.body.center().x;
        let distance = (target_x - center_x).abs();
        if player_alive && distance <= spawn.aggro_range && distance > spawn.stop_distance {
            enemy.facing = Facing::toward(center_x, target_x);
            let (accel, max_speed) = if enemy.is_boss() {
                (spawn.boss_accel, spawn.boss_max_speed)
            } else {
                (spawn.minion_accel, spawn.minion_max_speed)
            };
            accelerate_horizontal(
                &mut enemy.body,
                accel * enemy.facing.sign(),
                max_speed,
                time_scale,
            );
            enemy.anim = AnimState::Run;
        } else {
            enemy.anim = AnimState::Idle;
        }
    }
}

/// Counts down each boss's volley timer and fires an enemy-owned `dark`
/// projectile at the player when it runs out.
pub fn update_boss_volleys(state: &mut SimulationState, time_scale: f32) {
    if !state.player.is_alive() {
        return;
    }
    let spawn = state.config.spawn;
    let multiplier = stage_multiplier(state.stage, spawn.stage_scaling);
    let damage = scaled(spawn.boss_volley_damage, multiplier);
    let target_x = state.player.body.center().x;

    let mut origins = Vec::new();
    for enemy in state.enemies.iter_mut().filter(|enemy| enemy.is_boss()) {
        if enemy.anim == AnimState::Hit {
            continue;
        }
        decay_timer(&mut enemy.volley_timer, time_scale);
        if enemy.volley_timer <= 0.0 {
            enemy.volley_timer = spawn.boss_volley_interval_ticks;
            origins.push((enemy.id, enemy.body.center()));
        }
    }

    for (id, origin) in origins {
        let mut projectile = state.pool.acquire();
        configure_projectile(
            &mut projectile,
            DamageType::Dark,
            origin,
            aim_direction(origin.x, target_x),
            damage,
            ProjectileOwner::Enemy,
        );
        state.projectiles.push(projectile);
        debug!(boss = id.0, damage, "boss_volley_fired");
    }
}

/// Rolls the per-tick spawn chance scaled by `time_scale`. Spawning pauses
/// while a boss is up and after the stage is cleared.
pub fn run_spawn_director(
    state: &mut SimulationState,
    time_scale: f32,
    events: &mut SimulationEvents,
) {
    if !state.is_running() || state.boss_active || state.stage_cleared {
        return;
    }
    let spawn = state.config.spawn;
    let chance = (spawn.spawn_chance * f64::from(time_scale.max(0.0))).min(1.0);
    if chance <= 0.0 || !state.rng.random_bool(chance) {
        return;
    }

    let threshold = boss_threshold(state.stage, spawn.boss_threshold_per_stage);
    if !state.boss_spawned_this_stage && state.defeated_count >= threshold {
        spawn_boss(state, events);
    } else if state.minion_count() < spawn.max_minions {
        spawn_minion(state, events);
    }
}

/// Tops the stage up to `initial_minions` without exceeding the minion cap.
pub fn seed_initial_minions(state: &mut SimulationState, events: &mut SimulationEvents) {
    let spawn = state.config.spawn;
    let room = spawn.max_minions.saturating_sub(state.minion_count());
    let count = spawn.initial_minions.min(room);
    for _ in 0..count {
        spawn_minion(state, events);
    }
}

pub fn spawn_minion(state: &mut SimulationState, events: &mut SimulationEvents) -> EnemyId {
    let spawn = state.config.spawn;
    let multiplier = stage_multiplier(state.stage, spawn.stage_scaling);
    let health = scaled(spawn.minion_health, multiplier);
    let contact_damage = scaled(state.config.combat.minion_contact_damage, multiplier);
    let id = spawn_enemy(state, spawn.minion_size, health, contact_damage, 0.0);
    debug!(enemy = id.0, stage = state.stage, health, "minion_spawned");
    events.push(SimEvent::EnemySpawned { id, boss: false });
    id
}

pub fn spawn_boss(state: &mut SimulationState, events: &mut SimulationEvents) -> EnemyId {
    let spawn = state.config.spawn;
    let multiplier = stage_multiplier(state.stage, spawn.stage_scaling);
    let health = scaled(spawn.boss_health, multiplier);
    let contact_damage = scaled(state.config.combat.boss_contact_damage, multiplier);
    let id = spawn_enemy(
        state,
        spawn.boss_size,
        health,
        contact_damage,
        spawn.boss_volley_interval_ticks,
    );
    state.boss_active = true;
    state.boss_spawned_this_stage = true;
    let stage = state.stage;
    info!(enemy = id.0, stage, health, defeated = state.defeated_count, "boss_spawned");
    events.push(SimEvent::EnemySpawned { id, boss: true });
    events.push(SimEvent::BossSpawned { id, stage });
    id
}

fn spawn_enemy(
    state: &mut SimulationState,
    size: (f32, f32),
    health: u32,
    contact_damage: u32,
    volley_timer: f32,
) -> EnemyId {
    let id = state.alloc_enemy_id();
    let size = Vec2::new(size.0, size.1);
    let world = state.config.world;
    // Enter from whichever wall is farther from the player; ties go right.
    let player_x = state.player.body.center().x;
    let x = if player_x > world.width * 0.5 {
        0.0
    } else {
        world.width - size.x
    };
    let mut body = Body::new(Vec2::new(x, world.floor_y - size.y), size);
    body.grounded = true;
    let element = DamageType::ALL[state.rng.random_range(0..DamageType::ALL.len())];
    let health = i32::try_from(health).unwrap_or(i32::MAX);
    state.enemies.push(EnemyEntity {
        id,
        body,
        health,
        max_health: health,
        anim: AnimState::Idle,
        facing: Facing::toward(x, player_x),
        element,
        contact_damage,
        volley_timer,
    });
    id
}
