use rand::Rng;
use tracing::{debug, info};

use crate::audio::AudioCue;
use crate::meta::SyncReason;

use super::deferred::DeferredAction;
use super::entity::{Aabb, AnimState, Body, EnemyEntity, Facing, Vec2};
use super::events::{SimEvent, SimulationEvents};
use super::fx::{DEATH_PARTICLE_COUNT, HIT_PARTICLE_COUNT};
use super::pool::{Projectile, ProjectileOwner};
use super::state::{SessionPhase, SimulationState};

const MELEE_PARTICLE_COLOR: &str = "#ffffff";
const PLAYER_HIT_PARTICLE_COLOR: &str = "#ef4444";
const MINION_DEATH_COLOR: &str = "#94a3b8";
const BOSS_DEATH_COLOR: &str = "#dc2626";
const HIT_PARTICLE_SPEED: f32 = 4.0;
const DEATH_PARTICLE_SPEED: f32 = 6.0;
const CONTACT_KNOCKBACK_LIFT: f32 = -4.0;

pub fn melee_damage(strength: u32) -> u32 {
    1 + strength / 2
}

/// Applies the weakness roll to a base damage value. The result is always
/// `floor(base)` or `floor(base * multiplier)`.
pub fn roll_ranged_damage<R: Rng>(
    rng: &mut R,
    base: u32,
    chance: f64,
    multiplier: f32,
) -> (u32, bool) {
    let critical = rng.random_bool(chance.clamp(0.0, 1.0));
    let scale = if critical { multiplier } else { 1.0 };
    let damage = (base as f32 * scale).floor().max(0.0) as u32;
    (damage, critical)
}

/// The box in front of the player that a melee swing covers.
pub fn melee_swing_box(body: &Body, facing: Facing, reach: f32) -> Aabb {
    let half_width = body.size.x * 0.5;
    let (min_x, max_x) = match facing {
        Facing::Right => (
            body.position.x + half_width,
            body.position.x + body.size.x + reach,
        ),
        Facing::Left => (body.position.x - reach, body.position.x + half_width),
    };
    Aabb {
        min: Vec2::new(min_x, body.position.y),
        max: Vec2::new(max_x, body.position.y + body.size.y),
    }
}

fn knockback_scale(enemy: &EnemyEntity, boss_scale: f32) -> f32 {
    if enemy.is_boss() {
        boss_scale
    } else {
        1.0
    }
}

/// Resolves a melee swing exactly once per entry into `attack`. The edge flag
/// is consumed here whether or not anything was in reach.
pub fn resolve_melee(state: &mut SimulationState, events: &mut SimulationEvents) {
    if !state.player.entered_attack {
        return;
    }
    state.player.entered_attack = false;
    if !state.player.is_alive() {
        return;
    }

    let damage = melee_damage(state.player.strength);
    let facing = state.player.facing;
    let swing = melee_swing_box(&state.player.body, facing, state.config.player.melee_reach);
    let knockback = state.config.combat.melee_knockback;
    let boss_scale = state.config.combat.boss_knockback_scale;

    for enemy in &mut state.enemies {
        if !enemy.is_alive() || !swing.overlaps(&enemy.body.aabb()) {
            continue;
        }
        enemy.apply_damage(damage);
        enemy.body.velocity.x = facing.sign() * knockback * knockback_scale(enemy, boss_scale);
        enemy.anim = AnimState::Hit;
        let center = enemy.body.center();
        state.fx.spawn_burst(
            &mut state.rng,
            center,
            HIT_PARTICLE_COUNT,
            HIT_PARTICLE_SPEED,
            MELEE_PARTICLE_COLOR,
        );
        state.fx.spawn_damage_number(
            Vec2::new(center.x, enemy.body.position.y),
            damage,
            false,
        );
        events.cue(AudioCue::EnemyHit);
        events.push(SimEvent::EnemyDamaged {
            id: enemy.id,
            amount: damage,
            critical: false,
            health_after: enemy.health,
        });
        debug!(enemy = enemy.id.0, damage, health_after = enemy.health, "melee_hit");
    }
}

/// Tests every active projectile and consumes the ones that hit something.
/// Player shots hit the first overlapping enemy in list order.
pub fn resolve_projectiles(state: &mut SimulationState, events: &mut SimulationEvents) {
    let projectiles = std::mem::take(&mut state.projectiles);
    let mut remaining = Vec::with_capacity(projectiles.len());
    for projectile in projectiles {
        let consumed = match projectile.owner {
            ProjectileOwner::Player => hit_first_enemy(state, &projectile, events),
            ProjectileOwner::Enemy => hit_player(state, &projectile, events),
        };
        if consumed {
            state.pool.release(projectile);
        } else {
            remaining.push(projectile);
        }
    }
    state.projectiles = remaining;
}

fn hit_first_enemy(
    state: &mut SimulationState,
    projectile: &Projectile,
    events: &mut SimulationEvents,
) -> bool {
    let bounds = projectile.aabb();
    let Some(index) = state
        .enemies
        .iter()
        .position(|enemy| enemy.is_alive() && bounds.overlaps(&enemy.body.aabb()))
    else {
        return false;
    };

    let combat = state.config.combat;
    let (damage, critical) = roll_ranged_damage(
        &mut state.rng,
        projectile.damage,
        combat.weakness_chance,
        combat.weakness_multiplier,
    );
    let enemy = &mut state.enemies[index];
    enemy.apply_damage(damage);
    let direction = if projectile.velocity.x < 0.0 { -1.0 } else { 1.0 };
    enemy.body.velocity.x =
        direction * combat.ranged_knockback * knockback_scale(enemy, combat.boss_knockback_scale);
    enemy.anim = AnimState::Hit;
    let center = enemy.body.center();
    let label_position = Vec2::new(center.x, enemy.body.position.y);
    let id = enemy.id;
    let health_after = enemy.health;

    state.fx.spawn_burst(
        &mut state.rng,
        center,
        HIT_PARTICLE_COUNT,
        HIT_PARTICLE_SPEED,
        projectile.color,
    );
    state
        .fx
        .spawn_damage_number(label_position, damage, critical);
    events.cue(AudioCue::EnemyHit);
    events.push(SimEvent::EnemyDamaged {
        id,
        amount: damage,
        critical,
        health_after,
    });
    true
}

fn hit_player(
    state: &mut SimulationState,
    projectile: &Projectile,
    events: &mut SimulationEvents,
) -> bool {
    let player = &state.player;
    if !player.is_alive() || !projectile.aabb().overlaps(&player.body.aabb()) {
        return false;
    }
    if matches!(player.anim, AnimState::Hit | AnimState::Attack) {
        return false;
    }
    let direction = if projectile.velocity.x < 0.0 { -1.0 } else { 1.0 };
    damage_player(state, projectile.damage, direction, events);
    true
}

/// Enemy bodies damage the player on contact unless the player is already
/// reeling or mid-attack.
pub fn resolve_contact(state: &mut SimulationState, events: &mut SimulationEvents) {
    let player = &state.player;
    if !player.is_alive() || matches!(player.anim, AnimState::Hit | AnimState::Attack) {
        return;
    }
    let player_center = player.body.center();
    let combat = state.config.combat;
    let attacker = state.enemies.iter().find(|enemy| {
        let range = if enemy.is_boss() {
            combat.boss_hit_range
        } else {
            combat.minion_hit_range
        };
        let center = enemy.body.center();
        let dx = player_center.x - center.x;
        let dy = player_center.y - center.y;
        enemy.is_alive() && dx * dx + dy * dy <= range * range
    });
    let Some(attacker) = attacker else {
        return;
    };
    let damage = attacker.contact_damage;
    let direction = if player_center.x < attacker.body.center().x {
        -1.0
    } else {
        1.0
    };
    damage_player(state, damage, direction, events);
}

fn damage_player(
    state: &mut SimulationState,
    damage: u32,
    direction: f32,
    events: &mut SimulationEvents,
) {
    let amount = i32::try_from(damage).unwrap_or(i32::MAX);
    let player = &mut state.player;
    player.health = player.health.saturating_sub(amount).max(0);
    player.anim = AnimState::Hit;
    player.attack_window = 0.0;
    player.entered_attack = false;
    player.body.velocity.x = direction * state.config.combat.contact_knockback;
    player.body.velocity.y = CONTACT_KNOCKBACK_LIFT;
    player.body.grounded = false;
    let center = player.body.center();
    let health_after = player.health;

    state.fx.spawn_burst(
        &mut state.rng,
        center,
        HIT_PARTICLE_COUNT,
        HIT_PARTICLE_SPEED,
        PLAYER_HIT_PARTICLE_COLOR,
    );
    events.cue(AudioCue::Hit);
    events.push(SimEvent::PlayerDamaged {
        amount: damage,
        health_after,
    });
}

/// Removes dead enemies, pays out their rewards and handles boss and player
/// death side effects.
pub fn resolve_deaths(state: &mut SimulationState, events: &mut SimulationEvents) {
    let mut fallen = Vec::new();
    state.enemies.retain(|enemy| {
        if enemy.is_alive() {
            true
        } else {
            fallen.push(enemy.clone());
            false
        }
    });
    for enemy in fallen {
        handle_enemy_death(state, &enemy, events);
    }

    if state.phase == SessionPhase::Running && !state.player.is_alive() {
        handle_player_death(state, events);
    }
}

fn handle_enemy_death(
    state: &mut SimulationState,
    enemy: &EnemyEntity,
    events: &mut SimulationEvents,
) {
    let boss = enemy.is_boss();
    let reward = if boss {
        state.config.combat.boss_reward
    } else {
        state.config.combat.minion_reward
    };
    state.defeated_count = state.defeated_count.saturating_add(1);
    state.score = state.score.saturating_add(u64::from(reward.score));
    state.rewards.add(reward);

    let color = if boss { BOSS_DEATH_COLOR } else { MINION_DEATH_COLOR };
    state.fx.spawn_burst(
        &mut state.rng,
        enemy.body.center(),
        DEATH_PARTICLE_COUNT,
        DEATH_PARTICLE_SPEED,
        color,
    );
    events.cue(AudioCue::EnemyDeath);
    events.push(SimEvent::EnemyDefeated {
        id: enemy.id,
        boss,
        score_gained: reward.score,
    });

    if !boss {
        return;
    }
    state.boss_active = false;
    state.stage_cleared = true;
    let stage = state.stage;
    info!(stage, defeated = state.defeated_count, score = state.score, "boss_defeated");
    events.cue(AudioCue::StageClear);
    events.push(SimEvent::StageCleared { stage });
    let sync = state
        .rewards
        .flush(&mut state.player, SyncReason::BossDefeated);
    events.syncs.push(sync);
    state.deferred.schedule(
        state.config.stage_advance_delay_ms,
        DeferredAction::AdvanceStage {
            next_stage: stage.saturating_add(1),
        },
    );
}

fn handle_player_death(state: &mut SimulationState, events: &mut SimulationEvents) {
    state.phase = SessionPhase::GameOver;
    state.player.anim = AnimState::Dead;
    state.player.entered_attack = false;
    state.deferred.cancel_all();
    info!(stage = state.stage, score = state.score, "player_died");
    events.cue(AudioCue::GameOver);
    events.push(SimEvent::PlayerDied);
    let sync = state.rewards.flush(&mut state.player, SyncReason::PlayerDied);
    events.syncs.push(sync);
}

/// `hit` falls back to `idle` once the knockback has bled off on the ground.
pub fn clear_settled_hits(state: &mut SimulationState) {
    let epsilon = state.config.physics.rest_epsilon;
    if state.player.anim == AnimState::Hit && is_settled(&state.player.body, epsilon) {
        state.player.anim = AnimState::Idle;
    }
    for enemy in &mut state.enemies {
        if enemy.anim == AnimState::Hit && is_settled(&enemy.body, epsilon) {
            enemy.anim = AnimState::Idle;
        }
    }
}

fn is_settled(body: &Body, epsilon: f32) -> bool {
    body.grounded && body.velocity.length() < epsilon
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::config::EngineConfig;
    use crate::meta::MetaGameState;
    use crate::sim::entity::{DamageType, EnemyId};
    use crate::sim::skills::configure_projectile;

    fn new_state() -> SimulationState {
        SimulationState::new(EngineConfig::default(), &MetaGameState::starter(), 99)
    }

    fn enemy_at(state: &mut SimulationState, x: f32, width: f32, health: i32) -> EnemyId {
        let id = state.alloc_enemy_id();
        let floor_y = state.config.world.floor_y;
        let mut body = Body::new(Vec2::new(x, floor_y - width), Vec2::new(width, width));
        body.grounded = true;
        state.enemies.push(EnemyEntity {
            id,
            body,
            health,
            max_health: health,
            anim: AnimState::Idle,
            facing: Facing::Left,
            element: DamageType::Ice,
            contact_damage: if width >= 80.0 { 20 } else { 5 },
            volley_timer: 0.0,
        });
        id
    }

    fn player_shot(state: &mut SimulationState, x: f32, y: f32, damage: u32) {
        let mut projectile = state.pool.acquire();
        configure_projectile(
            &mut projectile,
            DamageType::Fire,
            Vec2::new(x, y),
            1.0,
            damage,
            ProjectileOwner::Player,
        );
        state.projectiles.push(projectile);
    }

    fn enemy_shot_at_player(state: &mut SimulationState, damage: u32) {
        let center = state.player.body.center();
        let mut projectile = state.pool.acquire();
        configure_projectile(
            &mut projectile,
            DamageType::Dark,
            center,
            -1.0,
            damage,
            ProjectileOwner::Enemy,
        );
        state.projectiles.push(projectile);
    }

    #[test]
    fn enemy_shot_damages_idle_player() {
        let mut state = new_state();
        enemy_shot_at_player(&mut state, 10);

        let mut events = SimulationEvents::default();
        resolve_projectiles(&mut state, &mut events);

        assert_eq!(state.player.health, 90);
        assert_eq!(state.player.anim, AnimState::Hit);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn attacking_player_is_not_hit_by_enemy_shot() {
        let mut state = new_state();
        state.player.begin_attack(15.0, false);
        enemy_shot_at_player(&mut state, 10);

        let mut events = SimulationEvents::default();
        resolve_projectiles(&mut state, &mut events);

        assert_eq!(state.player.health, 100);
        assert_eq!(state.player.anim, AnimState::Attack);
        assert!(state.player.attack_window > 0.0);
        assert_eq!(state.projectiles.len(), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn melee_hit_reduces_health_by_strength_formula() {
        let mut state = new_state();
        state.player.strength = 20;
        let player_x = state.player.body.position.x;
        let id = enemy_at(&mut state, player_x + 40.0, 40.0, 50);
        state.player.begin_attack(15.0, true);

        let mut events = SimulationEvents::default();
        resolve_melee(&mut state, &mut events);

        let enemy = state.find_enemy(id).expect("enemy");
        assert_eq!(enemy.health, 39);
        assert!(enemy.is_alive());
        assert!(enemy.body.velocity.x > 0.0);
    }

    #[test]
    fn holding_attack_applies_melee_once() {
        let mut state = new_state();
        state.player.strength = 20;
        let player_x = state.player.body.position.x;
        let id = enemy_at(&mut state, player_x + 40.0, 40.0, 100);
        state.player.begin_attack(15.0, true);

        let mut events = SimulationEvents::default();
        for _ in 0..10 {
            resolve_melee(&mut state, &mut events);
            state.player.begin_attack(15.0, true);
        }

        assert_eq!(state.find_enemy(id).expect("enemy").health, 89);
        assert_eq!(
            events.count_where(|event| matches!(event, SimEvent::EnemyDamaged { .. })),
            1
        );
    }

    #[test]
    fn melee_misses_enemies_behind_the_player() {
        let mut state = new_state();
        let player_x = state.player.body.position.x;
        let id = enemy_at(&mut state, player_x - 60.0, 40.0, 50);
        state.player.facing = Facing::Right;
        state.player.begin_attack(15.0, true);

        resolve_melee(&mut state, &mut SimulationEvents::default());

        assert_eq!(state.find_enemy(id).expect("enemy").health, 50);
        assert!(!state.player.entered_attack);
    }

    #[test]
    fn boss_knockback_is_scaled_down() {
        let mut state = new_state();
        let player_x = state.player.body.position.x;
        enemy_at(&mut state, player_x + 40.0, 96.0, 500);
        state.player.begin_attack(15.0, true);
        resolve_melee(&mut state, &mut SimulationEvents::default());

        let expected =
            state.config.combat.melee_knockback * state.config.combat.boss_knockback_scale;
        assert!((state.enemies[0].body.velocity.x - expected).abs() < 1e-5);
    }

    #[test]
    fn ranged_damage_is_base_or_boosted_floor() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut boosted = 0;
        for _ in 0..500 {
            let (damage, critical) = roll_ranged_damage(&mut rng, 15, 0.2, 1.5);
            if critical {
                assert_eq!(damage, 22);
                boosted += 1;
            } else {
                assert_eq!(damage, 15);
            }
        }
        assert!(boosted > 0 && boosted < 500);
    }

    #[test]
    fn projectile_hits_first_enemy_in_list_order_only() {
        let mut state = new_state();
        let first = enemy_at(&mut state, 300.0, 40.0, 100);
        let second = enemy_at(&mut state, 300.0, 40.0, 100);
        let floor_y = state.config.world.floor_y;
        player_shot(&mut state, 305.0, floor_y - 30.0, 10);
        let free_before = state.pool.free_len();

        resolve_projectiles(&mut state, &mut SimulationEvents::default());

        assert!(state.find_enemy(first).expect("first").health < 100);
        assert_eq!(state.find_enemy(second).expect("second").health, 100);
        assert!(state.projectiles.is_empty());
        assert_eq!(state.pool.free_len(), free_before + 1);
    }

    #[test]
    fn projectile_that_misses_stays_active() {
        let mut state = new_state();
        enemy_at(&mut state, 600.0, 40.0, 100);
        player_shot(&mut state, 100.0, 100.0, 10);

        resolve_projectiles(&mut state, &mut SimulationEvents::default());
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn contact_damages_idle_player_once() {
        let mut state = new_state();
        let player_x = state.player.body.position.x;
        enemy_at(&mut state, player_x + 10.0, 40.0, 30);
        let mut events = SimulationEvents::default();

        resolve_contact(&mut state, &mut events);
        resolve_contact(&mut state, &mut events);

        assert_eq!(state.player.health, 95);
        assert_eq!(state.player.anim, AnimState::Hit);
        assert_eq!(events.audio, vec![AudioCue::Hit]);
    }

    #[test]
    fn boss_contact_deals_twenty() {
        let mut state = new_state();
        let player_x = state.player.body.position.x;
        enemy_at(&mut state, player_x, 96.0, 300);
        resolve_contact(&mut state, &mut SimulationEvents::default());
        assert_eq!(state.player.health, 80);
    }

    #[test]
    fn attacking_player_ignores_contact() {
        let mut state = new_state();
        let player_x = state.player.body.position.x;
        enemy_at(&mut state, player_x + 10.0, 40.0, 30);
        state.player.begin_attack(15.0, false);
        resolve_contact(&mut state, &mut SimulationEvents::default());
        assert_eq!(state.player.health, 100);
    }

    #[test]
    fn minion_death_pays_tiered_reward() {
        let mut state = new_state();
        let id = enemy_at(&mut state, 500.0, 40.0, 10);
        state.enemies[0].health = 0;
        let mut events = SimulationEvents::default();

        resolve_deaths(&mut state, &mut events);

        assert!(state.find_enemy(id).is_none());
        assert_eq!(state.defeated_count, 1);
        assert_eq!(state.score, 100);
        assert_eq!(state.rewards.pending_exp(), 10);
        assert_eq!(state.rewards.pending_gold(), 5);
        assert!(events.syncs.is_empty());
    }

    #[test]
    fn boss_death_clears_flag_syncs_and_schedules_advance() {
        let mut state = new_state();
        enemy_at(&mut state, 500.0, 96.0, 10);
        state.boss_active = true;
        state.enemies[0].health = 0;
        let mut events = SimulationEvents::default();

        resolve_deaths(&mut state, &mut events);

        assert!(!state.boss_active);
        assert!(state.stage_cleared);
        assert_eq!(state.defeated_count, 1);
        assert_eq!(state.score, 500);
        assert_eq!(events.syncs.len(), 1);
        assert_eq!(events.syncs[0].exp_gained, 100);
        assert_eq!(events.syncs[0].gold_gained, 50);
        assert_eq!(state.rewards.pending_exp(), 0);
        assert_eq!(state.deferred.pending(), 1);
        assert!(events.audio.contains(&AudioCue::StageClear));
    }

    #[test]
    fn player_death_ends_session_and_flushes_once() {
        let mut state = new_state();
        state.player.health = 0;
        let mut events = SimulationEvents::default();

        resolve_deaths(&mut state, &mut events);
        resolve_deaths(&mut state, &mut events);

        assert_eq!(state.phase, SessionPhase::GameOver);
        assert_eq!(events.syncs.len(), 1);
        assert_eq!(events.syncs[0].reason, SyncReason::PlayerDied);
        assert_eq!(events.count_where(|event| *event == SimEvent::PlayerDied), 1);
    }

    #[test]
    fn settled_hit_reverts_to_idle() {
        let mut state = new_state();
        state.player.anim = AnimState::Hit;
        state.player.body.velocity = Vec2::new(2.0, 0.0);
        clear_settled_hits(&mut state);
        assert_eq!(state.player.anim, AnimState::Hit);

        state.player.body.velocity = Vec2::ZERO;
        state.player.body.grounded = true;
        clear_settled_hits(&mut state);
        assert_eq!(state.player.anim, AnimState::Idle);
    }
}
