use thiserror::Error;
use tracing::{debug, info};

use crate::assets::StageArt;
use crate::audio::AudioCue;
use crate::config::{ConfigError, EngineConfig};
use crate::input::{InputSnapshot, Intents, QUICK_SLOT_COUNT};
use crate::meta::{MetaGameState, QuickSlotBinding, SyncReason};
use crate::render::{build_frame, RenderFrame};

use super::ai;
use super::combat;
use super::deferred::DeferredAction;
use super::entity::{AnimState, Facing, PlayerEntity};
use super::events::{SimEvent, SimulationEvents};
use super::physics::{accelerate_horizontal, decay_timer, step_body, try_dash, try_jump};
use super::skills::cast;
use super::state::{SessionPhase, SimulationState};

const RUN_ANIM_SPEED: f32 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    Config(#[from] ConfigError),
    #[error("quick slot {slot} is out of range (only {max} slots are mapped)")]
    QuickSlotOutOfRange { slot: u8, max: usize },
}

/// One play session. The host calls [`Engine::tick`] then [`Engine::render`]
/// once per frame and [`Engine::teardown`] when the session ends.
#[derive(Debug)]
pub struct Engine {
    state: SimulationState,
    art: StageArt,
}

impl Engine {
    pub fn new(config: EngineConfig, meta: &MetaGameState, seed: u64) -> Result<Self, EngineError> {
        config.validate()?;
        if let Some(slot) = meta
            .quick_slots
            .keys()
            .copied()
            .find(|slot| usize::from(*slot) >= QUICK_SLOT_COUNT)
        {
            return Err(EngineError::QuickSlotOutOfRange {
                slot,
                max: QUICK_SLOT_COUNT,
            });
        }

        let mut state = SimulationState::new(config, meta, seed);
        ai::seed_initial_minions(&mut state, &mut SimulationEvents::default());
        info!(
            seed,
            skills = state.skills.len(),
            minions = state.minion_count(),
            "engine_started"
        );
        Ok(Self {
            state,
            art: StageArt::default(),
        })
    }

    /// Advances the simulation by one frame of `dt_ms` wall-clock time.
    pub fn tick(&mut self, dt_ms: f32, input: &InputSnapshot) -> SimulationEvents {
        let mut events = SimulationEvents::default();
        if self.state.phase == SessionPhase::TornDown {
            return events;
        }
        let state = &mut self.state;
        let step = state.clock.advance(dt_ms);
        let time_scale = step.time_scale;

        for action in state.deferred.advance(step.elapsed_ms) {
            apply_deferred(state, action, &mut events);
        }

        if state.is_running() && state.player.is_alive() {
            let intents = Intents::from_snapshot(input);
            apply_intents(state, &intents, time_scale, &mut events);
        }

        state.cooldowns.decay(time_scale);
        decay_timer(&mut state.player.dash_cooldown, time_scale);
        state.player.decay_attack_window(time_scale);

        step_body(
            &mut state.player.body,
            &state.config.physics,
            &state.config.world,
            time_scale,
        );
        update_player_anim(&mut state.player);

        ai::update_pursuit(state, time_scale);
        for enemy in &mut state.enemies {
            step_body(
                &mut enemy.body,
                &state.config.physics,
                &state.config.world,
                time_scale,
            );
        }
        if state.is_running() {
            ai::update_boss_volleys(state, time_scale);
            ai::run_spawn_director(state, time_scale, &mut events);
        }

        advance_projectiles(state, time_scale);

        if state.is_running() {
            combat::resolve_melee(state, &mut events);
            combat::resolve_projectiles(state, &mut events);
            combat::resolve_contact(state, &mut events);
            combat::resolve_deaths(state, &mut events);
        }
        combat::clear_settled_hits(state);

        state.fx.update(time_scale, state.config.physics.gravity);
        state.player.clamp_vitals();
        events
    }

    pub fn render(&self) -> RenderFrame {
        build_frame(&self.state, &self.art)
    }

    /// Cancels every deferred action and flushes the final sync. Further
    /// ticks are no-ops.
    pub fn teardown(&mut self) -> SimulationEvents {
        let mut events = SimulationEvents::default();
        if self.state.phase == SessionPhase::TornDown {
            return events;
        }
        let state = &mut self.state;
        let cancelled = state.deferred.cancel_all();
        let sync = state.rewards.flush(&mut state.player, SyncReason::Teardown);
        events.syncs.push(sync);
        state.clear_projectiles();
        state.fx.clear();
        state.phase = SessionPhase::TornDown;
        info!(
            cancelled,
            stage = state.stage,
            score = state.score,
            ticks = state.clock.tick_count(),
            transient_projectiles = state.pool.transient_allocations(),
            "engine_torn_down"
        );
        events
    }

    /// Replaces the art used by `render`. The host loads it outside `tick`.
    pub fn set_stage_art(&mut self, art: StageArt) {
        self.art = art;
    }

    pub fn stage_art(&self) -> &StageArt {
        &self.art
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn stage(&self) -> u32 {
        self.state.stage
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn player(&self) -> &PlayerEntity {
        &self.state.player
    }
}

fn apply_deferred(
    state: &mut SimulationState,
    action: DeferredAction,
    events: &mut SimulationEvents,
) {
    match action {
        DeferredAction::AdvanceStage { next_stage } => {
            if !state.is_running() {
                debug!(next_stage, "stage_advance_skipped");
                return;
            }
            state.stage = next_stage;
            state.boss_active = false;
            state.boss_spawned_this_stage = false;
            state.stage_cleared = false;
            state.clear_projectiles();
            ai::seed_initial_minions(state, events);
            info!(stage = next_stage, defeated = state.defeated_count, "stage_advanced");
            events.push(SimEvent::StageAdvanced { stage: next_stage });
        }
    }
}

fn apply_intents(
    state: &mut SimulationState,
    intents: &Intents,
    time_scale: f32,
    events: &mut SimulationEvents,
) {
    let player_config = state.config.player;
    let reeling = state.player.anim == AnimState::Hit;

    if intents.move_axis != 0.0 && !reeling {
        let player = &mut state.player;
        player.facing = if intents.move_axis < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        };
        // Dash momentum above run speed is left to friction.
        if player.body.velocity.x.abs() <= player_config.max_run_speed {
            accelerate_horizontal(
                &mut player.body,
                intents.move_axis * player_config.move_accel,
                player_config.max_run_speed,
                time_scale,
            );
        }
    }

    if intents.jump && !reeling && try_jump(&mut state.player.body, player_config.jump_velocity) {
        events.cue(AudioCue::Jump);
    }

    if intents.dash && !reeling {
        let player = &mut state.player;
        if let Err(reason) = try_dash(
            &mut player.body,
            &mut player.dash_cooldown,
            player.facing,
            player_config.dash_speed,
            player_config.dash_cooldown_ticks,
        ) {
            debug!(reason = ?reason, remaining = player.dash_cooldown, "dash_rejected");
        }
    }

    if intents.attack
        && !reeling
        && state
            .player
            .begin_attack(player_config.attack_window_ticks, true)
    {
        events.cue(AudioCue::Attack);
    }

    for slot in &intents.quick_slots {
        match state.quick_slots.get(slot).cloned() {
            Some(QuickSlotBinding::Skill(skill_id)) => {
                // Rejections are reported through `events`.
                let _ = cast(state, &skill_id, events);
            }
            Some(QuickSlotBinding::Item(item_id)) => {
                debug!(slot, item = %item_id, "item_use_requested");
                events.push(SimEvent::ItemUseRequested {
                    slot: *slot,
                    item_id,
                });
            }
            None => debug!(slot, "quick_slot_unbound"),
        }
    }
}

fn update_player_anim(player: &mut PlayerEntity) {
    if matches!(
        player.anim,
        AnimState::Attack | AnimState::Hit | AnimState::Dead
    ) {
        return;
    }
    player.anim = if !player.body.grounded {
        AnimState::Jump
    } else if player.body.velocity.x.abs() > RUN_ANIM_SPEED {
        AnimState::Run
    } else {
        AnimState::Idle
    };
}

/// Moves projectiles and returns expired or off-screen ones to the pool.
fn advance_projectiles(state: &mut SimulationState, time_scale: f32) {
    let world = state.config.world;
    let projectiles = std::mem::take(&mut state.projectiles);
    let mut active = Vec::with_capacity(projectiles.len());
    for mut projectile in projectiles {
        projectile.position.x += projectile.velocity.x * time_scale;
        projectile.position.y += projectile.velocity.y * time_scale;
        projectile.life -= time_scale;
        let off_screen = projectile.position.x + projectile.size.x < 0.0
            || projectile.position.x > world.width
            || projectile.position.y + projectile.size.y < 0.0
            || projectile.position.y > world.height;
        if projectile.life <= 0.0 || off_screen {
            state.pool.release(projectile);
        } else {
            active.push(projectile);
        }
    }
    state.projectiles = active;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputAction;
    use crate::sim::entity::{Body, DamageType, EnemyEntity, Vec2};
    use crate::sim::pool::ProjectileOwner;

    const FRAME_MS: f32 = 1000.0 / 60.0;

    fn quiet_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.spawn.initial_minions = 0;
        config.spawn.spawn_chance = 0.0;
        config
    }

    fn quiet_engine() -> Engine {
        Engine::new(quiet_config(), &MetaGameState::starter(), 42).expect("engine")
    }

    fn place_minion(engine: &mut Engine, x: f32, health: i32) {
        let state = &mut engine.state;
        let id = state.alloc_enemy_id();
        let floor_y = state.config.world.floor_y;
        let mut body = Body::new(Vec2::new(x, floor_y - 40.0), Vec2::new(40.0, 40.0));
        body.grounded = true;
        state.enemies.push(EnemyEntity {
            id,
            body,
            health,
            max_health: health,
            anim: AnimState::Idle,
            facing: Facing::Left,
            element: DamageType::Ice,
            contact_damage: 5,
            volley_timer: 0.0,
        });
    }

    fn idle() -> InputSnapshot {
        InputSnapshot::empty()
    }

    #[test]
    fn default_engine_seeds_initial_minions() {
        let engine = Engine::new(EngineConfig::default(), &MetaGameState::starter(), 1)
            .expect("engine");
        assert_eq!(engine.state().minion_count(), 2);
        assert_eq!(engine.stage(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.pool_capacity = 0;
        let error = Engine::new(config, &MetaGameState::starter(), 1).expect_err("invalid");
        assert_eq!(error, EngineError::Config(ConfigError::ZeroPoolCapacity));
    }

    #[test]
    fn out_of_range_quick_slot_is_rejected() {
        let mut meta = MetaGameState::starter();
        meta.quick_slots
            .insert(9, QuickSlotBinding::Item("potion".to_string()));
        let error = Engine::new(quiet_config(), &meta, 1).expect_err("invalid slot");
        assert_eq!(error, EngineError::QuickSlotOutOfRange { slot: 9, max: 4 });
    }

    #[test]
    fn quick_slot_cast_spends_mana_and_fires_right() {
        let mut engine = quiet_engine();
        let events = engine.tick(FRAME_MS, &idle().with_quick_slot_pressed(0, true));

        assert_eq!(engine.player().mana, 40);
        let shot = &engine.state().projectiles[0];
        assert_eq!(shot.velocity.x, 12.0);
        assert_eq!(shot.color, "#f97316");
        assert_eq!(shot.owner, ProjectileOwner::Player);
        assert!(events.audio.contains(&AudioCue::SkillCast));
    }

    #[test]
    fn cast_on_cooldown_reports_rejection_without_spending() {
        let mut engine = quiet_engine();
        let cast_input = idle().with_quick_slot_pressed(0, true);
        engine.tick(FRAME_MS, &cast_input);
        let events = engine.tick(FRAME_MS, &cast_input);

        assert_eq!(engine.player().mana, 40);
        assert_eq!(engine.state().projectiles.len(), 1);
        assert_eq!(
            events.count_where(|event| matches!(
                event,
                SimEvent::CastRejected {
                    reason: crate::sim::skills::CastRejection::OnCooldown,
                    ..
                }
            )),
            1
        );
    }

    #[test]
    fn item_binding_is_forwarded_to_host() {
        let mut meta = MetaGameState::starter();
        meta.quick_slots
            .insert(1, QuickSlotBinding::Item("potion".to_string()));
        let mut engine = Engine::new(quiet_config(), &meta, 3).expect("engine");

        let events = engine.tick(FRAME_MS, &idle().with_quick_slot_pressed(1, true));
        assert_eq!(
            events.events,
            vec![SimEvent::ItemUseRequested {
                slot: 1,
                item_id: "potion".to_string(),
            }]
        );
    }

    #[test]
    fn repeated_attack_presses_within_window_hit_once() {
        let mut engine = quiet_engine();
        engine.state.player.strength = 20;
        let player_x = engine.player().body.position.x;
        place_minion(&mut engine, player_x + 40.0, 100);

        let attack = idle().with_attack_pressed(true);
        for _ in 0..10 {
            engine.tick(FRAME_MS, &attack);
        }
        assert_eq!(engine.state().enemies[0].health, 89);
    }

    #[test]
    fn each_new_attack_entry_hits_again() {
        let mut engine = quiet_engine();
        engine.state.player.strength = 20;
        let player_x = engine.player().body.position.x;
        place_minion(&mut engine, player_x + 40.0, 100);

        let window = engine.state.config.player.attack_window_ticks as usize;
        let attack = idle().with_attack_pressed(true);
        engine.tick(FRAME_MS, &attack);
        for _ in 0..window {
            engine.tick(FRAME_MS, &idle());
        }
        // Knockback pushed the minion out of reach; bring it back.
        engine.state.enemies[0].body.position.x = player_x + 40.0;
        engine.tick(FRAME_MS, &attack);

        assert_eq!(engine.state().enemies[0].health, 78);
    }

    #[test]
    fn invalid_frame_delta_freezes_motion() {
        let mut engine = quiet_engine();
        let before = engine.player().body;
        let input = idle().with_action_down(InputAction::MoveRight, true);
        engine.tick(f32::NAN, &input);
        engine.tick(-5.0, &input);
        engine.tick(0.0, &input);
        assert_eq!(engine.player().body.position, before.position);
    }

    #[test]
    fn boss_defeat_syncs_then_advances_stage_after_delay() {
        let mut engine = quiet_engine();
        ai::spawn_boss(&mut engine.state, &mut SimulationEvents::default());
        engine.state.enemies[0].health = 0;

        let events = engine.tick(FRAME_MS, &idle());
        assert_eq!(events.syncs.len(), 1);
        assert_eq!(events.syncs[0].reason, SyncReason::BossDefeated);
        assert!(!engine.state().boss_active);
        assert!(engine.state().stage_cleared);

        let mut advanced = 0;
        for _ in 0..40 {
            let events = engine.tick(100.0, &idle());
            advanced += events.count_where(|event| *event == SimEvent::StageAdvanced { stage: 2 });
        }
        assert_eq!(advanced, 1);
        assert_eq!(engine.stage(), 2);
        assert!(!engine.state().stage_cleared);
        assert!(!engine.state().boss_spawned_this_stage);
    }

    #[test]
    fn stage_advance_reseed_respects_minion_cap() {
        let mut config = quiet_config();
        config.spawn.initial_minions = 2;
        config.spawn.aggro_range = 0.0;
        let mut engine = Engine::new(config, &MetaGameState::starter(), 42).expect("engine");
        for x in [20.0, 80.0, 140.0] {
            place_minion(&mut engine, x, 30);
        }
        assert_eq!(engine.state().minion_count(), 5);
        ai::spawn_boss(&mut engine.state, &mut SimulationEvents::default());
        let boss_index = engine.state.enemies.len() - 1;
        engine.state.enemies[boss_index].health = 0;

        for _ in 0..40 {
            engine.tick(100.0, &idle());
        }

        assert_eq!(engine.stage(), 2);
        assert_eq!(engine.state().minion_count(), 5);
    }

    #[test]
    fn stage_advance_tops_up_to_initial_minions() {
        let mut config = quiet_config();
        config.spawn.initial_minions = 2;
        config.spawn.aggro_range = 0.0;
        let mut engine = Engine::new(config, &MetaGameState::starter(), 42).expect("engine");
        engine.state.enemies.clear();
        place_minion(&mut engine, 20.0, 30);
        ai::spawn_boss(&mut engine.state, &mut SimulationEvents::default());
        let boss_index = engine.state.enemies.len() - 1;
        engine.state.enemies[boss_index].health = 0;

        for _ in 0..40 {
            engine.tick(100.0, &idle());
        }

        assert_eq!(engine.stage(), 2);
        assert_eq!(engine.state().minion_count(), 3);
    }

    #[test]
    fn reeling_player_can_still_cast() {
        let mut engine = quiet_engine();
        engine.state.player.anim = AnimState::Hit;
        engine.state.player.body.velocity.x = 6.0;

        let events = engine.tick(FRAME_MS, &idle().with_quick_slot_pressed(0, true));

        assert_eq!(engine.player().mana, 40);
        assert_eq!(engine.state().projectiles.len(), 1);
        assert!(events.audio.contains(&AudioCue::SkillCast));
    }

    #[test]
    fn teardown_cancels_pending_stage_advance() {
        let mut engine = quiet_engine();
        ai::spawn_boss(&mut engine.state, &mut SimulationEvents::default());
        engine.state.enemies[0].health = 0;
        engine.tick(FRAME_MS, &idle());
        assert_eq!(engine.state().deferred.pending(), 1);

        let events = engine.teardown();
        assert_eq!(events.syncs.len(), 1);
        assert_eq!(events.syncs[0].reason, SyncReason::Teardown);
        assert_eq!(events.syncs[0].exp_gained, 0);

        for _ in 0..50 {
            assert!(engine.tick(100.0, &idle()).is_empty());
        }
        assert_eq!(engine.stage(), 1);
        assert_eq!(engine.phase(), SessionPhase::TornDown);
        assert!(engine.teardown().is_empty());
    }

    #[test]
    fn teardown_flushes_pending_rewards() {
        let mut engine = quiet_engine();
        place_minion(&mut engine, 600.0, 1);
        engine.state.enemies[0].health = 0;
        engine.tick(FRAME_MS, &idle());

        let events = engine.teardown();
        assert_eq!(events.syncs[0].exp_gained, 10);
        assert_eq!(events.syncs[0].gold_gained, 5);
    }

    #[test]
    fn player_death_stops_the_session() {
        let mut engine = quiet_engine();
        engine.state.player.health = 3;
        let player_x = engine.player().body.position.x;
        place_minion(&mut engine, player_x + 5.0, 30);

        let events = engine.tick(FRAME_MS, &idle());
        assert_eq!(engine.phase(), SessionPhase::GameOver);
        assert_eq!(engine.player().health, 0);
        assert!(events.audio.contains(&AudioCue::GameOver));
        assert_eq!(events.syncs.len(), 1);

        let events = engine.tick(FRAME_MS, &idle().with_quick_slot_pressed(0, true));
        assert!(events.syncs.is_empty());
        assert!(engine.state().projectiles.is_empty());
    }

    #[test]
    fn same_seed_and_inputs_replay_identically() {
        let run = || {
            let mut config = EngineConfig::default();
            config.spawn.spawn_chance = 0.2;
            let mut engine = Engine::new(config, &MetaGameState::starter(), 1234).expect("engine");
            let input = idle()
                .with_action_down(InputAction::MoveRight, true)
                .with_quick_slot_pressed(0, true);
            for _ in 0..240 {
                engine.tick(FRAME_MS, &input);
            }
            let state = engine.state();
            (
                state.score,
                state.defeated_count,
                state.player.health,
                state
                    .enemies
                    .iter()
                    .map(|enemy| (enemy.id, enemy.health, enemy.element))
                    .collect::<Vec<_>>(),
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn dash_overrides_velocity_and_rejects_while_cooling_down() {
        let mut engine = quiet_engine();
        engine.tick(FRAME_MS, &idle().with_dash_pressed(true));
        let dash_speed = engine.state.config.player.dash_speed;
        assert!(engine.player().body.velocity.x > engine.state.config.player.max_run_speed);
        assert!(engine.player().body.velocity.x <= dash_speed);

        let before = engine.player().dash_cooldown;
        engine.tick(FRAME_MS, &idle().with_dash_pressed(true));
        assert!(engine.player().dash_cooldown < before);
    }

    #[test]
    fn render_reflects_current_state() {
        let mut engine = quiet_engine();
        engine.tick(FRAME_MS, &idle().with_quick_slot_pressed(0, true));
        let frame = engine.render();
        assert_eq!(frame.projectiles.len(), 1);
        assert_eq!(frame.hud.mana, 40);
        assert_eq!(frame.sprites.len(), 1);
    }
}
