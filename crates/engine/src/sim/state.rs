use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::config::EngineConfig;
use crate::meta::{MetaGameState, QuickSlotBinding};

use super::clock::SimClock;
use super::deferred::DeferredQueue;
use super::entity::{AnimState, Body, EnemyEntity, EnemyId, Facing, PlayerEntity, Vec2};
use super::fx::FxStore;
use super::pool::{Projectile, ProjectilePool};
use super::rewards::RewardAccumulator;
use super::skills::{CooldownTable, SkillBook};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Running,
    GameOver,
    TornDown,
}

/// All mutable simulation data for one session. Owned by the engine; every
/// system takes it explicitly.
#[derive(Debug)]
pub struct SimulationState {
    pub config: EngineConfig,
    pub clock: SimClock,
    pub rng: ChaCha8Rng,
    pub player: PlayerEntity,
    pub enemies: Vec<EnemyEntity>,
    pub projectiles: Vec<Projectile>,
    pub pool: ProjectilePool,
    pub fx: FxStore,
    pub cooldowns: CooldownTable,
    pub skills: SkillBook,
    pub quick_slots: BTreeMap<u8, QuickSlotBinding>,
    pub rewards: RewardAccumulator,
    pub deferred: DeferredQueue,
    pub score: u64,
    pub defeated_count: u32,
    pub stage: u32,
    pub boss_active: bool,
    pub boss_spawned_this_stage: bool,
    pub stage_cleared: bool,
    pub phase: SessionPhase,
    next_enemy_id: u64,
}

impl SimulationState {
    /// Hydrates a session from the meta-game. `config` is assumed validated.
    pub fn new(config: EngineConfig, meta: &MetaGameState, seed: u64) -> Self {
        let player = hydrate_player(&config, meta);
        let skills = SkillBook::from_meta(meta);
        for (slot, binding) in &meta.quick_slots {
            if let QuickSlotBinding::Skill(skill_id) = binding {
                if !skills.is_unlocked(skill_id) {
                    warn!(slot, skill = %skill_id, "quick_slot_bound_to_locked_skill");
                }
            }
        }
        Self {
            clock: SimClock::new(&config.clock),
            rng: ChaCha8Rng::seed_from_u64(seed),
            player,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            pool: ProjectilePool::with_capacity(config.pool_capacity),
            fx: FxStore::default(),
            cooldowns: CooldownTable::default(),
            skills,
            quick_slots: meta.quick_slots.clone(),
            rewards: RewardAccumulator::default(),
            deferred: DeferredQueue::default(),
            score: 0,
            defeated_count: 0,
            stage: 1,
            boss_active: false,
            boss_spawned_this_stage: false,
            stage_cleared: false,
            phase: SessionPhase::Running,
            next_enemy_id: 1,
            config,
        }
    }

    pub fn alloc_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.saturating_add(1);
        id
    }

    pub fn find_enemy(&self, id: EnemyId) -> Option<&EnemyEntity> {
        self.enemies.iter().find(|enemy| enemy.id == id)
    }

    pub fn minion_count(&self) -> usize {
        self.enemies.iter().filter(|enemy| !enemy.is_boss()).count()
    }

    pub fn boss_count(&self) -> usize {
        self.enemies.iter().filter(|enemy| enemy.is_boss()).count()
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Returns every active projectile to the pool.
    pub fn clear_projectiles(&mut self) {
        for projectile in self.projectiles.drain(..) {
            self.pool.release(projectile);
        }
    }
}

fn hydrate_player(config: &EngineConfig, meta: &MetaGameState) -> PlayerEntity {
    let size = Vec2::new(config.player.width, config.player.height);
    let position = Vec2::new(config.player.spawn_x, config.world.floor_y - size.y);
    let mut body = Body::new(position, size);
    body.grounded = true;
    let mut player = PlayerEntity {
        body,
        health: meta.hp,
        max_health: meta.max_hp,
        mana: meta.mp,
        max_mana: meta.max_mp,
        strength: meta.strength,
        facing: Facing::Right,
        anim: AnimState::Idle,
        dash_cooldown: 0.0,
        attack_window: 0.0,
        entered_attack: false,
    };
    player.clamp_vitals();
    player
}
