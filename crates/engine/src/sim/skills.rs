use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::audio::AudioCue;
use crate::meta::{MetaGameState, SkillDef, SkillId};

use super::entity::{AnimState, DamageType, Facing, Vec2};
use super::events::{SimEvent, SimulationEvents};
use super::pool::{Projectile, ProjectileOwner};
use super::state::SimulationState;

/// Kinetic and visual parameters of a projectile per damage type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageProfile {
    pub speed: f32,
    pub size: Vec2,
    pub life_ticks: f32,
    pub color: &'static str,
}

impl DamageProfile {
    pub const fn for_type(damage_type: DamageType) -> Self {
        match damage_type {
            DamageType::Slash => Self {
                speed: 15.0,
                size: Vec2::new(30.0, 30.0),
                life_ticks: 20.0,
                color: "#e2e8f0",
            },
            DamageType::Fire => Self {
                speed: 12.0,
                size: Vec2::new(20.0, 20.0),
                life_ticks: 60.0,
                color: "#f97316",
            },
            DamageType::Ice => Self {
                speed: 10.0,
                size: Vec2::new(18.0, 18.0),
                life_ticks: 70.0,
                color: "#38bdf8",
            },
            DamageType::Lightning => Self {
                speed: 20.0,
                size: Vec2::new(40.0, 8.0),
                life_ticks: 30.0,
                color: "#facc15",
            },
            DamageType::Dark => Self {
                speed: 8.0,
                size: Vec2::new(24.0, 24.0),
                life_ticks: 90.0,
                color: "#a855f7",
            },
            DamageType::Holy => Self {
                speed: 14.0,
                size: Vec2::new(22.0, 22.0),
                life_ticks: 50.0,
                color: "#fde68a",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillSource {
    Unlocked,
    Equipment,
}

/// Skills the player may cast this session: unlocked tree skills plus
/// skills granted by equipment.
#[derive(Debug, Clone, Default)]
pub struct SkillBook {
    skills: BTreeMap<SkillId, (SkillDef, SkillSource)>,
}

impl SkillBook {
    pub fn from_meta(meta: &MetaGameState) -> Self {
        let mut skills = BTreeMap::new();
        for skill in &meta.unlocked_skills {
            skills.insert(skill.id.clone(), (skill.clone(), SkillSource::Unlocked));
        }
        for skill in &meta.equipment_skills {
            skills
                .entry(skill.id.clone())
                .or_insert_with(|| (skill.clone(), SkillSource::Equipment));
        }
        Self { skills }
    }

    pub fn get(&self, id: &SkillId) -> Option<&SkillDef> {
        self.skills.get(id).map(|(skill, _)| skill)
    }

    pub fn source(&self, id: &SkillId) -> Option<SkillSource> {
        self.skills.get(id).map(|(_, source)| *source)
    }

    pub fn is_unlocked(&self, id: &SkillId) -> bool {
        self.skills.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Remaining cooldown per skill, in ticks.
#[derive(Debug, Clone, Default)]
pub struct CooldownTable {
    remaining: HashMap<SkillId, f32>,
}

impl CooldownTable {
    pub fn remaining(&self, id: &SkillId) -> f32 {
        self.remaining.get(id).copied().unwrap_or(0.0)
    }

    pub fn is_ready(&self, id: &SkillId) -> bool {
        self.remaining(id) <= 0.0
    }

    pub fn start(&mut self, id: &SkillId, ticks: f32) {
        self.remaining.insert(id.clone(), ticks.max(0.0));
    }

    pub fn decay(&mut self, time_scale: f32) {
        for remaining in self.remaining.values_mut() {
            *remaining = (*remaining - time_scale).max(0.0);
        }
        self.remaining.retain(|_, remaining| *remaining > 0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastRejection {
    Locked,
    OnCooldown,
    InsufficientMana,
    CasterDead,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastOutcome {
    pub mana_after: i32,
    pub cooldown_ticks: f32,
}

/// Checks a cast in the fixed order: unlocked, cooldown, mana, caster alive.
pub fn validate_cast<'a>(
    state: &'a SimulationState,
    skill_id: &SkillId,
) -> Result<&'a SkillDef, CastRejection> {
    let skill = state.skills.get(skill_id).ok_or(CastRejection::Locked)?;
    if !state.cooldowns.is_ready(skill_id) {
        return Err(CastRejection::OnCooldown);
    }
    if state.player.mana < skill.mana_cost {
        return Err(CastRejection::InsufficientMana);
    }
    if !state.player.is_alive() {
        return Err(CastRejection::CasterDead);
    }
    Ok(skill)
}

pub fn configure_projectile(
    projectile: &mut Projectile,
    damage_type: DamageType,
    origin: Vec2,
    direction: f32,
    damage: u32,
    owner: ProjectileOwner,
) {
    let profile = DamageProfile::for_type(damage_type);
    projectile.position = origin;
    projectile.velocity = Vec2::new(profile.speed * direction, 0.0);
    projectile.size = profile.size;
    projectile.damage = damage;
    projectile.damage_type = damage_type;
    projectile.life = profile.life_ticks;
    projectile.owner = owner;
    projectile.color = profile.color;
}

/// Casts a skill for the player. A rejected cast changes nothing.
pub fn cast(
    state: &mut SimulationState,
    skill_id: &SkillId,
    events: &mut SimulationEvents,
) -> Result<CastOutcome, CastRejection> {
    let skill = match validate_cast(state, skill_id) {
        Ok(skill) => skill.clone(),
        Err(reason) => {
            debug!(skill = %skill_id, reason = ?reason, "cast_rejected");
            events.push(SimEvent::CastRejected {
                skill: skill_id.clone(),
                reason,
            });
            return Err(reason);
        }
    };

    let cooldown_ticks = skill.cooldown_seconds.max(0.0) * state.config.ticks_per_second();
    state.player.mana -= skill.mana_cost;
    state.cooldowns.start(skill_id, cooldown_ticks);

    let mut projectile = state.pool.acquire();
    configure_projectile(
        &mut projectile,
        skill.damage_type,
        state.player.body.center(),
        state.player.facing.sign(),
        skill.damage,
        ProjectileOwner::Player,
    );
    state.projectiles.push(projectile);

    let window = state.config.player.attack_window_ticks;
    state.player.anim = AnimState::Attack;
    state.player.attack_window = window;

    debug!(
        skill = %skill_id,
        mana_after = state.player.mana,
        cooldown_ticks,
        "skill_cast"
    );
    events.cue(AudioCue::SkillCast);
    events.push(SimEvent::SkillCast {
        skill: skill_id.clone(),
        mana_after: state.player.mana,
    });
    Ok(CastOutcome {
        mana_after: state.player.mana,
        cooldown_ticks,
    })
}

/// Direction sign used when an enemy fires at a target.
pub fn aim_direction(from_x: f32, to_x: f32) -> f32 {
    Facing::toward(from_x, to_x).sign()
}
