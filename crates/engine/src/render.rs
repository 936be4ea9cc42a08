use crate::assets::{AssetKind, ImageHandle, StageArt};
use crate::meta::QuickSlotBinding;
use crate::sim::entity::{AnimState, Facing, Vec2};
use crate::sim::fx::DAMAGE_NUMBER_LIFE_TICKS;
use crate::sim::pool::ProjectileOwner;
use crate::sim::state::{SessionPhase, SimulationState};

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub kind: AssetKind,
    pub image: Option<ImageHandle>,
    pub position: Vec2,
    pub size: Vec2,
    pub facing: Facing,
    pub anim: AnimState,
    pub health_ratio: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileDraw {
    pub position: Vec2,
    pub size: Vec2,
    pub color: &'static str,
    pub owner: ProjectileOwner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleDraw {
    pub position: Vec2,
    pub size: f32,
    pub color: &'static str,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageNumberDraw {
    pub position: Vec2,
    pub value: u32,
    pub critical: bool,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuickSlotHud {
    pub slot: u8,
    pub label: String,
    /// 1.0 right after a cast, 0.0 when ready. Items are always 0.0.
    pub cooldown_ratio: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hud {
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub score: u64,
    pub stage: u32,
    pub defeated: u32,
    pub boss_health: Option<(i32, i32)>,
    pub phase: SessionPhase,
    pub stage_cleared: bool,
    pub quick_slots: Vec<QuickSlotHud>,
}

/// Everything the host needs to draw one frame, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub world_size: Vec2,
    pub floor_y: f32,
    pub background: Option<ImageHandle>,
    pub sprites: Vec<SpriteDraw>,
    pub projectiles: Vec<ProjectileDraw>,
    pub particles: Vec<ParticleDraw>,
    pub damage_numbers: Vec<DamageNumberDraw>,
    pub hud: Hud,
}

pub fn build_frame(state: &SimulationState, art: &StageArt) -> RenderFrame {
    let world = state.config.world;
    let mut sprites = Vec::with_capacity(state.enemies.len() + 1);
    for enemy in &state.enemies {
        let kind = if enemy.is_boss() {
            AssetKind::Boss
        } else {
            AssetKind::Minion
        };
        sprites.push(SpriteDraw {
            kind,
            image: art.get(kind),
            position: enemy.body.position,
            size: enemy.body.size,
            facing: enemy.facing,
            anim: enemy.anim,
            health_ratio: ratio(enemy.health, enemy.max_health),
        });
    }
    let player = &state.player;
    sprites.push(SpriteDraw {
        kind: AssetKind::Player,
        image: art.player,
        position: player.body.position,
        size: player.body.size,
        facing: player.facing,
        anim: player.anim,
        health_ratio: ratio(player.health, player.max_health),
    });

    let projectiles = state
        .projectiles
        .iter()
        .map(|projectile| ProjectileDraw {
            position: projectile.position,
            size: projectile.size,
            color: projectile.color,
            owner: projectile.owner,
        })
        .collect();
    let particles = state
        .fx
        .particles
        .iter()
        .map(|particle| ParticleDraw {
            position: particle.position,
            size: particle.size,
            color: particle.color,
            alpha: (particle.life / particle.max_life.max(f32::EPSILON)).clamp(0.0, 1.0),
        })
        .collect();
    let damage_numbers = state
        .fx
        .damage_numbers
        .iter()
        .map(|number| DamageNumberDraw {
            position: number.position,
            value: number.value,
            critical: number.critical,
            alpha: (number.life / DAMAGE_NUMBER_LIFE_TICKS).clamp(0.0, 1.0),
        })
        .collect();

    RenderFrame {
        world_size: Vec2::new(world.width, world.height),
        floor_y: world.floor_y,
        background: art.background,
        sprites,
        projectiles,
        particles,
        damage_numbers,
        hud: build_hud(state),
    }
}

fn build_hud(state: &SimulationState) -> Hud {
    let ticks_per_second = state.config.ticks_per_second();
    let quick_slots = state
        .quick_slots
        .iter()
        .map(|(slot, binding)| match binding {
            QuickSlotBinding::Skill(id) => {
                let total = state
                    .skills
                    .get(id)
                    .map(|skill| skill.cooldown_seconds * ticks_per_second)
                    .unwrap_or(0.0);
                let cooldown_ratio = if total > 0.0 {
                    (state.cooldowns.remaining(id) / total).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                QuickSlotHud {
                    slot: *slot,
                    label: id.to_string(),
                    cooldown_ratio,
                }
            }
            QuickSlotBinding::Item(item) => QuickSlotHud {
                slot: *slot,
                label: item.clone(),
                cooldown_ratio: 0.0,
            },
        })
        .collect();

    Hud {
        health: state.player.health,
        max_health: state.player.max_health,
        mana: state.player.mana,
        max_mana: state.player.max_mana,
        score: state.score,
        stage: state.stage,
        defeated: state.defeated_count,
        boss_health: state
            .enemies
            .iter()
            .find(|enemy| enemy.is_boss())
            .map(|boss| (boss.health, boss.max_health)),
        phase: state.phase,
        stage_cleared: state.stage_cleared,
        quick_slots,
    }
}

fn ratio(value: i32, max: i32) -> f32 {
    if max <= 0 {
        return 0.0;
    }
    (value as f32 / max as f32).clamp(0.0, 1.0)
}

/// Parses `#rrggbb` into opaque RGBA.
pub fn parse_hex_color(color: &str) -> Option<[u8; 4]> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255])
}
