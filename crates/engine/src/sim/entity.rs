use serde::{Deserialize, Serialize};

/// Enemies at least this wide are bosses.
pub const BOSS_MIN_WIDTH: f32 = 80.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_position_size(position: Vec2, size: Vec2) -> Self {
        Self {
            min: position,
            max: Vec2 {
                x: position.x + size.x,
                y: position.y + size.y,
            },
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// Kinematic state shared by every actor. `position` is the top-left corner in
/// screen space (y grows downward).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub grounded: bool,
}

impl Body {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size,
            grounded: false,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.position.x + self.size.x * 0.5,
            y: self.position.y + self.size.y * 0.5,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_position_size(self.position, self.size)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    pub fn toward(from_x: f32, to_x: f32) -> Self {
        if to_x < from_x {
            Self::Left
        } else {
            Self::Right
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AnimState {
    #[default]
    Idle,
    Run,
    Jump,
    Attack,
    Hit,
    Dead,
}

impl AnimState {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Jump => "jump",
            Self::Attack => "attack",
            Self::Hit => "hit",
            Self::Dead => "dead",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Slash,
    Fire,
    Ice,
    Lightning,
    Dark,
    Holy,
}

impl DamageType {
    pub const ALL: [DamageType; 6] = [
        DamageType::Slash,
        DamageType::Fire,
        DamageType::Ice,
        DamageType::Lightning,
        DamageType::Dark,
        DamageType::Holy,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntity {
    pub body: Body,
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub strength: u32,
    pub facing: Facing,
    pub anim: AnimState,
    pub dash_cooldown: f32,
    /// Ticks left in the current `attack` window.
    pub attack_window: f32,
    /// Set on the tick a melee swing enters `attack`; consumed by the resolver.
    pub entered_attack: bool,
}

impl PlayerEntity {
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn clamp_vitals(&mut self) {
        self.max_health = self.max_health.max(1);
        self.max_mana = self.max_mana.max(0);
        self.health = self.health.clamp(0, self.max_health);
        self.mana = self.mana.clamp(0, self.max_mana);
    }

    /// Enters the timed `attack` state. Returns false while a window is open.
    pub fn begin_attack(&mut self, window_ticks: f32, melee: bool) -> bool {
        if self.anim == AnimState::Attack && self.attack_window > 0.0 {
            return false;
        }
        self.anim = AnimState::Attack;
        self.attack_window = window_ticks;
        self.entered_attack = melee;
        true
    }

    /// Runs down the attack window and falls back to `idle` when it closes.
    pub fn decay_attack_window(&mut self, time_scale: f32) {
        if self.anim != AnimState::Attack {
            self.attack_window = 0.0;
            return;
        }
        self.attack_window = (self.attack_window - time_scale).max(0.0);
        if self.attack_window <= 0.0 {
            self.anim = AnimState::Idle;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnemyId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyEntity {
    pub id: EnemyId,
    pub body: Body,
    pub health: i32,
    pub max_health: i32,
    pub anim: AnimState,
    pub facing: Facing,
    pub element: DamageType,
    pub contact_damage: u32,
    pub volley_timer: f32,
}

impl EnemyEntity {
    pub fn is_boss(&self) -> bool {
        self.body.size.x >= BOSS_MIN_WIDTH
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn apply_damage(&mut self, amount: u32) {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.health = self.health.saturating_sub(amount).clamp(0, self.max_health);
    }
}
