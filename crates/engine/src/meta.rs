//! Boundary with the meta-game: the state the engine hydrates from at session
//! start and the vitals it flushes back at sync points.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::entity::DamageType;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: SkillId,
    #[serde(default)]
    pub name: String,
    /// Skill-point cost in the meta-game tree. Not used by the simulation.
    #[serde(default)]
    pub cost: u32,
    pub cooldown_seconds: f32,
    pub mana_cost: i32,
    pub damage_type: DamageType,
    #[serde(default = "default_skill_damage")]
    pub damage: u32,
}

fn default_skill_damage() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum QuickSlotBinding {
    Skill(SkillId),
    Item(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaGameState {
    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,
    pub exp: u64,
    pub gold: u64,
    #[serde(default = "default_strength")]
    pub strength: u32,
    #[serde(default)]
    pub unlocked_skills: Vec<SkillDef>,
    #[serde(default)]
    pub equipment_skills: Vec<SkillDef>,
    #[serde(default)]
    pub quick_slots: BTreeMap<u8, QuickSlotBinding>,
}

fn default_strength() -> u32 {
    10
}

impl MetaGameState {
    /// A fresh character with one fire skill bound to the first slot.
    pub fn starter() -> Self {
        let fire_bolt = SkillDef {
            id: SkillId::new("fire_bolt"),
            name: "Fire Bolt".to_string(),
            cost: 1,
            cooldown_seconds: 1.0,
            mana_cost: 10,
            damage_type: DamageType::Fire,
            damage: 12,
        };
        let mut quick_slots = BTreeMap::new();
        quick_slots.insert(0, QuickSlotBinding::Skill(fire_bolt.id.clone()));
        Self {
            hp: 100,
            max_hp: 100,
            mp: 50,
            max_mp: 50,
            exp: 0,
            gold: 0,
            strength: default_strength(),
            unlocked_skills: vec![fire_bolt],
            equipment_skills: Vec::new(),
            quick_slots,
        }
    }

    /// Writes a flushed sync back. Values are clamped again so a malformed
    /// sync cannot push the store out of range.
    pub fn apply_sync(&mut self, sync: &VitalsSync) {
        self.max_hp = self.max_hp.max(1);
        self.max_mp = self.max_mp.max(0);
        self.hp = sync.hp.clamp(0, self.max_hp);
        self.mp = sync.mp.clamp(0, self.max_mp);
        self.exp = self.exp.saturating_add(u64::from(sync.exp_gained));
        self.gold = self.gold.saturating_add(u64::from(sync.gold_gained));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    BossDefeated,
    PlayerDied,
    Teardown,
}

/// One flush of player vitals and pending rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VitalsSync {
    pub reason: SyncReason,
    pub hp: i32,
    pub mp: i32,
    pub exp_gained: u32,
    pub gold_gained: u32,
}
