use crate::audio::AudioCue;
use crate::meta::{SkillId, VitalsSync};

use super::entity::EnemyId;
use super::skills::CastRejection;

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    SkillCast {
        skill: SkillId,
        mana_after: i32,
    },
    CastRejected {
        skill: SkillId,
        reason: CastRejection,
    },
    ItemUseRequested {
        slot: u8,
        item_id: String,
    },
    EnemySpawned {
        id: EnemyId,
        boss: bool,
    },
    EnemyDamaged {
        id: EnemyId,
        amount: u32,
        critical: bool,
        health_after: i32,
    },
    EnemyDefeated {
        id: EnemyId,
        boss: bool,
        score_gained: u32,
    },
    PlayerDamaged {
        amount: u32,
        health_after: i32,
    },
    PlayerDied,
    BossSpawned {
        id: EnemyId,
        stage: u32,
    },
    StageCleared {
        stage: u32,
    },
    StageAdvanced {
        stage: u32,
    },
}

/// Everything one tick produced for the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationEvents {
    pub events: Vec<SimEvent>,
    pub audio: Vec<AudioCue>,
    pub syncs: Vec<VitalsSync>,
}

impl SimulationEvents {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn cue(&mut self, cue: AudioCue) {
        self.audio.push(cue);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.audio.is_empty() && self.syncs.is_empty()
    }

    pub fn count_where(&self, predicate: impl Fn(&SimEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}
