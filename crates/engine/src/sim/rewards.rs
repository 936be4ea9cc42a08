use tracing::info;

use crate::config::Reward;
use crate::meta::{SyncReason, VitalsSync};

use super::entity::PlayerEntity;

/// Exp and gold earned since the last sync point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardAccumulator {
    exp: u32,
    gold: u32,
}

impl RewardAccumulator {
    pub fn add(&mut self, reward: Reward) {
        self.exp = self.exp.saturating_add(reward.exp);
        self.gold = self.gold.saturating_add(reward.gold);
    }

    pub fn pending_exp(&self) -> u32 {
        self.exp
    }

    pub fn pending_gold(&self) -> u32 {
        self.gold
    }

    /// Drains the pending rewards into a sync record. Vitals are clamped on
    /// the player before they are copied out.
    pub fn flush(&mut self, player: &mut PlayerEntity, reason: SyncReason) -> VitalsSync {
        player.clamp_vitals();
        let sync = VitalsSync {
            reason,
            hp: player.health,
            mp: player.mana,
            exp_gained: self.exp,
            gold_gained: self.gold,
        };
        self.exp = 0;
        self.gold = 0;
        info!(
            reason = ?reason,
            hp = sync.hp,
            mp = sync.mp,
            exp_gained = sync.exp_gained,
            gold_gained = sync.gold_gained,
            "vitals_synced"
        );
        sync
    }
}
