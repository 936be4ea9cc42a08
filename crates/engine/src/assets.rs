use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Background,
    Player,
    Minion,
    Boss,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Background,
        AssetKind::Player,
        AssetKind::Minion,
        AssetKind::Boss,
    ];

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Player => "player",
            Self::Minion => "minion",
            Self::Boss => "boss",
        }
    }

    /// Prompt handed to the asset collaborator for this slot.
    pub fn prompt(self, stage: u32) -> String {
        format!("stage {stage} {}", self.as_token())
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Opaque reference to an image owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u32);

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to load {kind} art from {location}: {source}")]
    Load {
        kind: AssetKind,
        location: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("asset provider rejected prompt '{prompt}': {reason}")]
    Rejected { prompt: String, reason: String },
}

/// Host-side asset collaborator. `Ok(None)` means "no art for this slot" and
/// is not an error.
pub trait AssetProvider {
    fn generate(&mut self, prompt: &str, kind: AssetKind)
        -> Result<Option<ImageHandle>, AssetError>;
}

/// Art for one stage. Missing entries are skipped at draw time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageArt {
    pub background: Option<ImageHandle>,
    pub player: Option<ImageHandle>,
    pub minion: Option<ImageHandle>,
    pub boss: Option<ImageHandle>,
}

impl StageArt {
    /// Requests every slot once. Called before the loop starts and after each
    /// stage advance, never from inside a tick.
    pub fn load(provider: &mut dyn AssetProvider, stage: u32) -> Self {
        let mut art = Self::default();
        for kind in AssetKind::ALL {
            let prompt = kind.prompt(stage);
            let handle = match provider.generate(&prompt, kind) {
                Ok(handle) => handle,
                Err(error) => {
                    warn!(stage, kind = %kind, error = %error, "asset_generation_failed");
                    None
                }
            };
            art.set(kind, handle);
        }
        info!(stage, loaded = art.loaded_count(), "stage_art_loaded");
        art
    }

    pub fn get(&self, kind: AssetKind) -> Option<ImageHandle> {
        match kind {
            AssetKind::Background => self.background,
            AssetKind::Player => self.player,
            AssetKind::Minion => self.minion,
            AssetKind::Boss => self.boss,
        }
    }

    pub fn set(&mut self, kind: AssetKind, handle: Option<ImageHandle>) {
        match kind {
            AssetKind::Background => self.background = handle,
            AssetKind::Player => self.player = handle,
            AssetKind::Minion => self.minion = handle,
            AssetKind::Boss => self.boss = handle,
        }
    }

    pub fn loaded_count(&self) -> usize {
        AssetKind::ALL
            .iter()
            .filter(|kind| self.get(**kind).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedProvider {
        prompts: Vec<String>,
        failing: AssetKind,
    }

    impl AssetProvider for ScriptedProvider {
        fn generate(
            &mut self,
            prompt: &str,
            kind: AssetKind,
        ) -> Result<Option<ImageHandle>, AssetError> {
            self.prompts.push(prompt.to_string());
            if kind == self.failing {
                return Err(AssetError::Rejected {
                    prompt: prompt.to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(Some(ImageHandle(self.prompts.len() as u32)))
        }
    }

    #[test]
    fn failed_slot_is_left_empty() {
        let mut provider = ScriptedProvider {
            prompts: Vec::new(),
            failing: AssetKind::Boss,
        };
        let art = StageArt::load(&mut provider, 2);

        assert_eq!(provider.prompts.len(), 4);
        assert_eq!(provider.prompts[0], "stage 2 background");
        assert!(art.boss.is_none());
        assert_eq!(art.loaded_count(), 3);
    }

    #[test]
    fn set_and_get_agree_for_every_kind() {
        let mut art = StageArt::default();
        for (index, kind) in AssetKind::ALL.into_iter().enumerate() {
            art.set(kind, Some(ImageHandle(index as u32)));
        }
        for (index, kind) in AssetKind::ALL.into_iter().enumerate() {
            assert_eq!(art.get(kind), Some(ImageHandle(index as u32)));
        }
    }
}
