pub mod assets;
pub mod audio;
pub mod config;
pub mod input;
pub mod meta;
pub mod render;
pub mod sim;

pub use assets::{AssetError, AssetKind, AssetProvider, ImageHandle, StageArt};
pub use audio::{dispatch_cues, AudioCue, AudioSink};
pub use config::{ConfigError, EngineConfig};
pub use input::{InputAction, InputSnapshot, Intents, QUICK_SLOT_COUNT};
pub use meta::{MetaGameState, QuickSlotBinding, SkillDef, SkillId, SyncReason, VitalsSync};
pub use render::{parse_hex_color, RenderFrame};
pub use sim::{
    AnimState, CastRejection, DamageType, Engine, EngineError, Facing, SessionPhase, SimEvent,
    SimulationEvents, Vec2,
};
