pub mod ai;
pub mod clock;
pub mod combat;
pub mod deferred;
pub mod engine;
pub mod entity;
pub mod events;
pub mod fx;
pub mod physics;
pub mod pool;
pub mod rewards;
pub mod skills;
pub mod state;

pub use engine::{Engine, EngineError};
pub use entity::{
    Aabb, AnimState, Body, DamageType, EnemyEntity, EnemyId, Facing, PlayerEntity, Vec2,
    BOSS_MIN_WIDTH,
};
pub use events::{SimEvent, SimulationEvents};
pub use pool::{Projectile, ProjectileOwner, ProjectilePool};
pub use skills::{CastOutcome, CastRejection, DamageProfile};
pub use state::{SessionPhase, SimulationState};
