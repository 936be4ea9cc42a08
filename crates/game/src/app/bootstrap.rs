use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use skirmish_engine::{EngineConfig, MetaGameState};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::loop_runner::{AppError, LoopConfig};
use super::paths::{resolve_app_paths, AppPaths};

pub(crate) const CONFIG_ENV_VAR: &str = "SKIRMISH_CONFIG";
pub(crate) const PROFILE_ENV_VAR: &str = "SKIRMISH_PROFILE";
pub(crate) const SEED_ENV_VAR: &str = "SKIRMISH_SEED";
pub(crate) const HEADLESS_TICKS_ENV_VAR: &str = "SKIRMISH_HEADLESS_TICKS";

const DEFAULT_SEED: u64 = 0x5eed;

#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    Windowed,
    Headless { ticks: u64 },
}

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) engine_config: EngineConfig,
    pub(crate) profile: MetaGameState,
    pub(crate) paths: AppPaths,
    pub(crate) mode: RunMode,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Skirmish Startup ===");

    let paths = resolve_app_paths()?;
    let engine_config = match env_path(CONFIG_ENV_VAR) {
        Some(path) => load_json_file::<EngineConfig>(&path)?,
        None => EngineConfig::default(),
    };
    let profile = match env_path(PROFILE_ENV_VAR) {
        Some(path) => load_json_file::<MetaGameState>(&path)?,
        None => MetaGameState::starter(),
    };
    let seed = env_u64(SEED_ENV_VAR).unwrap_or(DEFAULT_SEED);
    let mode = match env_u64(HEADLESS_TICKS_ENV_VAR) {
        Some(ticks) => RunMode::Headless { ticks },
        None => RunMode::Windowed,
    };
    let loop_config = LoopConfig {
        window_width: engine_config.world.width.round().max(1.0) as u32,
        window_height: engine_config.world.height.round().max(1.0) as u32,
        seed,
        ..LoopConfig::default()
    };

    info!(
        root = %paths.root.display(),
        assets_dir = %paths.assets_dir.display(),
        seed,
        mode = ?mode,
        unlocked_skills = profile.unlocked_skills.len(),
        quick_slots = profile.quick_slots.len(),
        "startup"
    );

    Ok(AppWiring {
        loop_config,
        engine_config,
        profile,
        paths,
        mode,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        LoadError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

fn env_path(var: &'static str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn env_u64(var: &'static str) -> Option<u64> {
    match env::var(var) {
        Ok(value) => parse_u64_setting(var, &value),
        Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var = var, error = %error, "unable to read env var; ignoring");
            None
        }
    }
}

fn parse_u64_setting(var: &'static str, value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(env_var = var, value, "invalid numeric env var value; ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).expect("create file");
        file.write_all(contents.as_bytes()).expect("write file");
        path
    }

    #[test]
    fn profile_loads_from_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            &dir,
            "profile.json",
            r#"{
                "hp": 80, "max_hp": 120, "mp": 30, "max_mp": 60,
                "exp": 7, "gold": 3, "strength": 14,
                "unlocked_skills": [
                    { "id": "frost", "cooldown_seconds": 2.0, "mana_cost": 15, "damage_type": "ice" }
                ],
                "quick_slots": { "1": { "kind": "skill", "id": "frost" } }
            }"#,
        );

        let profile: MetaGameState = load_json_file(&path).expect("profile");
        assert_eq!(profile.max_hp, 120);
        assert_eq!(profile.strength, 14);
        assert_eq!(profile.unlocked_skills[0].damage, 10);
        assert_eq!(profile.quick_slots.len(), 1);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            &dir,
            "config.json",
            r#"{ "spawn": { "max_minions": "many" } }"#,
        );

        let error = load_json_file::<EngineConfig>(&path).expect_err("bad config");
        match error {
            LoadError::Parse { json_path, .. } => assert_eq!(json_path, "spawn.max_minions"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load_json_file::<EngineConfig>(&dir.path().join("absent.json"))
            .expect_err("missing");
        assert!(matches!(error, LoadError::Read { .. }));
    }

    #[test]
    fn numeric_settings_reject_garbage() {
        assert_eq!(parse_u64_setting(SEED_ENV_VAR, " 42 "), Some(42));
        assert_eq!(parse_u64_setting(SEED_ENV_VAR, "forty"), None);
    }
}
