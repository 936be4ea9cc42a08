use std::path::PathBuf;

use skirmish_engine::{
    dispatch_cues, Engine, EngineConfig, EngineError, InputSnapshot, MetaGameState, RenderFrame,
    SessionPhase, SimEvent, SimulationEvents, StageArt,
};
use tracing::{debug, info};

use super::assets::PngAssetProvider;
use super::audio::TracingAudioSink;

/// Host-side owner of one engine session and its collaborators: the
/// persistent profile, the art provider and the audio sink.
pub(crate) struct Session {
    engine: Engine,
    profile: MetaGameState,
    provider: PngAssetProvider,
    audio: TracingAudioSink,
}

impl Session {
    pub(crate) fn start(
        config: EngineConfig,
        profile: MetaGameState,
        assets_dir: PathBuf,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let mut engine = Engine::new(config, &profile, seed)?;
        let mut provider = PngAssetProvider::new(assets_dir);
        engine.set_stage_art(StageArt::load(&mut provider, engine.stage()));
        Ok(Self {
            engine,
            profile,
            provider,
            audio: TracingAudioSink::default(),
        })
    }

    /// Runs one engine tick and routes its output to the collaborators.
    pub(crate) fn step(&mut self, dt_ms: f32, input: &InputSnapshot) -> SimulationEvents {
        let events = self.engine.tick(dt_ms, input);
        self.route(&events);
        events
    }

    pub(crate) fn frame(&self) -> RenderFrame {
        self.engine.render()
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.engine.phase()
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn profile(&self) -> &MetaGameState {
        &self.profile
    }

    pub(crate) fn provider(&self) -> &PngAssetProvider {
        &self.provider
    }

    pub(crate) fn audio(&self) -> &TracingAudioSink {
        &self.audio
    }

    /// Tears the engine down and writes the final sync back to the profile.
    /// Safe to call more than once.
    pub(crate) fn finish(&mut self) -> &MetaGameState {
        let events = self.engine.teardown();
        self.route(&events);
        &self.profile
    }

    fn route(&mut self, events: &SimulationEvents) {
        dispatch_cues(&mut self.audio, &events.audio);
        for sync in &events.syncs {
            self.profile.apply_sync(sync);
            info!(
                reason = ?sync.reason,
                hp = sync.hp,
                mp = sync.mp,
                exp_gained = sync.exp_gained,
                gold_gained = sync.gold_gained,
                "profile_synced"
            );
        }
        for event in &events.events {
            match event {
                SimEvent::StageAdvanced { stage } => self.reload_art(*stage),
                SimEvent::ItemUseRequested { slot, item_id } => {
                    // Inventory lives outside this host; the request is only reported.
                    info!(slot, item = %item_id, "item_use_requested");
                }
                other => debug!(event = ?other, "sim_event"),
            }
        }
    }

    fn reload_art(&mut self, stage: u32) {
        self.provider.clear();
        let art = StageArt::load(&mut self.provider, stage);
        self.engine.set_stage_art(art);
    }
}

#[cfg(test)]
mod tests {
    use skirmish_engine::{AudioCue, SyncReason};

    use super::*;

    const FRAME_MS: f32 = 1000.0 / 60.0;

    fn quiet_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.spawn.initial_minions = 0;
        config.spawn.spawn_chance = 0.0;
        config
    }

    fn session(dir: &tempfile::TempDir) -> Session {
        Session::start(
            quiet_config(),
            MetaGameState::starter(),
            dir.path().to_path_buf(),
            7,
        )
        .expect("session")
    }

    #[test]
    fn cast_cue_reaches_audio_sink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(&dir);
        session.step(FRAME_MS, &InputSnapshot::empty().with_quick_slot_pressed(0, true));
        assert_eq!(session.audio().played(AudioCue::SkillCast), 1);
    }

    #[test]
    fn finish_writes_vitals_back_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(&dir);
        session.step(FRAME_MS, &InputSnapshot::empty().with_quick_slot_pressed(0, true));

        let mana_after_cast = session.engine().player().mana;
        let profile = session.finish().clone();
        assert_eq!(profile.mp, mana_after_cast);
        assert_eq!(session.phase(), SessionPhase::TornDown);

        let again = session.finish().clone();
        assert_eq!(again, profile);
    }

    #[test]
    fn teardown_sync_keeps_rewards_at_zero_without_kills() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(&dir);
        let exp_before = session.profile().exp;
        let events = session.engine.teardown();
        assert_eq!(events.syncs.len(), 1);
        assert_eq!(events.syncs[0].reason, SyncReason::Teardown);
        assert_eq!(events.syncs[0].exp_gained, 0);
        session.route(&events);
        assert_eq!(session.profile().exp, exp_before);
    }

    #[test]
    fn stage_advance_reloads_art() {
        let dir = tempfile::tempdir().expect("tempdir");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]))
            .save(dir.path().join("background.png"))
            .expect("save png");
        let mut session = session(&dir);
        assert!(session.engine().stage_art().background.is_some());

        let mut events = SimulationEvents::default();
        events.push(SimEvent::StageAdvanced { stage: 2 });
        session.route(&events);

        let handle = session
            .engine()
            .stage_art()
            .background
            .expect("reloaded background");
        assert!(session.provider().image(handle).is_some());
    }
}
