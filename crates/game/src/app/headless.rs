use skirmish_engine::{InputAction, InputSnapshot, SessionPhase};
use tracing::info;

use super::session::Session;

const HEADLESS_FRAME_MS: f32 = 1000.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeadlessSummary {
    pub(crate) ticks_run: u64,
    pub(crate) score: u64,
    pub(crate) stage: u32,
    pub(crate) defeated: u32,
    pub(crate) phase: SessionPhase,
}

/// Drives a session with scripted input at a fixed 60 Hz frame time. Used
/// for smoke runs without a window.
pub(crate) fn run_headless(session: &mut Session, ticks: u64) -> HeadlessSummary {
    let mut ticks_run = 0;
    for tick in 0..ticks {
        if session.phase() != SessionPhase::Running {
            break;
        }
        session.step(HEADLESS_FRAME_MS, &scripted_input(tick));
        ticks_run += 1;
    }

    let state = session.engine().state();
    let summary = HeadlessSummary {
        ticks_run,
        score: state.score,
        stage: state.stage,
        defeated: state.defeated_count,
        phase: state.phase,
    };
    let profile = session.finish();
    info!(
        ticks_run = summary.ticks_run,
        score = summary.score,
        stage = summary.stage,
        defeated = summary.defeated,
        phase = ?summary.phase,
        exp = profile.exp,
        gold = profile.gold,
        "headless_run_complete"
    );
    summary
}

/// Patrols back and forth, swinging often and casting slot 0 now and then.
fn scripted_input(tick: u64) -> InputSnapshot {
    let heading_right = (tick / 120) % 2 == 0;
    let move_action = if heading_right {
        InputAction::MoveRight
    } else {
        InputAction::MoveLeft
    };
    InputSnapshot::empty()
        .with_action_down(move_action, true)
        .with_attack_pressed(tick % 20 == 0)
        .with_jump_pressed(tick % 90 == 45)
        .with_dash_pressed(tick % 150 == 75)
        .with_quick_slot_pressed(0, tick % 60 == 30)
}

#[cfg(test)]
mod tests {
    use skirmish_engine::{EngineConfig, MetaGameState};

    use super::*;

    #[test]
    fn headless_run_stops_at_tick_budget_and_tears_down() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::start(
            EngineConfig::default(),
            MetaGameState::starter(),
            dir.path().to_path_buf(),
            11,
        )
        .expect("session");

        let summary = run_headless(&mut session, 30);
        assert!(summary.ticks_run <= 30);
        assert_eq!(session.phase(), SessionPhase::TornDown);
    }

    #[test]
    fn script_alternates_direction() {
        assert!(scripted_input(0).is_down(InputAction::MoveRight));
        assert!(scripted_input(130).is_down(InputAction::MoveLeft));
        assert!(scripted_input(0).attack_pressed());
        assert!(scripted_input(30).quick_slot_pressed(0));
    }

    #[test]
    fn zero_ticks_runs_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::start(
            EngineConfig::default(),
            MetaGameState::starter(),
            dir.path().to_path_buf(),
            5,
        )
        .expect("session");
        let summary = run_headless(&mut session, 0);
        assert_eq!(summary.ticks_run, 0);
        assert_eq!(summary.stage, 1);
    }
}
