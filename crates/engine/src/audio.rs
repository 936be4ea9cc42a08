/// Fire-and-forget sound cues emitted by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    Jump,
    Attack,
    Hit,
    EnemyHit,
    EnemyDeath,
    SkillCast,
    StageClear,
    GameOver,
}

impl AudioCue {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Jump => "jump",
            Self::Attack => "attack",
            Self::Hit => "hit",
            Self::EnemyHit => "enemy_hit",
            Self::EnemyDeath => "enemy_death",
            Self::SkillCast => "skill_cast",
            Self::StageClear => "stage_clear",
            Self::GameOver => "game_over",
        }
    }
}

/// Host-side audio collaborator. Calls must return immediately.
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// Forwards every cue in emission order.
pub fn dispatch_cues(sink: &mut dyn AudioSink, cues: &[AudioCue]) {
    for cue in cues {
        sink.play(*cue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        played: Vec<AudioCue>,
    }

    impl AudioSink for RecordingSink {
        fn play(&mut self, cue: AudioCue) {
            self.played.push(cue);
        }
    }

    #[test]
    fn dispatch_preserves_order() {
        let mut sink = RecordingSink::default();
        dispatch_cues(&mut sink, &[AudioCue::SkillCast, AudioCue::EnemyHit]);
        assert_eq!(sink.played, vec![AudioCue::SkillCast, AudioCue::EnemyHit]);
    }
}
