use std::collections::BTreeMap;

use skirmish_engine::{AudioCue, AudioSink};
use tracing::debug;

/// Stand-in audio collaborator: every cue becomes a debug event.
#[derive(Debug, Default)]
pub(crate) struct TracingAudioSink {
    played: BTreeMap<&'static str, u64>,
}

impl TracingAudioSink {
    pub(crate) fn total_played(&self) -> u64 {
        self.played.values().sum()
    }

    pub(crate) fn played(&self, cue: AudioCue) -> u64 {
        self.played.get(cue.as_token()).copied().unwrap_or(0)
    }
}

impl AudioSink for TracingAudioSink {
    fn play(&mut self, cue: AudioCue) {
        let count = self.played.entry(cue.as_token()).or_insert(0);
        *count = count.saturating_add(1);
        debug!(cue = cue.as_token(), "audio_cue");
    }
}

#[cfg(test)]
mod tests {
    use skirmish_engine::dispatch_cues;

    use super::*;

    #[test]
    fn cues_are_counted_per_kind() {
        let mut sink = TracingAudioSink::default();
        dispatch_cues(
            &mut sink,
            &[AudioCue::Jump, AudioCue::EnemyHit, AudioCue::EnemyHit],
        );
        assert_eq!(sink.played(AudioCue::EnemyHit), 2);
        assert_eq!(sink.played(AudioCue::GameOver), 0);
        assert_eq!(sink.total_played(), 3);
    }
}
