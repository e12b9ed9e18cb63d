// Metronome scheduling - Detects beat boundaries inside an audio buffer
// Works on authority beat values, so it follows tempo changes and phase resets

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on the first beat of the quantum (downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

/// A beat boundary falling inside the current buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    /// Integer beat that was crossed
    pub beat: i64,
    /// Frame within the buffer where the beat lands
    pub frame_offset: usize,
    pub click_type: ClickType,
}

/// Metronome scheduler
/// Determines when clicks should occur based on the beat span of each buffer
#[derive(Debug, Clone, Default)]
pub struct MetronomeScheduler {
    last_beat: Option<i64>, // Last beat number that triggered a click
}

impl MetronomeScheduler {
    pub fn new() -> Self {
        Self { last_beat: None }
    }

    /// Check if a click should occur in a buffer spanning `[beat_start, beat_end)`
    ///
    /// Returns the first integer beat in the span, once per beat. Spans that do
    /// not move forward (stopped transport, backwards phase reset) yield nothing.
    pub fn check_for_click(
        &mut self,
        beat_start: f64,
        beat_end: f64,
        frames: usize,
        quantum: f64,
    ) -> Option<Click> {
        if frames == 0 || !(beat_end > beat_start) {
            return None;
        }

        let next_beat = beat_start.ceil();
        if next_beat >= beat_end {
            return None;
        }

        let beat = next_beat as i64;
        if self.last_beat == Some(beat) {
            return None;
        }
        self.last_beat = Some(beat);

        // Exact frame offset within the buffer where the beat occurs
        let fraction = (next_beat - beat_start) / (beat_end - beat_start);
        let frame_offset = ((fraction * frames as f64) as usize).min(frames - 1);

        Some(Click {
            beat,
            frame_offset,
            click_type: Self::click_type_for(next_beat, quantum),
        })
    }

    /// Accent on the quantum downbeat
    pub fn click_type_for(beat: f64, quantum: f64) -> ClickType {
        if quantum > 0.0 {
            let phase = beat.rem_euclid(quantum);
            if phase < 1e-9 || quantum - phase < 1e-9 {
                return ClickType::Accent;
            }
        }
        ClickType::Regular
    }

    /// Reset scheduler (transport restarted or timeline remapped)
    pub fn reset(&mut self) {
        self.last_beat = None;
    }

    pub fn last_beat(&self) -> Option<i64> {
        self.last_beat
    }
}
