//! Utterance capture and offline transcription.
//!
//! A Silero VAD carves voiced segments out of the microphone stream, and
//! Whisper turns each segment into a transcription outcome.

mod listener;
mod recognizer;

pub use listener::Listener;
pub use recognizer::Recognizer;

/// One voiced segment captured from the microphone.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Mono samples, already at the recognizer's rate.
    pub samples: Vec<f32>,
    /// Sample rate of `samples` in Hz.
    pub sample_rate: u32,
}

impl Utterance {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Result of transcribing one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Transcription {
    /// Recognized speech.
    Text(String),
    /// The engine produced no usable text for the audio.
    Unintelligible,
    /// The engine failed; the detail is reported but the session continues.
    EngineError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_duration() {
        let utterance = Utterance {
            samples: vec![0.0; 8000],
            sample_rate: 16000,
        };
        assert!((utterance.duration_secs() - 0.5).abs() < f32::EPSILON);
    }
}
