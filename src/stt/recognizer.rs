//! Whisper-based speech recognition.

use anyhow::Result;
use sherpa_rs::whisper::{WhisperConfig, WhisperRecognizer};
use thiserror::Error;
use tracing::{debug, info};

use crate::app::SpeechToText;
use crate::config::AppConfig;

use super::{Transcription, Utterance};

/// Whisper processes at most 30 seconds of audio per decode.
const WHISPER_WINDOW_SECONDS: f32 = 30.0;

/// Conditions the recognizer refuses to decode. These are reported to the
/// user but never end the session.
#[derive(Debug, Error)]
pub enum SttError {
    #[error("utterance is {got:.1}s, longer than the {limit:.0}s recognition window")]
    UtteranceTooLong { got: f32, limit: f32 },
    #[error("utterance sampled at {got} Hz, recognizer expects {expected} Hz")]
    SampleRateMismatch { got: u32, expected: u32 },
}

/// Speech recognizer wrapping a Whisper model.
pub struct Recognizer {
    whisper: WhisperRecognizer,
    sample_rate: u32,
}

impl Recognizer {
    /// Create a new speech recognizer.
    ///
    /// # Errors
    /// Returns an error if the Whisper model files are missing or invalid.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = config.effective_provider();

        debug!("Whisper encoder: {}", config.whisper_encoder_path().display());
        debug!("Whisper decoder: {}", config.whisper_decoder_path().display());
        debug!("Whisper tokens: {}", config.whisper_tokens_path().display());

        let language = config.effective_stt_language().to_string();
        info!(
            "Initializing Whisper ({} provider, language: {})",
            provider,
            if language.is_empty() { "auto" } else { &language }
        );

        let whisper_config = WhisperConfig {
            encoder: config.whisper_encoder_path().to_string_lossy().to_string(),
            decoder: config.whisper_decoder_path().to_string_lossy().to_string(),
            tokens: config.whisper_tokens_path().to_string_lossy().to_string(),
            language,
            provider: Some(provider.as_sherpa_provider().to_string()),
            num_threads: Some(config.stt_threads.try_into().unwrap_or(2)),
            debug: config.verbose,
            ..Default::default()
        };

        let whisper = WhisperRecognizer::new(whisper_config).map_err(|e| anyhow::anyhow!("Whisper initialization failed: {}", e))?;

        info!("Whisper recognizer ready");

        Ok(Self {
            whisper,
            sample_rate: config.sample_rate,
        })
    }

    /// Transcribe one utterance.
    ///
    /// Never fails the session: engine-level problems come back as
    /// [`Transcription::EngineError`], audio with no recognizable speech as
    /// [`Transcription::Unintelligible`].
    pub fn transcribe(&mut self, utterance: Utterance) -> Transcription {
        if utterance.samples.is_empty() {
            debug!("Segment contained no samples");
            return Transcription::Unintelligible;
        }

        if let Err(e) = self.check(&utterance) {
            return Transcription::EngineError(e.to_string());
        }

        debug!("Transcribing {} samples ({:.1}s)", utterance.samples.len(), utterance.duration_secs());

        let result = self.whisper.transcribe(self.sample_rate, &utterance.samples);
        let text = result.text.trim().to_string();

        if text.is_empty() {
            debug!("Whisper returned empty text");
            return Transcription::Unintelligible;
        }

        Transcription::Text(text)
    }

    fn check(&self, utterance: &Utterance) -> Result<(), SttError> {
        if utterance.sample_rate != self.sample_rate {
            return Err(SttError::SampleRateMismatch {
                got: utterance.sample_rate,
                expected: self.sample_rate,
            });
        }

        let duration = utterance.duration_secs();
        if duration > WHISPER_WINDOW_SECONDS {
            return Err(SttError::UtteranceTooLong {
                got: duration,
                limit: WHISPER_WINDOW_SECONDS,
            });
        }

        Ok(())
    }
}

impl SpeechToText for Recognizer {
    fn transcribe(&mut self, utterance: Utterance) -> Transcription {
        Recognizer::transcribe(self, utterance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_long_error_display() {
        let err = SttError::UtteranceTooLong { got: 42.5, limit: 30.0 };
        assert_eq!(err.to_string(), "utterance is 42.5s, longer than the 30s recognition window");
    }

    #[test]
    fn test_rate_mismatch_error_display() {
        let err = SttError::SampleRateMismatch { got: 44100, expected: 16000 };
        assert_eq!(err.to_string(), "utterance sampled at 44100 Hz, recognizer expects 16000 Hz");
    }
}
