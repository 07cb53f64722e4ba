//! Kokoro speech synthesis for the notification channel.

use anyhow::Result;
use sherpa_rs::OnnxConfig;
use sherpa_rs::tts::{CommonTtsConfig, KokoroTts, KokoroTtsConfig};
use tracing::{debug, info};

use crate::config::{AppConfig, voices};

/// Kokoro always emits 24 kHz mono.
const KOKORO_SAMPLE_RATE: u32 = 24000;

/// A Kokoro TTS engine bound to one English voice.
pub struct Synthesizer {
    tts: KokoroTts,
    speaker_id: i32,
    speed: f32,
}

impl Synthesizer {
    /// Load the Kokoro model for the configured voice.
    ///
    /// # Errors
    /// Returns an error when the voice name is unknown; a missing model
    /// file surfaces as an engine initialization failure.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = config.effective_provider();

        let voice = voices::get_voice(&config.tts_voice).ok_or_else(|| anyhow::anyhow!("Unknown TTS voice: {}", config.tts_voice))?;

        info!("Initializing Kokoro TTS with {} provider", provider);
        info!("Voice: {} (speaker id {})", config.tts_voice, voice.speaker_id);

        let tts_config = KokoroTtsConfig {
            model: config.tts_model_path().to_string_lossy().to_string(),
            voices: config.tts_voices_path().to_string_lossy().to_string(),
            tokens: config.tts_tokens_path().to_string_lossy().to_string(),
            data_dir: config.tts_data_dir().to_string_lossy().to_string(),
            dict_dir: config.tts_dict_dir().to_string_lossy().to_string(),
            lexicon: config.tts_lexicon(),
            lang: String::new(), // English voices resolve through the lexicon files
            length_scale: 1.0 / config.tts_speed, // sherpa expresses speed as its reciprocal
            onnx_config: OnnxConfig {
                provider: provider.as_sherpa_provider().to_string(),
                num_threads: config.tts_threads.try_into().unwrap_or(2),
                debug: config.verbose,
            },
            common_config: CommonTtsConfig { max_num_sentences: 1, ..Default::default() }, // Kokoro rejects multi-sentence input
        };

        let tts = KokoroTts::new(tts_config);

        Ok(Self { tts, speaker_id: voice.speaker_id, speed: config.tts_speed })
    }

    /// Synthesize one sentence to mono samples.
    ///
    /// # Errors
    /// Returns an error if generation fails inside the engine.
    pub fn synthesize_sentence(&mut self, sentence: &str) -> Result<Vec<f32>> {
        if sentence.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Synthesizing: \"{}\"", sentence);

        let audio = self.tts.create(sentence, self.speaker_id, self.speed).map_err(|e| anyhow::anyhow!("TTS generation failed: {}", e))?;

        debug!("Synthesized {} samples", audio.samples.len());
        Ok(audio.samples)
    }

    /// Rate of the samples [`Self::synthesize_sentence`] returns.
    pub fn sample_rate(&self) -> u32 {
        KOKORO_SAMPLE_RATE
    }
}

/// Split text on sentence punctuation.
///
/// Kokoro synthesizes one sentence per call, so multi-sentence
/// notifications go through this first.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | '\n') {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("Hotmic ready. Press Ctrl+C to stop.");
        assert_eq!(sentences, vec!["Hotmic ready.", "Press Ctrl+C to stop."]);
    }

    #[test]
    fn test_split_sentences_trailing_text() {
        let sentences = split_sentences("You said: hello there");
        assert_eq!(sentences, vec!["You said: hello there"]);
    }

    #[test]
    fn test_split_sentences_mixed_punctuation() {
        let sentences = split_sentences("Really? Yes!\nOkay.");
        assert_eq!(sentences, vec!["Really?", "Yes!", "Okay."]);
    }

    #[test]
    fn test_split_sentences_empty() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n  ").is_empty());
    }
}
