//! Notification output.
//!
//! Every user-facing message goes through [`Notifier`]: it is always
//! printed, and when `--play-sounds` is set it is also spoken through the
//! Kokoro TTS pipeline. Playback is blocking, so a notification has fully
//! sounded before the next capture begins.

use anyhow::{Context, Result};
use tracing::info;

use crate::app::Notify;
use crate::audio::Player;
use crate::config::AppConfig;
use crate::tts::{self, Synthesizer};

/// Speech output pipeline: Kokoro synthesis plus blocking playback.
struct Speech {
    synthesizer: Synthesizer,
    player: Player,
}

impl Speech {
    fn new(config: &AppConfig) -> Result<Self> {
        let synthesizer = Synthesizer::new(config)?;
        let player = Player::new(synthesizer.sample_rate())?;
        Ok(Self { synthesizer, player })
    }

    /// Speak `message` sentence by sentence, blocking until playback ends.
    fn say(&mut self, message: &str) -> Result<()> {
        for sentence in tts::split_sentences(message) {
            let samples = self.synthesizer.synthesize_sentence(&sentence)?;
            if samples.is_empty() {
                continue;
            }
            self.player.play(&samples);
        }
        Ok(())
    }
}

/// The program's sole output channel.
pub struct Notifier {
    speech: Option<Speech>,
}

impl Notifier {
    /// Build the notifier. The speech pipeline is only constructed when
    /// `--play-sounds` is set, so without the flag no audio device or TTS
    /// model is ever touched.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let speech = if config.play_sounds { Some(Speech::new(config)?) } else { None };
        Ok(Self { speech })
    }
}

impl Notify for Notifier {
    fn notify(&mut self, message: &str) -> Result<()> {
        info!("{}", message);
        if let Some(speech) = self.speech.as_mut() {
            speech.say(message).context("Failed to speak notification")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_without_speech_is_print_only() {
        let mut notifier = Notifier { speech: None };
        assert!(notifier.notify("You said: hello").is_ok());
    }
}
