//! Utterance capture: scoped microphone sessions gated by Silero VAD.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use sherpa_rs::silero_vad::{SileroVad, SileroVadConfig};
use tracing::{debug, info};

use crate::app::UtteranceSource;
use crate::audio::Microphone;
use crate::config::AppConfig;

use super::Utterance;

/// Minimum speech duration in seconds to be considered valid.
const MIN_SPEECH_DURATION: f32 = 0.1;

/// Maximum speech duration in seconds before the VAD force-closes a segment.
/// Longer than the recognizer's window, so oversized utterances surface as
/// recognition errors instead of being silently truncated.
const MAX_SPEECH_DURATION: f32 = 60.0;

/// VAD window size in samples (512 samples = 32ms at 16kHz).
const VAD_WINDOW_SIZE: i32 = 512;

/// Buffer size in seconds for VAD (how much audio to accumulate).
const VAD_BUFFER_SIZE_SECONDS: f32 = 120.0;

/// How long to sleep when the capture ring is empty.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read buffer size in samples for draining the capture ring.
const DRAIN_BUFFER_SIZE: usize = 2048;

/// Captures one utterance at a time from the microphone.
///
/// The VAD model stays loaded for the lifetime of the listener; the
/// microphone itself is only held open while [`Listener::listen`] runs.
pub struct Listener {
    microphone: Microphone,
    vad: SileroVad,
}

impl Listener {
    /// Create a new listener.
    ///
    /// # Errors
    /// Returns an error if no input device is available or the VAD model
    /// cannot be loaded.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let microphone = Microphone::open(config.sample_rate)?;

        let provider = config.effective_provider();
        info!("Initializing Silero VAD ({} provider)", provider);

        let vad_config = SileroVadConfig {
            model: config.vad_model_path().to_string_lossy().to_string(),
            threshold: config.vad_threshold,
            sample_rate: config.sample_rate,
            min_silence_duration: config.vad_silence_duration,
            min_speech_duration: MIN_SPEECH_DURATION,
            max_speech_duration: MAX_SPEECH_DURATION,
            window_size: VAD_WINDOW_SIZE,
            provider: Some(provider.as_sherpa_provider().to_string()),
            num_threads: Some(config.vad_threads.try_into().unwrap_or(1)),
            debug: config.verbose,
        };

        let vad = SileroVad::new(vad_config, VAD_BUFFER_SIZE_SECONDS).map_err(|e| anyhow::anyhow!("Failed to initialize Silero VAD: {}", e))?;

        info!("VAD initialized");

        Ok(Self { microphone, vad })
    }

    /// Hold the microphone open until the VAD closes one voiced segment.
    ///
    /// Returns `Ok(None)` when `cancel` is raised before a segment
    /// completes; the partial capture is discarded. The microphone is
    /// released before this returns either way.
    pub fn listen(&mut self, cancel: &AtomicBool) -> Result<Option<Utterance>> {
        // Discard segments left over from a cancelled session.
        while !self.vad.is_empty() {
            self.vad.pop();
        }

        let mut stream = self.microphone.start_capture()?;
        let mut buf = vec![0.0f32; DRAIN_BUFFER_SIZE];
        let mut was_speaking = false;
        let mut speech_start: Option<Instant> = None;

        loop {
            if cancel.load(Ordering::Relaxed) {
                return Ok(None);
            }

            let read = stream.drain(&mut buf);
            if read == 0 {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }

            self.vad.accept_waveform(buf[..read].to_vec());

            // Track speech state transitions for logging
            let is_speech = self.vad.is_speech();
            if is_speech && !was_speaking {
                speech_start = Some(Instant::now());
                debug!("Speech started");
            } else if !is_speech
                && was_speaking
                && let Some(start) = speech_start.take()
            {
                debug!("Speech ended ({:.1}s)", start.elapsed().as_secs_f32());
            }
            was_speaking = is_speech;

            if !self.vad.is_empty() {
                let segment = self.vad.front();
                self.vad.pop();

                if !segment.samples.is_empty() {
                    debug!("Segment completed: {} samples", segment.samples.len());
                    return Ok(Some(Utterance {
                        samples: segment.samples,
                        sample_rate: self.microphone.sample_rate(),
                    }));
                }
            }
        }
    }
}

impl UtteranceSource for Listener {
    fn next_utterance(&mut self, cancel: &AtomicBool) -> Result<Option<Utterance>> {
        self.listen(cancel)
    }
}
