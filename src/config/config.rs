//! Application configuration and CLI argument parsing.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::voices;

/// ONNX execution provider for the models.
/// Picked per platform unless set on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Plain CPU inference, always available
    #[default]
    Cpu,
    /// CUDA on NVIDIA GPUs (Linux, needs the CUDA toolkit)
    Cuda,
    /// CoreML on macOS (runs on the Neural Engine where supported)
    #[value(name = "coreml")]
    CoreMl,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Cpu => write!(f, "cpu"),
            Provider::Cuda => write!(f, "cuda"),
            Provider::CoreMl => write!(f, "coreml"),
        }
    }
}

impl Provider {
    /// Provider name in the form sherpa-rs expects.
    pub fn as_sherpa_provider(&self) -> &'static str {
        match self {
            Provider::Cpu => "cpu",
            Provider::Cuda => "cuda",
            Provider::CoreMl => "coreml",
        }
    }
}

/// Hotmic application configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "hotmic")]
#[command(author, version, about = "Hot-microphone loop: offline Whisper transcription with optional spoken feedback", long_about = None)]
pub struct AppConfig {
    /// Speak responses out loud in addition to printing them
    #[arg(long)]
    pub play_sounds: bool,

    /// List all available TTS voices and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Directory holding the Whisper, VAD and Kokoro model files
    #[arg(long, short = 'd', env = "HOTMIC_MODEL_DIR", default_value_os_t = default_model_dir())]
    pub model_dir: PathBuf,

    /// Capture sample rate handed to the recognizer
    #[arg(long, default_value = "16000")]
    pub sample_rate: u32,

    /// Speech probability threshold for the VAD (0.0 - 1.0)
    #[arg(long, default_value = "0.5")]
    pub vad_threshold: f32,

    /// Seconds of trailing silence that close an utterance
    #[arg(long, default_value = "0.8")]
    pub vad_silence_duration: f32,

    /// Spoken language for Whisper (en, es, fr, ...), or "auto" to detect
    #[arg(long, default_value = "en")]
    pub stt_language: String,

    /// Kokoro voice for spoken notifications.
    /// `--list-voices` prints the bundled English set; the full catalogue is at
    /// <https://huggingface.co/hexgrad/Kokoro-82M/blob/main/VOICES.md>
    #[arg(long, default_value = "af_bella")]
    pub tts_voice: String,

    /// Speech speed multiplier (slightly below 1.0 sounds more natural)
    #[arg(long, default_value = "0.93")]
    pub tts_speed: f32,

    /// ONNX execution provider (auto-detected when omitted)
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Thread count shared by the models (0 = derive from CPU cores)
    #[arg(long, default_value = "0")]
    pub num_threads: usize,

    /// Threads for the VAD model (0 = auto; one is plenty)
    #[arg(long, default_value = "0")]
    pub vad_threads: usize,

    /// Threads for Whisper (0 = follow --num-threads)
    #[arg(long, default_value = "0")]
    pub stt_threads: usize,

    /// Threads for Kokoro (0 = follow --num-threads)
    #[arg(long, default_value = "0")]
    pub tts_threads: usize,
}

impl AppConfig {
    /// Parse the command line, resolving flags that exit before the session starts.
    pub fn from_args() -> Self {
        let mut config = Self::parse();

        if config.list_voices {
            voices::print_voices();
            std::process::exit(0);
        }

        config.normalize_thread_counts();
        config
    }

    /// Resolve the zero (auto) thread counts.
    ///
    /// Under CUDA the GPU already parallelizes inference; extra CPU threads
    /// just contend and can trip CUDA allocation failures, so everything
    /// collapses to one thread.
    fn normalize_thread_counts(&mut self) {
        let cpu_cores = num_cpus::get();
        let using_cuda = self.effective_provider() == Provider::Cuda;

        if self.num_threads == 0 {
            if using_cuda {
                self.num_threads = 1;
            } else {
                // cores/3 leaves headroom for the capture and playback callbacks
                self.num_threads = (cpu_cores / 3).max(1);
            }
        }

        // The Silero model is tiny, one thread is enough
        if self.vad_threads == 0 {
            self.vad_threads = 1;
        }

        if self.stt_threads == 0 {
            self.stt_threads = if using_cuda { 1 } else { self.num_threads };
        }

        if self.tts_threads == 0 {
            self.tts_threads = if using_cuda { 1 } else { self.num_threads };
        }

        if self.verbose {
            info!(
                "Threads: vad={}, stt={}, tts={} ({} cores, {} provider)",
                self.vad_threads,
                self.stt_threads,
                self.tts_threads,
                cpu_cores,
                self.effective_provider()
            );
        }
    }

    /// Provider actually in effect, after auto-detection.
    pub fn effective_provider(&self) -> Provider {
        self.provider.unwrap_or_else(detect_provider)
    }

    /// Whisper encoder model path.
    pub fn whisper_encoder_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-encoder.int8.onnx")
    }

    /// Whisper decoder model path.
    pub fn whisper_decoder_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-decoder.int8.onnx")
    }

    /// Whisper tokens file path.
    pub fn whisper_tokens_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-tokens.txt")
    }

    /// Language code handed to Whisper; empty selects auto-detection.
    pub fn effective_stt_language(&self) -> &str {
        if self.stt_language.eq_ignore_ascii_case("auto") {
            ""
        } else {
            &self.stt_language
        }
    }

    /// Silero VAD model path.
    pub fn vad_model_path(&self) -> PathBuf {
        self.model_dir.join("silero_vad.onnx")
    }

    fn tts_dir(&self) -> PathBuf {
        self.model_dir.join("tts").join("kokoro-multi-lang-v1_0")
    }

    /// Kokoro model path (the multi-lang v1.0 build, which CoreML can run).
    pub fn tts_model_path(&self) -> PathBuf {
        self.tts_dir().join("model.onnx")
    }

    /// Kokoro voices.bin path.
    pub fn tts_voices_path(&self) -> PathBuf {
        self.tts_dir().join("voices.bin")
    }

    /// Kokoro tokens file path.
    pub fn tts_tokens_path(&self) -> PathBuf {
        self.tts_dir().join("tokens.txt")
    }

    /// espeak-ng data directory for Kokoro.
    pub fn tts_data_dir(&self) -> PathBuf {
        self.tts_dir().join("espeak-ng-data")
    }

    /// Kokoro dict directory.
    pub fn tts_dict_dir(&self) -> PathBuf {
        self.tts_dir().join("dict")
    }

    /// Lexicon file matching the voice's accent.
    /// The model ships lexicon-us-en.txt and lexicon-gb-en.txt.
    pub fn tts_lexicon(&self) -> String {
        let accent = if self.tts_voice.starts_with("bf") || self.tts_voice.starts_with("bm") {
            "lexicon-gb-en.txt"
        } else {
            "lexicon-us-en.txt"
        };
        self.tts_dir().join(accent).to_string_lossy().to_string()
    }

    /// Validate the configuration.
    ///
    /// Ranges are checked first, then the model files the session will
    /// actually load. TTS model files are only required with --play-sounds.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.vad_threshold) {
            anyhow::bail!("VAD threshold must be between 0.0 and 1.0");
        }

        if self.tts_speed <= 0.0 {
            anyhow::bail!("TTS speed must be positive");
        }

        if self.play_sounds && voices::get_voice(&self.tts_voice).is_none() {
            anyhow::bail!("Unknown TTS voice: {} (use --list-voices to see available voices)", self.tts_voice);
        }

        if !self.model_dir.exists() {
            anyhow::bail!("Model directory does not exist: {}", self.model_dir.display());
        }

        let mut required_files = vec![
            self.whisper_encoder_path(),
            self.whisper_decoder_path(),
            self.whisper_tokens_path(),
            self.vad_model_path(),
        ];

        if self.play_sounds {
            required_files.push(self.tts_model_path());
            required_files.push(self.tts_voices_path());
            required_files.push(self.tts_tokens_path());
        }

        for path in &required_files {
            if !path.exists() {
                anyhow::bail!("Required model file not found: {}", path.display());
            }
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Model directory: {}", self.model_dir.display());
        info!("  Sample rate: {} Hz", self.sample_rate);
        info!("  VAD threshold: {}", self.vad_threshold);
        info!("  STT language: {}", self.stt_language);
        info!("  Provider: {}", self.effective_provider());
        info!("  Play sounds: {}", self.play_sounds);
        if self.play_sounds {
            info!("  TTS voice: {}", self.tts_voice);
            info!("  TTS speed: {}", self.tts_speed);
        }
    }
}

/// Default model directory, ~/.hotmic/models when a home directory exists.
fn default_model_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".hotmic").join("models"),
        None => PathBuf::from("models"),
    }
}

/// Pick a provider for the current platform.
fn detect_provider() -> Provider {
    #[cfg(target_os = "macos")]
    {
        info!("Auto-detected CoreML provider (macOS)");
        Provider::CoreMl
    }

    #[cfg(target_os = "linux")]
    {
        if has_nvidia_gpu() {
            info!("Auto-detected CUDA provider (NVIDIA GPU present)");
            Provider::Cuda
        } else {
            info!("No NVIDIA GPU found, using CPU provider");
            Provider::Cpu
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        info!("Using CPU provider");
        Provider::Cpu
    }
}

/// Look for NVIDIA device nodes, including the Jetson/Tegra variants.
#[cfg(target_os = "linux")]
fn has_nvidia_gpu() -> bool {
    use std::path::Path;

    const DEVICE_NODES: [&str; 5] = [
        "/dev/nvidia0",
        "/dev/nvidiactl",
        "/dev/nvidia-uvm",
        "/dev/nvhost-ctrl",
        "/dev/nvhost-ctrl-gpu",
    ];

    DEVICE_NODES.iter().any(|node| Path::new(node).exists())
        || Path::new("/etc/nv_tegra_release").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::try_parse_from(["hotmic"]).unwrap();
        assert!(!config.play_sounds);
        assert!(!config.list_voices);
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.stt_language, "en");
        assert_eq!(config.tts_voice, "af_bella");
        assert!((config.vad_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_play_sounds_flag() {
        let config = AppConfig::try_parse_from(["hotmic", "--play-sounds"]).unwrap();
        assert!(config.play_sounds);
    }

    #[test]
    fn test_effective_stt_language_auto() {
        let config = AppConfig::try_parse_from(["hotmic", "--stt-language", "auto"]).unwrap();
        assert_eq!(config.effective_stt_language(), "");
    }

    #[test]
    fn test_validate_rejects_bad_vad_threshold() {
        let mut config = AppConfig::try_parse_from(["hotmic"]).unwrap();
        config.vad_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("VAD threshold"));
    }

    #[test]
    fn test_validate_rejects_negative_tts_speed() {
        let mut config = AppConfig::try_parse_from(["hotmic"]).unwrap();
        config.tts_speed = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("TTS speed"));
    }

    #[test]
    fn test_validate_rejects_unknown_voice() {
        let mut config = AppConfig::try_parse_from(["hotmic", "--play-sounds"]).unwrap();
        config.tts_voice = "xx_nobody".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown TTS voice"));
    }

    #[test]
    fn test_thread_normalization_cpu() {
        let mut config = AppConfig::try_parse_from(["hotmic", "--provider", "cpu"]).unwrap();
        config.normalize_thread_counts();
        assert_eq!(config.vad_threads, 1);
        assert!(config.num_threads >= 1);
        assert_eq!(config.stt_threads, config.num_threads);
        assert_eq!(config.tts_threads, config.num_threads);
    }

    #[test]
    fn test_thread_normalization_cuda() {
        let mut config = AppConfig::try_parse_from(["hotmic", "--provider", "cuda"]).unwrap();
        config.normalize_thread_counts();
        assert_eq!(config.num_threads, 1);
        assert_eq!(config.stt_threads, 1);
        assert_eq!(config.tts_threads, 1);
    }

    #[test]
    fn test_lexicon_follows_voice_prefix() {
        let mut config = AppConfig::try_parse_from(["hotmic"]).unwrap();
        config.tts_voice = "bf_emma".to_string();
        assert!(config.tts_lexicon().ends_with("lexicon-gb-en.txt"));
        config.tts_voice = "am_adam".to_string();
        assert!(config.tts_lexicon().ends_with("lexicon-us-en.txt"));
    }
}
