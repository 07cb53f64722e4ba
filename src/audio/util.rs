//! Shared audio helpers for the capture and playback streams.

use anyhow::Result;
use cpal::traits::DeviceTrait;
use cpal::{Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};

/// Human-readable device name for logs, or "Unknown" when unavailable.
pub fn device_name(device: &Device) -> String {
    device.description().ok().map(|desc| desc.name().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Pick a stream configuration for the given target rate.
///
/// Only mono/stereo F32 configurations are considered (F32 is universally
/// supported on modern hardware). A configuration whose rate range contains
/// the target is preferred; otherwise the nearest supported rate is used and
/// the caller resamples.
pub fn select_config(configs: impl Iterator<Item = SupportedStreamConfigRange>, target_rate: u32) -> Result<SupportedStreamConfig> {
    let candidates: Vec<SupportedStreamConfigRange> =
        configs.filter(|c| c.channels() <= 2 && c.sample_format() == SampleFormat::F32).collect();

    if candidates.is_empty() {
        anyhow::bail!("Device offers no F32 stream configuration");
    }

    for config in &candidates {
        if (config.min_sample_rate()..=config.max_sample_rate()).contains(&target_rate) {
            return Ok((*config).with_sample_rate(target_rate));
        }
    }

    // Nothing covers the target; clamp to the nearest rate of the first candidate.
    let config = &candidates[0];
    let rate = if target_rate < config.min_sample_rate() { config.min_sample_rate() } else { config.max_sample_rate() };
    Ok((*config).with_sample_rate(rate))
}

/// Downmix interleaved f32 frames to mono by averaging the channels.
/// Mono input is returned as-is.
pub fn downmix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        data.to_vec()
    } else {
        data.chunks(channels).map(|frame| frame.iter().sum::<f32>() / frame.len() as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo_averages_channels() {
        let data = vec![0.5f32, 1.0, -0.5, -1.0];
        let result = downmix_to_mono(&data, 2);
        assert_eq!(result, vec![0.75, -0.75]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let data = vec![0.1f32, -0.2, 0.3];
        let result = downmix_to_mono(&data, 1);
        assert_eq!(result, data);
    }

    #[test]
    fn test_downmix_ragged_tail_frame() {
        // A trailing partial frame is averaged over its own length.
        let data = vec![0.4f32, 0.8, 0.6];
        let result = downmix_to_mono(&data, 2);
        assert_eq!(result.len(), 2);
        assert!((result[0] - 0.6).abs() < f32::EPSILON);
        assert!((result[1] - 0.6).abs() < f32::EPSILON);
    }
}
