//! FFT-based audio resampling via rubato.
//!
//! Two flavors: a streaming state for the capture callback, where samples
//! arrive in arbitrary-sized slices, and a batch function for preparing TTS
//! output for the playback device.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Input chunk size for the FFT resampler.
const CHUNK_SIZE: usize = 1024;

/// FFT sub-chunks per chunk (higher = better quality, more CPU).
const SUB_CHUNKS: usize = 2;

/// Streaming mono resampler for audio callbacks.
///
/// Accumulates incoming samples until a full chunk is available, then emits
/// the converted audio. State is carried across calls, so one instance must
/// stay with one stream.
pub struct StreamResampler {
    resampler: Fft<f32>,
    pending: Vec<f32>,
    output: Vec<f32>,
    output_max: usize,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self> {
        let resampler =
            Fft::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input).context("Failed to create resampler")?;
        let output_max = resampler.output_frames_max();

        Ok(Self { resampler, pending: Vec::with_capacity(CHUNK_SIZE * 2), output: vec![0.0; output_max], output_max })
    }

    /// Feed captured samples; returns whatever converted audio became ready.
    /// The result is empty while the internal buffer is still filling.
    pub fn feed(&mut self, samples: &[f32]) -> Vec<f32> {
        self.pending.extend_from_slice(samples);

        let mut ready = Vec::new();
        while self.pending.len() >= CHUNK_SIZE {
            let chunk: Vec<f32> = self.pending.drain(..CHUNK_SIZE).collect();
            if let Some(converted) = self.convert_chunk(&chunk) {
                ready.extend_from_slice(converted);
            }
        }
        ready
    }

    fn convert_chunk(&mut self, chunk: &[f32]) -> Option<&[f32]> {
        let input = InterleavedSlice::new(chunk, 1, CHUNK_SIZE).ok()?;
        let mut output = InterleavedSlice::new_mut(&mut self.output, 1, self.output_max).ok()?;
        let (_, written) = self.resampler.process_into_buffer(&input, &mut output, None).ok()?;
        (written > 0).then(|| &self.output[..written])
    }
}

/// Resample a whole mono buffer from one rate to another.
///
/// Used for TTS output before playback. The final chunk is zero-padded to
/// the resampler's fixed input size and the excess is trimmed afterwards,
/// keeping a small tail so the filter delay does not clip real audio.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        Fft::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input).context("Failed to create resampler")?;

    let output_max = resampler.output_frames_max();
    let mut output_buffer = vec![0.0f32; output_max];

    let expected_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64) as usize;
    let mut output = Vec::with_capacity(expected_len + CHUNK_SIZE);

    let mut padded = Vec::new();
    for chunk in samples.chunks(CHUNK_SIZE) {
        let input_chunk = if chunk.len() == CHUNK_SIZE {
            chunk
        } else {
            padded.clear();
            padded.extend_from_slice(chunk);
            padded.resize(CHUNK_SIZE, 0.0);
            &padded[..]
        };

        let input = InterleavedSlice::new(input_chunk, 1, CHUNK_SIZE).context("Failed to create input adapter")?;
        let mut out = InterleavedSlice::new_mut(&mut output_buffer, 1, output_max).context("Failed to create output adapter")?;

        let (_, written) = resampler.process_into_buffer(&input, &mut out, None).map_err(|e| anyhow::anyhow!("Resampling error: {}", e))?;
        output.extend_from_slice(&output_buffer[..written]);
    }

    output.truncate(expected_len + 100);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_noop_when_rates_match() {
        let samples = vec![0.25f32; 512];
        let result = resample(&samples, 16000, 16000).unwrap();
        assert_eq!(result, samples);
    }

    #[test]
    fn test_resample_upsampling_length() {
        // 16kHz -> 48kHz triples the sample count (within padding margin).
        let samples = vec![0.0; 16000];
        let result = resample(&samples, 16000, 48000).unwrap();
        assert!(result.len() >= 48000 && result.len() <= 48100);
    }

    #[test]
    fn test_resample_downsampling_length() {
        // 48kHz -> 16kHz yields roughly a third of the samples.
        let samples = vec![0.0; 48000];
        let result = resample(&samples, 48000, 16000).unwrap();
        assert!(result.len() >= 15900 && result.len() <= 16100, "got {} samples", result.len());
    }

    #[test]
    fn test_stream_resampler_accumulates_small_slices() {
        let mut state = StreamResampler::new(48000, 16000).unwrap();
        let mut produced = 0usize;
        // 48k samples fed 480 at a time; output settles near a third.
        for _ in 0..100 {
            produced += state.feed(&[0.0f32; 480]).len();
        }
        assert!(produced >= 15000 && produced <= 16100, "produced {}", produced);
    }
}
