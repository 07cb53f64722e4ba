//! Speaker output for spoken notifications.
//!
//! Queues mono samples into a lock-free ring drained by the cpal output
//! callback, resampling first when the device rate differs from the
//! synthesizer rate, and blocks the caller until the queued audio has
//! drained so notifications never overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use tracing::{debug, info, warn};

use super::resampler::resample;
use super::util::{device_name, select_config};

/// Ring capacity in samples, roughly 11 seconds at 48 kHz.
const PLAYBACK_RING_SIZE: usize = 524288;

/// Owns the cpal output stream and feeds it synthesized audio.
///
/// The device callback only pops the ring, so it never takes a lock;
/// completion is signalled back through a condition variable.
pub struct Player {
    /// Dropping the stream stops the device callback
    _stream: Stream,
    /// Rate the output device runs at
    device_rate: u32,
    /// Rate of the samples handed to [`Player::play`]
    input_rate: u32,
    producer: Mutex<HeapProd<f32>>,
    /// Raised while queued audio is still draining
    playing: Arc<AtomicBool>,
    /// Pairs with `playback_done` so `play` can sleep instead of spinning
    playing_mutex: Arc<StdMutex<()>>,
    playback_done: Arc<Condvar>,
}

impl Player {
    /// Open the default output device for mono samples at `sample_rate`.
    ///
    /// # Errors
    /// Returns an error if no output device is available or the output
    /// stream cannot be built.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;

        info!("Using output device: {}", device_name(&device));

        // The device's own default rate avoids a surprise resample inside
        // the OS mixer; fall back to picking a config near 48 kHz.
        let device_rate = match device.default_output_config() {
            Ok(default_config) => {
                let rate = default_config.sample_rate();
                info!("Output device default rate: {} Hz", rate);
                rate
            }
            Err(_) => {
                let supported = device
                    .supported_output_configs()
                    .context("Failed to get supported output configs")?;
                let config = select_config(supported, 48000)?;
                let rate = config.sample_rate();
                info!("Output device fallback rate: {} Hz", rate);
                rate
            }
        };

        let supported = device
            .supported_output_configs()
            .context("Failed to get supported output configs")?;
        let config = select_config(supported, device_rate)?;

        if device_rate != sample_rate {
            info!(
                "Output device runs at {} Hz, synthesizer produces {} Hz; resampling",
                device_rate, sample_rate
            );
        }
        debug!(
            "Playback config: {} Hz, {} channels, {:?}",
            device_rate,
            config.channels(),
            config.sample_format()
        );

        let ring = HeapRb::<f32>::new(PLAYBACK_RING_SIZE);
        let (producer, mut consumer) = ring.split();

        let playing = Arc::new(AtomicBool::new(false));
        let playing_mutex = Arc::new(StdMutex::new(()));
        let playback_done = Arc::new(Condvar::new());

        let playing_clone = playing.clone();
        let playing_mutex_clone = playing_mutex.clone();
        let playback_done_clone = playback_done.clone();

        let channels = config.channels() as usize;
        let stream_config: StreamConfig = config.config();

        let err_fn = |err| {
            tracing::error!("Playback stream error: {}", err);
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        // Mono source, same sample on every channel
                        for channel in frame.iter_mut() {
                            *channel = sample;
                        }
                    }

                    if consumer.is_empty() {
                        playing_clone.store(false, Ordering::SeqCst);
                        let _guard = playing_mutex_clone.lock().unwrap();
                        playback_done_clone.notify_all();
                    }
                },
                err_fn,
                None,
            )
            .context("Failed to build output stream")?;

        stream.play().context("Failed to start playback stream")?;

        info!("Playback ready: {} Hz in, {} Hz out", sample_rate, device_rate);

        Ok(Self {
            _stream: stream,
            device_rate,
            input_rate: sample_rate,
            producer: Mutex::new(producer),
            playing,
            playing_mutex,
            playback_done,
        })
    }

    /// Queue mono samples and block until the device has drained them.
    pub fn play(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let samples_to_play = if self.device_rate != self.input_rate {
            match resample(samples, self.input_rate, self.device_rate) {
                Ok(resampled) => {
                    debug!(
                        "Resampled notification audio {} -> {} samples ({} -> {} Hz)",
                        samples.len(),
                        resampled.len(),
                        self.input_rate,
                        self.device_rate
                    );
                    resampled
                }
                Err(e) => {
                    tracing::error!("Resampling failed ({}), playing at the source rate", e);
                    samples.to_vec()
                }
            }
        } else {
            samples.to_vec()
        };

        {
            let mut producer = self.producer.lock();
            let written = producer.push_slice(&samples_to_play);
            if written < samples_to_play.len() {
                warn!("Playback ring full, dropped {} samples", samples_to_play.len() - written);
            }
        }

        self.playing.store(true, Ordering::SeqCst);

        debug!("Playing {} samples at {} Hz", samples_to_play.len(), self.device_rate);

        // Deadline covers a stalled or yanked output device
        let duration_secs = samples_to_play.len() as f64 / self.device_rate as f64;
        let deadline = std::time::Instant::now() + Duration::from_secs_f64(duration_secs + 1.0);

        while self.playing.load(Ordering::Relaxed) {
            if std::time::Instant::now() > deadline {
                warn!("Gave up waiting for playback to drain");
                self.playing.store(false, Ordering::SeqCst);
                return;
            }

            let guard = self.playing_mutex.lock().unwrap();
            let (_guard, _timeout) = self.playback_done.wait_timeout(guard, Duration::from_millis(50)).unwrap();

            if !self.playing.load(Ordering::Relaxed) {
                break;
            }
        }

        debug!("Playback finished");
    }
}
