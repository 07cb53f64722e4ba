//! Microphone capture using cpal.
//!
//! The microphone is treated as a scoped resource. [`Microphone`] resolves
//! the input device and stream configuration once at startup, and each
//! capture opens a fresh input stream whose callback downmixes to mono,
//! resamples to the target rate when needed, and pushes into a lock-free
//! ring buffer. Dropping the [`CaptureStream`] stops the stream and
//! releases the device.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, SupportedStreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use tracing::{debug, info, warn};

use super::resampler::StreamResampler;
use super::util::{device_name, downmix_to_mono, select_config};

/// Ring capacity in resampled samples (~4 seconds at 16 kHz).
const CAPTURE_RING_SIZE: usize = 65536;

/// Handle to the default input device.
///
/// Resolving the device and its configuration happens once; the device is
/// only held open while a [`CaptureStream`] is alive.
pub struct Microphone {
    device: Device,
    config: SupportedStreamConfig,
    device_rate: u32,
    target_rate: u32,
}

impl Microphone {
    /// Resolve the default input device and pick a capture configuration
    /// close to `target_rate`. A missing input device is fatal.
    pub fn open(target_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input device available")?;
        info!("Using input device: {}", device_name(&device));

        let supported = device
            .supported_input_configs()
            .context("Failed to get supported input configs")?;
        let config = select_config(supported, target_rate)?;
        let device_rate = config.sample_rate();

        if device_rate != target_rate {
            info!(
                "Input device runs at {} Hz, recognizer wants {} Hz; resampling",
                device_rate, target_rate
            );
        }
        debug!(
            "Capture config: {} Hz, {} channels, {:?}",
            device_rate,
            config.channels(),
            config.sample_format()
        );

        Ok(Self {
            device,
            config,
            device_rate,
            target_rate,
        })
    }

    /// Acquire the microphone for one capture session.
    ///
    /// Builds a fresh input stream and starts it immediately. Samples land
    /// in the returned [`CaptureStream`] already mono and at the target
    /// rate.
    pub fn start_capture(&self) -> Result<CaptureStream> {
        let ring = HeapRb::<f32>::new(CAPTURE_RING_SIZE);
        let (mut producer, consumer) = ring.split();

        let channels = self.config.channels() as usize;
        let stream_config: StreamConfig = self.config.config();

        let mut resampler = if self.device_rate != self.target_rate {
            Some(StreamResampler::new(self.device_rate, self.target_rate)?)
        } else {
            None
        };
        let mut overflows: u64 = 0;

        let err_fn = |err| {
            tracing::error!("Capture stream error: {}", err);
        };

        // F32 input is guaranteed by select_config.
        let stream = self
            .device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = downmix_to_mono(data, channels);
                    let samples = match resampler.as_mut() {
                        Some(state) => state.feed(&mono),
                        None => mono,
                    };
                    if samples.is_empty() {
                        return;
                    }
                    let written = producer.push_slice(&samples);
                    if written < samples.len() {
                        overflows += 1;
                        if overflows % 100 == 1 {
                            warn!("Ring buffer full, dropped audio ({} overflows)", overflows);
                        }
                    }
                },
                err_fn,
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;
        debug!("Microphone acquired");

        Ok(CaptureStream { stream, consumer })
    }

    /// Rate of the samples produced by [`CaptureStream::drain`].
    pub fn sample_rate(&self) -> u32 {
        self.target_rate
    }
}

/// A live capture session holding the input device open.
pub struct CaptureStream {
    stream: Stream,
    consumer: HeapCons<f32>,
}

impl CaptureStream {
    /// Pop captured samples into `buf`, returning how many were written.
    /// Non-blocking; returns 0 when nothing has arrived yet.
    pub fn drain(&mut self, buf: &mut [f32]) -> usize {
        let available = self.consumer.occupied_len().min(buf.len());
        if available == 0 {
            return 0;
        }
        self.consumer.pop_slice(&mut buf[..available])
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        let _ = self.stream.pause();
        debug!("Microphone released");
    }
}
