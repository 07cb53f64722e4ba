//! Microphone capture, speaker playback, and the resampling between
//! device rates and the rates the speech engines expect.

mod capture;
mod playback;
pub mod resampler;
pub mod util;

pub use capture::{CaptureStream, Microphone};
pub use playback::Player;
