//! Spoken notifications, synthesized with Kokoro.

mod synthesizer;

pub use synthesizer::{Synthesizer, split_sentences};
