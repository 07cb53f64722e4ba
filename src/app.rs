//! The hot-microphone session loop.
//!
//! Drives the capture/transcribe/respond cycle as an explicit state
//! machine. The loop is strictly sequential: one utterance is captured,
//! transcribed, and reported before the next capture begins. Shutdown is
//! observed at the top of each iteration.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tracing::debug;

use crate::stt::{Transcription, Utterance};

/// Lifecycle of one hotmic session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Listening,
    Stopped,
}

/// Yields one utterance per call, blocking until the capture primitive
/// closes a voiced segment or `cancel` is raised mid-capture.
pub trait UtteranceSource {
    fn next_utterance(&mut self, cancel: &AtomicBool) -> Result<Option<Utterance>>;
}

/// Converts one utterance into a transcription outcome.
pub trait SpeechToText {
    fn transcribe(&mut self, utterance: Utterance) -> Transcription;
}

/// The program's sole output channel: prints a message and optionally
/// speaks it aloud.
pub trait Notify {
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// Run the session loop until `shutdown` is raised.
///
/// Unintelligible audio and engine errors are reported and the loop
/// continues; only infrastructure failures (microphone session, output
/// channel) propagate out.
pub fn run(source: &mut dyn UtteranceSource, stt: &mut dyn SpeechToText, notifier: &mut dyn Notify, shutdown: &AtomicBool) -> Result<()> {
    let mut state = RunState::Starting;

    loop {
        match state {
            RunState::Starting => {
                notifier.notify("Hotmic ready. Press Ctrl+C to stop.")?;
                state = RunState::Listening;
            }
            RunState::Listening => {
                if shutdown.load(Ordering::Relaxed) {
                    state = RunState::Stopped;
                    continue;
                }
                listen_once(source, stt, notifier, shutdown)?;
            }
            RunState::Stopped => {
                notifier.notify("Stopping.")?;
                return Ok(());
            }
        }
    }
}

/// One iteration: capture an utterance, transcribe it, report the outcome.
///
/// The microphone is held open only inside `next_utterance`, so it is
/// released before the outcome notification regardless of how
/// transcription went.
fn listen_once(source: &mut dyn UtteranceSource, stt: &mut dyn SpeechToText, notifier: &mut dyn Notify, shutdown: &AtomicBool) -> Result<()> {
    // Announced before the capture session opens, so a spoken prompt is
    // not picked up by the microphone.
    notifier.notify("Listening...")?;

    let Some(utterance) = source.next_utterance(shutdown)? else {
        // Cancelled mid-capture; the loop top observes the flag and stops.
        debug!("Capture cancelled, discarding partial audio");
        return Ok(());
    };

    match stt.transcribe(utterance) {
        Transcription::Text(text) => notifier.notify(&format!("You said: {}", text))?,
        Transcription::Unintelligible => notifier.notify("Could not understand audio.")?,
        Transcription::EngineError(detail) => notifier.notify(&format!("STT error: {}", detail))?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    fn utterance() -> Utterance {
        Utterance { samples: vec![0.1; 1600], sample_rate: 16000 }
    }

    /// Scripted source: yields its utterances in order, then raises the
    /// cancel flag as if the user interrupted the following capture.
    struct FakeSource {
        script: VecDeque<Utterance>,
        captures: usize,
    }

    impl FakeSource {
        fn with_utterances(count: usize) -> Self {
            Self { script: (0..count).map(|_| utterance()).collect(), captures: 0 }
        }
    }

    impl UtteranceSource for FakeSource {
        fn next_utterance(&mut self, cancel: &AtomicBool) -> Result<Option<Utterance>> {
            self.captures += 1;
            match self.script.pop_front() {
                Some(u) => Ok(Some(u)),
                None => {
                    cancel.store(true, Ordering::SeqCst);
                    Ok(None)
                }
            }
        }
    }

    struct FakeStt {
        outcomes: VecDeque<Transcription>,
        calls: usize,
    }

    impl FakeStt {
        fn with_outcomes(outcomes: Vec<Transcription>) -> Self {
            Self { outcomes: outcomes.into(), calls: 0 }
        }
    }

    impl SpeechToText for FakeStt {
        fn transcribe(&mut self, _utterance: Utterance) -> Transcription {
            self.calls += 1;
            self.outcomes.pop_front().unwrap_or(Transcription::Unintelligible)
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        messages: Vec<String>,
    }

    impl Notify for FakeNotifier {
        fn notify(&mut self, message: &str) -> Result<()> {
            self.messages.push(message.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notify for FailingNotifier {
        fn notify(&mut self, _message: &str) -> Result<()> {
            anyhow::bail!("speaker offline")
        }
    }

    #[test]
    fn test_transcript_uses_fixed_template() {
        let mut source = FakeSource::with_utterances(1);
        let mut stt = FakeStt::with_outcomes(vec![Transcription::Text("turn left".to_string())]);
        let mut notifier = FakeNotifier::default();
        let shutdown = AtomicBool::new(false);

        run(&mut source, &mut stt, &mut notifier, &shutdown).unwrap();

        assert_eq!(
            notifier.messages,
            vec![
                "Hotmic ready. Press Ctrl+C to stop.",
                "Listening...",
                "You said: turn left",
                "Listening...",
                "Stopping.",
            ]
        );
    }

    #[test]
    fn test_recoverable_errors_do_not_stop_the_loop() {
        // Three bad outcomes in a row must still be followed by a fourth
        // capture attempt.
        let mut source = FakeSource::with_utterances(3);
        let mut stt = FakeStt::with_outcomes(vec![
            Transcription::Unintelligible,
            Transcription::EngineError("engine offline".to_string()),
            Transcription::Unintelligible,
        ]);
        let mut notifier = FakeNotifier::default();
        let shutdown = AtomicBool::new(false);

        run(&mut source, &mut stt, &mut notifier, &shutdown).unwrap();

        assert_eq!(source.captures, 4);
        assert_eq!(notifier.messages.iter().filter(|m| *m == "Could not understand audio.").count(), 2);
        assert!(notifier.messages.contains(&"STT error: engine offline".to_string()));
        assert_eq!(notifier.messages.last().unwrap(), "Stopping.");
    }

    #[test]
    fn test_preset_shutdown_skips_capture() {
        let mut source = FakeSource::with_utterances(1);
        let mut stt = FakeStt::with_outcomes(vec![]);
        let mut notifier = FakeNotifier::default();
        let shutdown = AtomicBool::new(true);

        run(&mut source, &mut stt, &mut notifier, &shutdown).unwrap();

        assert_eq!(source.captures, 0);
        assert_eq!(notifier.messages, vec!["Hotmic ready. Press Ctrl+C to stop.", "Stopping."]);
    }

    #[test]
    fn test_cancelled_capture_skips_transcription() {
        let mut source = FakeSource::with_utterances(0);
        let mut stt = FakeStt::with_outcomes(vec![]);
        let mut notifier = FakeNotifier::default();
        let shutdown = AtomicBool::new(false);

        run(&mut source, &mut stt, &mut notifier, &shutdown).unwrap();

        assert_eq!(stt.calls, 0);
        assert_eq!(notifier.messages, vec!["Hotmic ready. Press Ctrl+C to stop.", "Listening...", "Stopping."]);
        assert_eq!(notifier.messages.iter().filter(|m| *m == "Stopping.").count(), 1);
    }

    #[test]
    fn test_notify_failure_is_fatal() {
        let mut source = FakeSource::with_utterances(1);
        let mut stt = FakeStt::with_outcomes(vec![]);
        let mut notifier = FailingNotifier;
        let shutdown = AtomicBool::new(false);

        let err = run(&mut source, &mut stt, &mut notifier, &shutdown).unwrap_err();
        assert!(err.to_string().contains("speaker offline"));
    }
}
