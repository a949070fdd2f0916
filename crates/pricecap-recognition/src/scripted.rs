use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;

use crate::error::RecognitionError;
use crate::Recognizer;

/// How [`ScriptedRecognizer`] chooses the next sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePick {
    Random,
    /// Cycle through the samples in order.
    RoundRobin,
}

/// Stand-in recognizer that waits a fixed delay and returns a canned
/// sentence. Used when no speech service is configured.
#[derive(Debug)]
pub struct ScriptedRecognizer {
    samples: Vec<String>,
    delay: Duration,
    pick: SamplePick,
    cursor: AtomicUsize,
}

impl ScriptedRecognizer {
    #[must_use]
    pub fn new(samples: Vec<String>, delay: Duration, pick: SamplePick) -> Self {
        Self {
            samples,
            delay,
            pick,
            cursor: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    fn next_index(&self) -> usize {
        let len = self.samples.len();
        match self.pick {
            SamplePick::Random => rand::rng().random_range(0..len),
            SamplePick::RoundRobin => self.cursor.fetch_add(1, Ordering::Relaxed) % len,
        }
    }
}

impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self) -> Result<String, RecognitionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.samples.is_empty() {
            return Err(RecognitionError::NoSpeech);
        }

        let sample = self.samples[self.next_index()].clone();
        tracing::debug!(sample = %sample, "scripted recognizer replayed sample");
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<String> {
        vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]
    }

    #[tokio::test]
    async fn round_robin_cycles_through_samples() {
        let recognizer = ScriptedRecognizer::new(samples(), Duration::ZERO, SamplePick::RoundRobin);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(recognizer.recognize().await.unwrap());
        }
        assert_eq!(seen, vec!["a", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn random_pick_returns_a_known_sample() {
        let recognizer = ScriptedRecognizer::new(samples(), Duration::ZERO, SamplePick::Random);
        let text = recognizer.recognize().await.unwrap();
        assert!(samples().contains(&text));
    }

    #[tokio::test]
    async fn empty_sample_list_yields_no_speech() {
        let recognizer = ScriptedRecognizer::new(Vec::new(), Duration::ZERO, SamplePick::Random);
        assert!(matches!(
            recognizer.recognize().await,
            Err(RecognitionError::NoSpeech)
        ));
    }
}
