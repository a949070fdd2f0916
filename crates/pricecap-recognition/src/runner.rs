//! Runs a recognizer under a timeout and a cancellation token.

use std::time::Duration;

use pricecap_core::RecognitionOutcome;
use tokio_util::sync::CancellationToken;

use crate::Recognizer;

/// Runs one recognition attempt.
///
/// Cancellation wins over a result that arrives at the same time. A timeout,
/// a recognizer error or a blank transcript all become
/// [`RecognitionOutcome::Failed`]; none of them are propagated as errors.
pub async fn recognize_with<R: Recognizer>(
    recognizer: &R,
    timeout: Duration,
    cancel: &CancellationToken,
) -> RecognitionOutcome {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::info!("recognition cancelled");
            RecognitionOutcome::Cancelled
        }
        result = tokio::time::timeout(timeout, recognizer.recognize()) => match result {
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis(), "recognition timed out");
                RecognitionOutcome::Failed(format!(
                    "recognition timed out after {}ms",
                    timeout.as_millis()
                ))
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "recognition failed");
                RecognitionOutcome::Failed(e.to_string())
            }
            Ok(Ok(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    RecognitionOutcome::Failed("no speech recognized".to_owned())
                } else {
                    RecognitionOutcome::Text(text.to_owned())
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;

    struct Fixed {
        delay: Duration,
        result: fn() -> Result<String, RecognitionError>,
    }

    impl Recognizer for Fixed {
        async fn recognize(&self) -> Result<String, RecognitionError> {
            tokio::time::sleep(self.delay).await;
            (self.result)()
        }
    }

    fn ok_text() -> Result<String, RecognitionError> {
        Ok("  喜旺手掰肉老火腿340g — 19.90 ".to_owned())
    }

    fn blank() -> Result<String, RecognitionError> {
        Ok("   ".to_owned())
    }

    fn no_speech() -> Result<String, RecognitionError> {
        Err(RecognitionError::NoSpeech)
    }

    #[tokio::test]
    async fn returns_trimmed_text() {
        let recognizer = Fixed {
            delay: Duration::ZERO,
            result: ok_text,
        };
        let outcome =
            recognize_with(&recognizer, Duration::from_secs(1), &CancellationToken::new()).await;
        assert_eq!(
            outcome,
            RecognitionOutcome::Text("喜旺手掰肉老火腿340g — 19.90".to_owned())
        );
    }

    #[tokio::test]
    async fn timeout_becomes_failure() {
        let recognizer = Fixed {
            delay: Duration::from_secs(30),
            result: ok_text,
        };
        let outcome =
            recognize_with(&recognizer, Duration::from_millis(20), &CancellationToken::new())
                .await;
        assert!(
            matches!(outcome, RecognitionOutcome::Failed(ref msg) if msg.contains("timed out")),
            "got {outcome:?}"
        );
    }

    #[tokio::test]
    async fn recognizer_error_becomes_failure() {
        let recognizer = Fixed {
            delay: Duration::ZERO,
            result: no_speech,
        };
        let outcome =
            recognize_with(&recognizer, Duration::from_secs(1), &CancellationToken::new()).await;
        assert_eq!(
            outcome,
            RecognitionOutcome::Failed("no speech recognized".to_owned())
        );
    }

    #[tokio::test]
    async fn blank_transcript_becomes_failure() {
        let recognizer = Fixed {
            delay: Duration::ZERO,
            result: blank,
        };
        let outcome =
            recognize_with(&recognizer, Duration::from_secs(1), &CancellationToken::new()).await;
        assert!(matches!(outcome, RecognitionOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn pre_cancelled_token_wins() {
        let recognizer = Fixed {
            delay: Duration::ZERO,
            result: ok_text,
        };
        let token = CancellationToken::new();
        token.cancel();
        let outcome = recognize_with(&recognizer, Duration::from_secs(1), &token).await;
        assert_eq!(outcome, RecognitionOutcome::Cancelled);
    }

    #[tokio::test]
    async fn cancel_interrupts_in_flight_recognition() {
        let recognizer = Fixed {
            delay: Duration::from_secs(30),
            result: ok_text,
        };
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = recognize_with(&recognizer, Duration::from_secs(60), &token).await;
        assert_eq!(outcome, RecognitionOutcome::Cancelled);
    }
}
