use serde::Serialize;

/// What a speech recognition attempt produced.
///
/// Only `Text` feeds the parser; the other variants leave the draft as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RecognitionOutcome {
    Text(String),
    Cancelled,
    Failed(String),
}

impl RecognitionOutcome {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            RecognitionOutcome::Text(text) => Some(text),
            RecognitionOutcome::Cancelled | RecognitionOutcome::Failed(_) => None,
        }
    }
}
