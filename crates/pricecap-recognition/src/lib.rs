//! Speech recognition collaborators for field capture.
//!
//! A [`Recognizer`] produces one transcript per call. [`recognize_with`]
//! bounds a call with a timeout and a cancellation token and folds every
//! result into a [`pricecap_core::RecognitionOutcome`].

use std::future::Future;

pub mod client;
pub mod error;
pub mod runner;
pub mod scripted;

pub use client::HttpRecognizer;
pub use error::RecognitionError;
pub use runner::recognize_with;
pub use scripted::{SamplePick, ScriptedRecognizer};

pub trait Recognizer: Send + Sync {
    /// Records and transcribes one utterance.
    fn recognize(&self) -> impl Future<Output = Result<String, RecognitionError>> + Send;
}

/// Recognizer chosen at start-up from configuration.
#[derive(Debug)]
pub enum AnyRecognizer {
    Scripted(ScriptedRecognizer),
    Http(HttpRecognizer),
}

impl Recognizer for AnyRecognizer {
    async fn recognize(&self) -> Result<String, RecognitionError> {
        match self {
            AnyRecognizer::Scripted(r) => r.recognize().await,
            AnyRecognizer::Http(r) => r.recognize().await,
        }
    }
}
