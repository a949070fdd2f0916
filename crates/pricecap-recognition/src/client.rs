use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::RecognitionError;
use crate::Recognizer;

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    text: String,
}

/// Speech recognizer backed by an HTTP service.
///
/// Sends `POST {base_url}/recognize` and expects `{"text": "..."}` back.
/// Audio capture happens on the service side; this client only triggers a
/// recognition and collects the transcript.
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    client: Client,
    endpoint: String,
}

impl HttpRecognizer {
    /// Creates a recognizer with a per-request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// - [`RecognitionError::InvalidUrl`] if `base_url` is not an absolute
    ///   http(s) URL.
    /// - [`RecognitionError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, RecognitionError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| RecognitionError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RecognitionError::InvalidUrl {
                url: base_url.to_owned(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/recognize", base_url.trim_end_matches('/')),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Recognizer for HttpRecognizer {
    async fn recognize(&self) -> Result<String, RecognitionError> {
        let response = self.client.post(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecognitionError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body = response.text().await?;
        let parsed: RecognizeResponse =
            serde_json::from_str(&body).map_err(|e| RecognitionError::Deserialize {
                context: format!("POST {}", self.endpoint),
                source: e,
            })?;

        let text = parsed.text.trim();
        if text.is_empty() {
            return Err(RecognitionError::NoSpeech);
        }

        tracing::debug!(endpoint = %self.endpoint, chars = text.chars().count(), "transcript received");
        Ok(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let recognizer = HttpRecognizer::new("http://localhost:9000/", 5, "test").unwrap();
        assert_eq!(recognizer.endpoint(), "http://localhost:9000/recognize");
    }

    #[test]
    fn rejects_relative_url() {
        assert!(matches!(
            HttpRecognizer::new("localhost", 5, "test"),
            Err(RecognitionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(matches!(
            HttpRecognizer::new("ftp://asr.example.com", 5, "test"),
            Err(RecognitionError::InvalidUrl { .. })
        ));
    }
}
