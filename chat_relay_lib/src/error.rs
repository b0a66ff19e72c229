use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Missing 'message'")]
    InvalidRequest,

    #[error("Missing GEMINI_API_KEY environment variable")]
    MissingCredential,

    #[error("weather service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

impl RelayError {
    pub fn generation(err: impl std::fmt::Display) -> Self {
        RelayError::GenerationFailed(err.to_string())
    }

    pub fn upstream(err: impl std::fmt::Display) -> Self {
        RelayError::UpstreamUnavailable(err.to_string())
    }

    /// The message as a single line, safe to embed in one `data:` event.
    pub fn single_line(&self) -> String {
        self.to_string()
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_strips_newlines() {
        let err = RelayError::generation("quota exceeded\nretry later\r\n");
        assert_eq!(
            err.single_line(),
            "generation failed: quota exceeded retry later"
        );
    }

    #[test]
    fn test_missing_credential_names_the_key() {
        assert!(RelayError::MissingCredential
            .to_string()
            .contains("GEMINI_API_KEY"));
    }
}
