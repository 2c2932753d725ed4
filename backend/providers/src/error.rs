//! Typed failures from the HTTP backends, classified for retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The service answered with a non-2xx status.
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response.
    #[error("{provider} HTTP request failed")]
    Transport {
        provider: String,
        transient: bool,
        #[source]
        source: reqwest::Error,
    },
}

impl ProviderError {
    pub(crate) fn transport(provider: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            transient: source.is_connect() || source.is_timeout(),
            source,
        }
    }

    /// Rate limits, server errors, connect failures and timeouts.
    ///
    /// Auth failures and rejected requests (including an oversized prompt)
    /// fail the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            ProviderError::Transport { transient, .. } => *transient,
        }
    }
}

/// Whether a backend error is worth another attempt.
///
/// Errors that carry no [`ProviderError`] (malformed responses, scripted mock
/// failures) are treated as permanent.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ProviderError>()
            .is_some_and(ProviderError::is_transient)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn status(status: u16) -> ProviderError {
        ProviderError::Status {
            provider: "OpenAI".into(),
            status,
            body: String::new(),
        }
    }

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        for code in [408, 429, 500, 502, 503, 504] {
            assert!(status(code).is_transient(), "{code} should be retried");
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for code in [400, 401, 403, 404, 422] {
            assert!(!status(code).is_transient(), "{code} should not be retried");
        }
    }

    #[test]
    fn classification_survives_added_context() {
        let err = anyhow::Error::new(status(503)).context("turn 3");
        assert!(is_transient(&err));

        let err: anyhow::Result<()> = Err(status(401)).context("turn 3");
        assert!(!is_transient(&err.unwrap_err()));
    }

    #[test]
    fn untyped_errors_are_permanent() {
        assert!(!is_transient(&anyhow::anyhow!("OpenAI response contained no choices")));
    }

    #[test]
    fn status_message_includes_code_and_body() {
        let err = ProviderError::Status {
            provider: "Azure OpenAI".into(),
            status: 400,
            body: "context_length_exceeded".into(),
        };
        assert_eq!(err.to_string(), "Azure OpenAI returned 400: context_length_exceeded");
    }
}
