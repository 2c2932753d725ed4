use thiserror::Error;

/// Top-level error type for a chatloom session.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("template references unbound variable: ${name}")]
    UnboundVariable { name: String },

    #[error("completion backend error ({provider}): {message}")]
    Backend { provider: String, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_variable_names_the_variable() {
        let err = ChatError::UnboundVariable {
            name: "missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "template references unbound variable: $missing"
        );
    }
}
