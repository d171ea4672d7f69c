use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("line {line}: cannot triage line: {text}")]
    UnsupportedConstruct { line: usize, text: String },
    #[error("line {line}: invalid constant segment: {dump}")]
    MalformedAggregate { line: usize, dump: String },
    #[error("line {line}: {feature} cannot be translated")]
    UnsupportedFeature { line: usize, feature: String },
    #[error("line {line}: internal invariant violated: {message}")]
    InternalInvariantViolation { line: usize, message: String },
}

impl FrontendError {
    pub fn line(&self) -> usize {
        match self {
            FrontendError::UnsupportedConstruct { line, .. }
            | FrontendError::MalformedAggregate { line, .. }
            | FrontendError::UnsupportedFeature { line, .. }
            | FrontendError::InternalInvariantViolation { line, .. } => *line,
        }
    }

    pub fn invariant(line: usize, message: impl Into<String>) -> Self {
        FrontendError::InternalInvariantViolation {
            line,
            message: message.into(),
        }
    }

    /// Invariant failure with the token structure appended to the message.
    pub fn invariant_at(line: usize, message: &str, tokens: &[Token]) -> Self {
        FrontendError::InternalInvariantViolation {
            line,
            message: format!("{}: {}", message, dump(tokens)),
        }
    }

    pub fn malformed(line: usize, tokens: &[Token]) -> Self {
        FrontendError::MalformedAggregate {
            line,
            dump: dump(tokens),
        }
    }
}

pub fn dump(tokens: &[Token]) -> String {
    serde_json::to_string(tokens).unwrap_or_else(|_| format!("{:?}", tokens))
}

pub type Result<T> = std::result::Result<T, FrontendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_accessor() {
        let err = FrontendError::UnsupportedFeature {
            line: 7,
            feature: "inline assembly".to_string(),
        };
        assert_eq!(err.line(), 7);
        assert_eq!(err.to_string(), "line 7: inline assembly cannot be translated");
    }

    #[test]
    fn test_malformed_dumps_tokens() {
        let err = FrontendError::malformed(3, &[Token::atom("i32"), Token::atom("foo")]);
        match err {
            FrontendError::MalformedAggregate { line, dump } => {
                assert_eq!(line, 3);
                assert!(dump.contains("\"i32\""));
                assert!(dump.contains("\"foo\""));
            }
            _ => panic!("expected malformed aggregate"),
        }
    }
}
