//! Error types for rule construction and traversal.
//!
//! Construction failures and traversal failures are deliberately distinct
//! types: a caller recovering from a malformed rule must not have to
//! pattern-match it apart from a search that exhausted its step budget.

use thiserror::Error;

/// Error raised while sanitizing or parsing a rule definition.
///
/// Raised synchronously at construction; a rule that constructs
/// successfully never raises this during traversal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// FREQ is required by RFC 5545 §3.3.10.
    #[error("Rule is missing a frequency")]
    MissingFrequency,

    /// INTERVAL must be a positive integer.
    #[error("Invalid interval: {0} (must be >= 1)")]
    InvalidInterval(u32),

    /// BYSETPOS entries must be non-zero.
    #[error("BYSETPOS must not contain 0")]
    ZeroBySetPos,

    /// The anchor (DTSTART) is missing or not a valid zoned timestamp.
    #[error("Invalid DTSTART: {0}")]
    InvalidDtstart(String),

    /// UNTIL could not be interpreted as a date or date-time.
    #[error("Invalid UNTIL: {0}")]
    InvalidUntil(String),

    /// The rule's timezone could not be resolved.
    #[error(transparent)]
    Zone(#[from] cadence_core::ZoneError),

    /// A textual rule block could not be tokenized.
    #[error("Malformed rule text at line {line}: {message}")]
    MalformedText {
        /// 1-based line within the unfolded block.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },
}

/// Error raised during occurrence generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// `all()` was called on a rule with no COUNT, no UNTIL, and no
    /// iterator callback; running it to completion would never terminate.
    #[error("Unbounded query: rule has no COUNT or UNTIL and no iterator was supplied")]
    UnboundedQuery,

    /// The internal step counter exceeded the configured cap. This is the
    /// backstop against constraint combinations with no reachable date.
    #[error("Iteration limit exceeded: {limit}")]
    IterationLimitExceeded {
        /// The configured `max_iterations` value.
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_limit_cites_configured_value() {
        let err = EvaluationError::IterationLimitExceeded { limit: 5 };
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn validation_and_evaluation_are_distinct_types() {
        fn assert_validation(_: &ValidationError) {}
        fn assert_evaluation(_: &EvaluationError) {}
        assert_validation(&ValidationError::MissingFrequency);
        assert_evaluation(&EvaluationError::UnboundedQuery);
    }
}
