//! Planner error types

use thiserror::Error;

use crate::planner::step::StepId;
use crate::sql::SqlError;

/// Planner error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Query text did not parse
    #[error("{0}")]
    Parse(SqlError),

    /// Construct with no translation, named by node kind
    #[error("Unsupported construct: {kind}")]
    UnsupportedConstruct { kind: String },

    /// A step references a step that is absent from its plan or not
    /// strictly earlier
    #[error("Unresolved reference to step {step}")]
    UnresolvedReference { step: StepId },

    /// Join predicate other than an equality (or AND-chain of equalities)
    #[error("Malformed join condition: {0}")]
    MalformedJoinCondition(String),

    /// Invalid plan structure
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

impl PlanError {
    pub fn unsupported(kind: impl Into<String>) -> Self {
        PlanError::UnsupportedConstruct { kind: kind.into() }
    }
}

impl From<SqlError> for PlanError {
    fn from(err: SqlError) -> Self {
        match err {
            SqlError::Unsupported(kind) => PlanError::UnsupportedConstruct { kind },
            parse @ SqlError::Parse(_) => PlanError::Parse(parse),
        }
    }
}

/// Result type for planner operations
pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_unsupported_maps_to_construct() {
        let err: PlanError = SqlError::Unsupported("Cast".to_string()).into();
        assert_eq!(err, PlanError::unsupported("Cast"));
        assert_eq!(err.to_string(), "Unsupported construct: Cast");
    }

    #[test]
    fn test_sql_parse_error_is_propagated() {
        let err: PlanError = SqlError::Parse("Expected SELECT".to_string()).into();
        assert!(matches!(err, PlanError::Parse(SqlError::Parse(_))));
        assert_eq!(err.to_string(), "Parse error: Expected SELECT");
    }
}
