use thiserror::Error;

use crate::db::DatabaseError;

/// How many offending items a precondition failure names before truncating.
/// Keeps error payloads bounded when an encounter has dozens of open lines.
pub const MAX_LISTED_ITEMS: usize = 5;

/// Errors surfaced by the lifecycle and aggregation services. These map to
/// HTTP statuses at the API boundary.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Cannot {action}: current state is {current}")]
    InvalidState { action: &'static str, current: String },

    #[error("{rule}")]
    PreconditionFailed { rule: String, offending: Vec<String> },

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

impl ServiceError {
    pub fn not_found(entity_type: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(action: &'static str, current: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            action,
            current: current.to_string(),
        }
    }

    /// Build a precondition failure, truncating the offending list to
    /// [`MAX_LISTED_ITEMS`] with a trailing "... and N more" marker.
    pub fn precondition(rule: impl Into<String>, offending: Vec<String>) -> Self {
        let mut offending = offending;
        if offending.len() > MAX_LISTED_ITEMS {
            let extra = offending.len() - MAX_LISTED_ITEMS;
            offending.truncate(MAX_LISTED_ITEMS);
            offending.push(format!("... and {extra} more"));
        }
        Self::PreconditionFailed {
            rule: rule.into(),
            offending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_keeps_short_lists_verbatim() {
        let err = ServiceError::precondition("unpaid bills", vec!["BILL-000001".into()]);
        match err {
            ServiceError::PreconditionFailed { offending, .. } => {
                assert_eq!(offending, vec!["BILL-000001".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn precondition_truncates_long_lists() {
        let items: Vec<String> = (0..8).map(|i| format!("item-{i}")).collect();
        let err = ServiceError::precondition("incomplete investigations", items);
        match err {
            ServiceError::PreconditionFailed { offending, .. } => {
                assert_eq!(offending.len(), MAX_LISTED_ITEMS + 1);
                assert_eq!(offending.last().unwrap(), "... and 3 more");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn database_errors_convert() {
        let err: ServiceError = DatabaseError::not_found("Encounter", "abc").into();
        assert!(matches!(err, ServiceError::Database(_)));
    }
}
