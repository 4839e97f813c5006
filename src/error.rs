// Error taxonomy for the address history service
// Every store operation reports one of these; the HTTP layer maps them to statuses

use chrono::NaiveDate;
use thiserror::Error;

use crate::schema::FieldError;

/// Errors surfaced by the address history store.
///
/// `PersonNotFound` and `NoAddressOnFile` both map to 404 but carry distinct
/// messages. `InvalidTransition` is a state conflict (409), never a crash.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("person does not exist")]
    PersonNotFound,

    #[error("person does not have an address, please create one")]
    NoAddressOnFile,

    /// The submitted start date is not strictly after the latest segment's.
    /// The store rejects the write with no mutation.
    #[error("new start date {candidate} must be strictly after the most recent segment's start date {latest}")]
    InvalidTransition {
        candidate: NaiveDate,
        latest: NaiveDate,
    },

    /// Payload failed shape validation before the store was touched.
    #[error("address payload failed validation")]
    Validation(Vec<FieldError>),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl HistoryError {
    /// True for errors caused by caller input (no retry is appropriate).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, HistoryError::Db(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_carries_both_dates() {
        let err = HistoryError::InvalidTransition {
            candidate: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            latest: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        };

        let msg = err.to_string();
        assert!(msg.contains("2020-06-01"));
        assert!(msg.contains("2021-01-01"));
        assert!(msg.contains("strictly after"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(HistoryError::PersonNotFound.is_client_error());
        assert!(HistoryError::NoAddressOnFile.is_client_error());
        assert!(HistoryError::Validation(vec![]).is_client_error());
        assert!(!HistoryError::Db(rusqlite::Error::InvalidQuery).is_client_error());
    }
}
