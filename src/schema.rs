// Payload shape validation for submitted addresses
// Runs before the store is invoked; length limits match the persisted columns

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// FIELD LIMITS
// ============================================================================

pub const MAX_STREET_LEN: usize = 128;
pub const MAX_CITY_LEN: usize = 128;
pub const MAX_STATE_LEN: usize = 2;
pub const MAX_ZIP_LEN: usize = 10;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

pub type ValidationResult = Result<(), Vec<FieldError>>;

// ============================================================================
// ADDRESS PAYLOAD
// ============================================================================

/// Wire shape of a submitted address.
///
/// `end_date` is server-managed: it is still deserialized so a caller
/// supplying it gets a validation error instead of silent field drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressPayload {
    pub street_one: String,
    #[serde(default)]
    pub street_two: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl AddressPayload {
    /// Validate required-ness and length limits. Collects every failure
    /// rather than stopping at the first.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        check_required(&mut errors, "street_one", &self.street_one, MAX_STREET_LEN);
        check_required(&mut errors, "city", &self.city, MAX_CITY_LEN);
        check_required(&mut errors, "state", &self.state, MAX_STATE_LEN);
        check_required(&mut errors, "zip_code", &self.zip_code, MAX_ZIP_LEN);

        if let Some(street_two) = &self.street_two {
            if street_two.chars().count() > MAX_STREET_LEN {
                errors.push(FieldError {
                    field: "street_two".to_string(),
                    message: format!("Must be at most {} characters", MAX_STREET_LEN),
                });
            }
        }

        if self.end_date.is_some() {
            errors.push(FieldError {
                field: "end_date".to_string(),
                message: "Must not be supplied; end dates are managed by the server".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_required(errors: &mut Vec<FieldError>, field: &str, value: &str, max_len: usize) {
    if value.is_empty() {
        errors.push(FieldError {
            field: field.to_string(),
            message: "Required field is empty".to_string(),
        });
    } else if value.chars().count() > max_len {
        errors.push(FieldError {
            field: field.to_string(),
            message: format!("Must be at most {} characters", max_len),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> AddressPayload {
        AddressPayload {
            street_one: "123 Main Street".to_string(),
            street_two: None,
            city: "Providence".to_string(),
            state: "RI".to_string(),
            zip_code: "02903".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: None,
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(valid_payload().validate().is_ok());
    }

    #[test]
    fn test_empty_required_fields_rejected() {
        let mut payload = valid_payload();
        payload.street_one = String::new();
        payload.city = String::new();

        let errors = payload.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["street_one", "city"]);
    }

    #[test]
    fn test_length_limits_enforced() {
        let mut payload = valid_payload();
        payload.state = "RHODE ISLAND".to_string();
        payload.zip_code = "02903-1234-567".to_string();

        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("at most 2"));
        assert!(errors[1].message.contains("at most 10"));
    }

    #[test]
    fn test_street_two_is_optional_but_bounded() {
        let mut payload = valid_payload();
        payload.street_two = Some("Apt 4B".to_string());
        assert!(payload.validate().is_ok());

        payload.street_two = Some("x".repeat(MAX_STREET_LEN + 1));
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors[0].field, "street_two");
    }

    #[test]
    fn test_caller_supplied_end_date_rejected() {
        let mut payload = valid_payload();
        payload.end_date = NaiveDate::from_ymd_opt(2022, 1, 1);

        let errors = payload.validate().unwrap_err();
        assert_eq!(errors[0].field, "end_date");
        assert!(errors[0].message.contains("managed by the server"));
    }

    #[test]
    fn test_payload_deserializes_wire_dates() {
        let json = r#"{
            "street_one": "1 Elm St",
            "city": "Boston",
            "state": "MA",
            "zip_code": "02110",
            "start_date": "2021-01-01"
        }"#;

        let payload: AddressPayload = serde_json::from_str(json).unwrap();
        assert_eq!(
            payload.start_date,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );
        assert!(payload.street_two.is_none());
        assert!(payload.end_date.is_none());
    }
}
