use std::num::IntErrorKind;

use log::debug;

use crate::profile::{AGE, GENDER, GOAL, HEIGHT, WEIGHT};
use crate::FieldMap;

/// Checked for presence, in this order, before any number is parsed.
pub const REQUIRED_FIELDS: [&str; 5] = [AGE, GOAL, GENDER, HEIGHT, WEIGHT];

// Exclusive bounds.
pub const AGE_LIMITS: (i64, i64) = (0, 120);
pub const WEIGHT_LIMITS: (f64, f64) = (20.0, 500.0);
pub const HEIGHT_LIMITS: (f64, f64) = (50.0, 300.0);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("Invalid input: {field} must be a number, got '{value}'")]
    NotANumber { field: &'static str, value: String },
    #[error("Invalid input: {field} must be greater than {min} and less than {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("Invalid input: {field} must be one of {choices}, got '{value}'")]
    UnknownChoice {
        field: &'static str,
        value: String,
        choices: String,
    },
}

impl ValidationError {
    /// The form field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing { field }
            | ValidationError::NotANumber { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::UnknownChoice { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Measurements {
    pub age: i64,
    pub weight_kg: f64,
    pub height_cm: f64,
}

/// Checks that the required fields are present and the numbers are in range.
/// The map is handed back untouched, numbers still as text.
pub fn validate_input(fields: FieldMap) -> Result<FieldMap, ValidationError> {
    let measurements = check_fields(&fields)?;
    debug!("Validated profile fields: {:?}", measurements);
    Ok(fields)
}

pub(crate) fn check_fields(fields: &FieldMap) -> Result<Measurements, ValidationError> {
    for field in REQUIRED_FIELDS {
        if fields.get(field).map_or(true, |v| v.trim().is_empty()) {
            return Err(ValidationError::Missing { field });
        }
    }
    let value = |field: &str| fields.get(field).map(String::as_str).unwrap_or_default();

    let age = parse_age(value(AGE))?;
    let weight_kg = parse_real(WEIGHT, value(WEIGHT), WEIGHT_LIMITS)?;
    let height_cm = parse_real(HEIGHT, value(HEIGHT), HEIGHT_LIMITS)?;
    Ok(Measurements {
        age,
        weight_kg,
        height_cm,
    })
}

fn parse_age(value: &str) -> Result<i64, ValidationError> {
    let (min, max) = AGE_LIMITS;
    let out_of_range = ValidationError::OutOfRange {
        field: AGE,
        min: min as f64,
        max: max as f64,
    };
    match value.trim().parse::<i64>() {
        Ok(age) if min < age && age < max => Ok(age),
        Ok(_) => Err(out_of_range),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Err(out_of_range)
        }
        Err(_) => Err(ValidationError::NotANumber {
            field: AGE,
            value: String::from(value),
        }),
    }
}

// NaN and infinities fail the range comparison.
fn parse_real(
    field: &'static str,
    value: &str,
    (min, max): (f64, f64),
) -> Result<f64, ValidationError> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NotANumber {
            field,
            value: String::from(value),
        })?;
    if min < parsed && parsed < max {
        Ok(parsed)
    } else {
        Err(ValidationError::OutOfRange { field, min, max })
    }
}
