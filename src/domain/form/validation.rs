//! Field rules for the contact form
//!
//! Each field has its own validator returning either the accepted value or
//! the first rule it breaks. Rules are checked in order: presence, type,
//! lower bound, upper bound.

use std::collections::BTreeMap;

use serde_json::Number;

use super::{Field, FormValues};

/// Inclusive character-count bounds for a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRule {
    pub min: usize,
    pub max: usize,
}

pub const NAME_RULE: LengthRule = LengthRule { min: 2, max: 50 };
pub const ADDRESS_RULE: LengthRule = LengthRule { min: 20, max: 200 };
pub const AGE_MIN: f64 = 1.0;
pub const AGE_MAX: f64 = 150.0;

/// A single broken rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Required")]
    Required,
    #[error("Must be a number")]
    NotANumber,
    #[error("{}", too_short_message(.0))]
    TooShort(Field),
    #[error("{}", too_long_message(.0))]
    TooLong(Field),
}

fn too_short_message(field: &Field) -> &'static str {
    match field {
        Field::Address => "Too Short for an address",
        Field::Name | Field::Age => "Too Short!",
    }
}

fn too_long_message(field: &Field) -> &'static str {
    match field {
        Field::Address => "Too long",
        Field::Name | Field::Age => "Too Long!",
    }
}

/// Errors for every field that currently fails its rules
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationErrors(BTreeMap<Field, FieldError>);

impl ValidationErrors {
    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.0.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    fn record<T>(&mut self, field: Field, result: Result<T, FieldError>) {
        if let Err(err) = result {
            self.0.insert(field, err);
        }
    }
}

pub fn validate_name(value: &str) -> Result<&str, FieldError> {
    check_length(Field::Name, value, NAME_RULE)
}

pub fn validate_address(value: &str) -> Result<&str, FieldError> {
    check_length(Field::Address, value, ADDRESS_RULE)
}

/// Parse and range-check the age, returning it as a JSON number
///
/// Whole numbers come back as integers so `30` serializes as `30`, not `30.0`.
pub fn validate_age(value: &str) -> Result<Number, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required);
    }
    let age: f64 = trimmed.parse().map_err(|_| FieldError::NotANumber)?;
    if !age.is_finite() {
        return Err(FieldError::NotANumber);
    }
    if age < AGE_MIN {
        return Err(FieldError::TooShort(Field::Age));
    }
    if age > AGE_MAX {
        return Err(FieldError::TooLong(Field::Age));
    }
    if age.fract() == 0.0 {
        Ok(Number::from(age as i64))
    } else {
        Number::from_f64(age).ok_or(FieldError::NotANumber)
    }
}

/// Run every field rule against the current values
pub fn validate(values: &FormValues) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    errors.record(Field::Name, validate_name(&values.name));
    errors.record(Field::Age, validate_age(&values.age));
    errors.record(Field::Address, validate_address(&values.address));
    errors
}

fn check_length(field: Field, value: &str, rule: LengthRule) -> Result<&str, FieldError> {
    if value.is_empty() {
        return Err(FieldError::Required);
    }
    let len = value.chars().count();
    if len < rule.min {
        Err(FieldError::TooShort(field))
    } else if len > rule.max {
        Err(FieldError::TooLong(field))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert_eq!(validate_name(""), Err(FieldError::Required));
        assert_eq!(validate_name("A"), Err(FieldError::TooShort(Field::Name)));
        assert_eq!(validate_name("Al"), Ok("Al"));
        assert!(validate_name(&"x".repeat(50)).is_ok());
        assert_eq!(
            validate_name(&"x".repeat(51)),
            Err(FieldError::TooLong(Field::Name))
        );
    }

    #[test]
    fn test_name_counts_characters_not_bytes() {
        // two chars, four bytes
        assert!(validate_name("éé").is_ok());
        assert!(validate_name(&"é".repeat(50)).is_ok());
    }

    #[test]
    fn test_age_bounds() {
        assert_eq!(validate_age(""), Err(FieldError::Required));
        assert_eq!(validate_age("   "), Err(FieldError::Required));
        assert_eq!(validate_age("0"), Err(FieldError::TooShort(Field::Age)));
        assert_eq!(validate_age("-4"), Err(FieldError::TooShort(Field::Age)));
        assert_eq!(validate_age("151"), Err(FieldError::TooLong(Field::Age)));
        assert_eq!(validate_age("1"), Ok(Number::from(1)));
        assert_eq!(validate_age("150"), Ok(Number::from(150)));
        assert_eq!(validate_age(" 30 "), Ok(Number::from(30)));
    }

    #[test]
    fn test_age_rejects_non_numbers() {
        for input in ["abc", "30y", "NaN", "inf", "-inf", "1,5"] {
            assert_eq!(validate_age(input), Err(FieldError::NotANumber), "{input}");
        }
    }

    #[test]
    fn test_age_keeps_fractions() {
        let age = validate_age("30.5").unwrap();
        assert_eq!(age.as_f64(), Some(30.5));
        assert_eq!(validate_age("0.5"), Err(FieldError::TooShort(Field::Age)));
        assert_eq!(validate_age("150.1"), Err(FieldError::TooLong(Field::Age)));
    }

    #[test]
    fn test_address_bounds() {
        assert_eq!(validate_address(""), Err(FieldError::Required));
        assert_eq!(
            validate_address(&"a".repeat(19)),
            Err(FieldError::TooShort(Field::Address))
        );
        assert!(validate_address(&"a".repeat(20)).is_ok());
        assert!(validate_address(&"a".repeat(200)).is_ok());
        assert_eq!(
            validate_address(&"a".repeat(201)),
            Err(FieldError::TooLong(Field::Address))
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(FieldError::Required.to_string(), "Required");
        assert_eq!(FieldError::TooShort(Field::Name).to_string(), "Too Short!");
        assert_eq!(FieldError::TooLong(Field::Age).to_string(), "Too Long!");
        assert_eq!(
            FieldError::TooShort(Field::Address).to_string(),
            "Too Short for an address"
        );
        assert_eq!(FieldError::TooLong(Field::Address).to_string(), "Too long");
    }

    #[test]
    fn test_validate_collects_every_field() {
        let errors = validate(&FormValues::default());
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec![Field::Name, Field::Age, Field::Address]
        );

        let values = FormValues {
            name: "Alice Smith".into(),
            age: "30".into(),
            address: "1 Infinite Loop, Cupertino".into(),
        };
        assert!(validate(&values).is_empty());
    }
}
