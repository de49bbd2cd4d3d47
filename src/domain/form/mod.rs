//! Contact form state
//!
//! Holds the three field values, which fields have been touched, and the
//! current validation result. Validation runs synchronously after every
//! change; `visible_error()` hides errors for fields the user has not left
//! yet.

mod validation;

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

pub use validation::{validate, validate_age, FieldError, ValidationErrors};

/// Form fields in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Age,
    Address,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Age, Field::Address];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Full Name",
            Field::Age => "Age",
            Field::Address => "Address",
        }
    }
}

/// Raw field values as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub name: String,
    pub age: String,
    pub address: String,
}

impl FormValues {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Age => &self.age,
            Field::Address => &self.address,
        }
    }

    fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Name => &mut self.name,
            Field::Age => &mut self.age,
            Field::Address => &mut self.address,
        }
    }
}

/// Values as emitted on a successful submit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedValues {
    pub name: String,
    pub age: serde_json::Number,
    pub address: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("failed to encode submission: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A successful submit: the typed values and their pretty-printed JSON
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub values: SubmittedValues,
    pub json: String,
}

#[derive(Debug, Clone)]
pub struct FormState {
    values: FormValues,
    touched: BTreeSet<Field>,
    errors: ValidationErrors,
    submit_count: u32,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormState {
    pub fn new() -> Self {
        let values = FormValues::default();
        let errors = validate(&values);
        Self {
            values,
            touched: BTreeSet::new(),
            errors,
            submit_count: 0,
        }
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(field)
    }

    #[cfg(test)]
    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        *self.values.get_mut(field) = value.into();
        self.revalidate();
    }

    pub fn push_char(&mut self, field: Field, c: char) {
        self.values.get_mut(field).push(c);
        self.revalidate();
    }

    pub fn pop_char(&mut self, field: Field) {
        self.values.get_mut(field).pop();
        self.revalidate();
    }

    /// The user left `field`; its error becomes visible from now on
    pub fn blur(&mut self, field: Field) {
        self.touched.insert(field);
        self.revalidate();
    }

    pub fn is_touched(&self, field: Field) -> bool {
        self.touched.contains(&field)
    }

    /// Error to show under the field, if it has been touched
    pub fn visible_error(&self, field: Field) -> Option<&FieldError> {
        if self.is_touched(field) {
            self.errors.get(field)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    /// Attempt a submit
    ///
    /// Every field is marked touched so all outstanding errors show up. On
    /// success the values are serialized and logged; nothing is emitted when
    /// any field is invalid.
    pub fn submit(&mut self) -> Result<Submission, SubmitError> {
        self.submit_count += 1;
        self.touched.extend(Field::ALL);
        self.revalidate();
        if !self.errors.is_empty() {
            return Err(self.errors.clone().into());
        }

        let values = self.submitted_values()?;
        let json = serde_json::to_string_pretty(&values)?;
        info!(target: "greetform::form", "{json}");
        Ok(Submission { values, json })
    }

    fn submitted_values(&self) -> Result<SubmittedValues, ValidationErrors> {
        let age = validate_age(&self.values.age).map_err(|_| validate(&self.values))?;
        Ok(SubmittedValues {
            name: self.values.name.clone(),
            age,
            address: self.values.address.clone(),
        })
    }

    fn revalidate(&mut self) {
        self.errors = validate(&self.values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(name: &str, age: &str, address: &str) -> FormState {
        let mut form = FormState::new();
        form.set_value(Field::Name, name);
        form.set_value(Field::Age, age);
        form.set_value(Field::Address, address);
        form
    }

    #[test]
    fn test_no_errors_visible_before_interaction() {
        let form = FormState::new();
        assert!(!form.is_valid());
        for field in Field::ALL {
            assert!(form.errors.get(field).is_some());
            assert!(form.visible_error(field).is_none());
        }
    }

    #[test]
    fn test_error_shown_only_after_blur() {
        let mut form = FormState::new();
        form.push_char(Field::Name, 'A');
        assert_eq!(form.errors.get(Field::Name), Some(&FieldError::TooShort(Field::Name)));
        assert!(form.visible_error(Field::Name).is_none());

        form.blur(Field::Name);
        assert_eq!(
            form.visible_error(Field::Name).map(ToString::to_string),
            Some("Too Short!".to_string())
        );
        // other fields stay hidden
        assert!(form.visible_error(Field::Age).is_none());
    }

    #[test]
    fn test_errors_recomputed_on_every_change() {
        let mut form = FormState::new();
        form.blur(Field::Name);
        assert_eq!(form.visible_error(Field::Name), Some(&FieldError::Required));
        form.push_char(Field::Name, 'A');
        assert_eq!(
            form.visible_error(Field::Name),
            Some(&FieldError::TooShort(Field::Name))
        );
        form.push_char(Field::Name, 'l');
        assert!(form.visible_error(Field::Name).is_none());
        form.pop_char(Field::Name);
        assert!(form.visible_error(Field::Name).is_some());
    }

    #[test]
    fn test_invalid_name_blocks_submit() {
        let address = "a".repeat(25);
        for name in ["".to_string(), "A".to_string(), "x".repeat(51)] {
            let mut form = filled(&name, "30", &address);
            assert!(!form.is_valid());
            let Err(SubmitError::Invalid(errors)) = form.submit() else {
                panic!("submit should fail on {name:?}");
            };
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::Name]);
            assert!(form.visible_error(Field::Name).is_some());
        }
    }

    #[test]
    fn test_invalid_age_blocks_submit() {
        let address = "a".repeat(25);
        for age in ["", "0", "151", "-1", "old", "12abc"] {
            let mut form = filled("Alice Smith", age, &address);
            assert!(!form.is_valid(), "{age}");
            assert!(form.submit().is_err(), "{age}");
        }
    }

    #[test]
    fn test_invalid_address_blocks_submit() {
        for address in ["".to_string(), "a".repeat(19), "a".repeat(201)] {
            let mut form = filled("Alice Smith", "30", &address);
            assert!(form.submit().is_err());
            assert!(form.visible_error(Field::Address).is_some());
        }
    }

    #[test]
    fn test_failed_submit_touches_every_field() {
        let mut form = FormState::new();
        assert!(form.submit().is_err());
        assert_eq!(form.submit_count(), 1);
        for field in Field::ALL {
            assert!(form.is_touched(field));
            assert_eq!(form.visible_error(field), Some(&FieldError::Required));
        }
    }

    #[test]
    fn test_encode_failure_is_reported() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = SubmitError::from(source);
        assert!(matches!(err, SubmitError::Encode(_)));
        assert!(err.to_string().starts_with("failed to encode submission"));
    }

    #[test]
    fn test_valid_submit_emits_values_unchanged() {
        let address = "221B Baker Street, London"; // 25 chars
        assert_eq!(address.chars().count(), 25);
        let mut form = filled("Alice Smith", "30", address);
        for field in Field::ALL {
            form.blur(field);
        }
        assert!(form.is_valid());

        let submission = form.submit().unwrap();
        assert_eq!(submission.values.name, "Alice Smith");
        assert_eq!(submission.values.age, serde_json::Number::from(30));
        assert_eq!(submission.values.address, address);

        let parsed: serde_json::Value = serde_json::from_str(&submission.json).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!({
                "name": "Alice Smith",
                "age": 30,
                "address": address,
            })
        );
        // values remain in the form after submit
        assert_eq!(form.value(Field::Name), "Alice Smith");
    }

    #[test]
    fn test_submission_json_is_indented() {
        let mut form = filled("Bo", "1", &"x".repeat(20));
        let submission = form.submit().unwrap();
        assert!(submission.json.starts_with("{\n  \"name\": \"Bo\""));
    }
}
