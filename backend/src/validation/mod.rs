//! Field-level validation for constant input.
//!
//! Each validator is a pure function returning a [`FieldCheck`]: pass/fail plus
//! an optional coded message for display. Codes starting with `E` block the
//! action; codes starting with `W` are advisory.
//!
//! | Field        | Codes               |
//! |--------------|---------------------|
//! | physicalName | E005, E008, E009    |
//! | logicalName  | E006                |
//! | value        | E007                |
//! | unit         | W003                |
//! | description  | W004                |
//!
//! The physical name rule here is `[A-Z_]+` (no digits). Record construction
//! uses its own rule, `[A-Z_][A-Z0-9_]*`; the two are kept separate.
//!
//! # Example
//!
//! ```rust
//! use constman::validation::{validate_physical_name, ValidationCode};
//!
//! let check = validate_physical_name("");
//! assert!(!check.valid);
//! assert_eq!(check.code(), Some(ValidationCode::E005));
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{Field, RecordDraft};
use crate::models::{
    MAX_DESCRIPTION_LEN, MAX_LOGICAL_NAME_LEN, MAX_PHYSICAL_NAME_LEN, MAX_UNIT_LEN, MAX_VALUE_LEN,
};

static PHYSICAL_NAME_INPUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_]+$").expect("valid physical name input regex"));

// =============================================================================
// Codes and messages
// =============================================================================

/// Stable validation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationCode {
    /// Physical name is required.
    E005,
    /// Logical name is required or too long.
    E006,
    /// Value is required or too long.
    E007,
    /// Physical name has an invalid format.
    E008,
    /// Physical name is too long.
    E009,
    /// Unit is too long.
    W003,
    /// Description is too long.
    W004,
}

impl ValidationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E005 => "E005",
            Self::E006 => "E006",
            Self::E007 => "E007",
            Self::E008 => "E008",
            Self::E009 => "E009",
            Self::W003 => "W003",
            Self::W004 => "W004",
        }
    }

    /// Blocking codes must stop the action.
    pub fn is_blocking(self) -> bool {
        self.as_str().starts_with('E')
    }

    /// Display text, prefixed with the code.
    pub fn message(self) -> String {
        let text = match self {
            Self::E005 => "Physical name is required".to_string(),
            Self::E006 => format!(
                "Logical name is required and must be at most {} characters",
                MAX_LOGICAL_NAME_LEN
            ),
            Self::E007 => format!(
                "Value is required and must be at most {} characters",
                MAX_VALUE_LEN
            ),
            Self::E008 => {
                "Physical name may only contain uppercase letters and underscores".to_string()
            }
            Self::E009 => format!(
                "Physical name must be at most {} characters",
                MAX_PHYSICAL_NAME_LEN
            ),
            Self::W003 => format!("Unit should be at most {} characters", MAX_UNIT_LEN),
            Self::W004 => format!(
                "Description should be at most {} characters",
                MAX_DESCRIPTION_LEN
            ),
        };
        format!("[{}] {}", self.as_str(), text)
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub code: ValidationCode,
    pub text: String,
}

impl ValidationMessage {
    fn from_code(code: ValidationCode) -> Self {
        Self {
            code,
            text: code.message(),
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// =============================================================================
// Field check
// =============================================================================

/// Outcome of a single field validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCheck {
    pub valid: bool,
    pub message: Option<ValidationMessage>,
}

impl FieldCheck {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn fail(code: ValidationCode) -> Self {
        Self {
            valid: false,
            message: Some(ValidationMessage::from_code(code)),
        }
    }

    pub fn code(&self) -> Option<ValidationCode> {
        self.message.as_ref().map(|m| m.code)
    }

    /// Failed with a blocking code.
    pub fn is_blocking(&self) -> bool {
        self.code().is_some_and(ValidationCode::is_blocking)
    }
}

fn too_long(field: Field, input: &str) -> bool {
    input.chars().count() > field.max_len()
}

/// Required, `[A-Z_]+`, at most 32 characters. Checked in that order.
pub fn validate_physical_name(input: &str) -> FieldCheck {
    if input.is_empty() {
        return FieldCheck::fail(ValidationCode::E005);
    }
    if !PHYSICAL_NAME_INPUT_RE.is_match(input) {
        return FieldCheck::fail(ValidationCode::E008);
    }
    if too_long(Field::PhysicalName, input) {
        return FieldCheck::fail(ValidationCode::E009);
    }
    FieldCheck::ok()
}

/// Required, at most 64 characters.
pub fn validate_logical_name(input: &str) -> FieldCheck {
    if input.is_empty() || too_long(Field::LogicalName, input) {
        return FieldCheck::fail(ValidationCode::E006);
    }
    FieldCheck::ok()
}

/// Required, at most 256 characters.
pub fn validate_value(input: &str) -> FieldCheck {
    if input.is_empty() || too_long(Field::Value, input) {
        return FieldCheck::fail(ValidationCode::E007);
    }
    FieldCheck::ok()
}

/// Optional, at most 16 characters (warning).
pub fn validate_unit(input: &str) -> FieldCheck {
    if too_long(Field::Unit, input) {
        return FieldCheck::fail(ValidationCode::W003);
    }
    FieldCheck::ok()
}

/// Optional, multiline, at most 256 characters (warning).
pub fn validate_description(input: &str) -> FieldCheck {
    if too_long(Field::Description, input) {
        return FieldCheck::fail(ValidationCode::W004);
    }
    FieldCheck::ok()
}

/// Dispatch to the validator for `field`.
pub fn validate_field(field: Field, input: &str) -> FieldCheck {
    match field {
        Field::PhysicalName => validate_physical_name(input),
        Field::LogicalName => validate_logical_name(input),
        Field::Value => validate_value(input),
        Field::Unit => validate_unit(input),
        Field::Description => validate_description(input),
    }
}

// =============================================================================
// Draft report
// =============================================================================

/// All failed checks for a draft, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<(Field, ValidationMessage)>,
    pub warnings: Vec<(Field, ValidationMessage)>,
}

impl ValidationReport {
    /// Any blocking error present.
    pub fn is_blocked(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Every message, errors first.
    pub fn messages(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.errors.iter().chain(self.warnings.iter()).map(|(_, m)| m)
    }
}

/// Run every field validator over a draft.
///
/// With `skip_physical_name`, the key is not checked; an edit of an existing
/// record cannot change it.
pub fn validate_draft(draft: &RecordDraft, skip_physical_name: bool) -> ValidationReport {
    let mut report = ValidationReport::default();
    let inputs = [
        (Field::PhysicalName, draft.physical_name.as_str()),
        (Field::LogicalName, draft.logical_name.as_deref().unwrap_or("")),
        (Field::Value, draft.value.as_str()),
        (Field::Unit, draft.unit.as_deref().unwrap_or("")),
        (Field::Description, draft.description.as_deref().unwrap_or("")),
    ];

    for (field, input) in inputs {
        if skip_physical_name && field == Field::PhysicalName {
            continue;
        }
        let check = validate_field(field, input);
        if let Some(message) = check.message {
            if message.code.is_blocking() {
                report.errors.push((field, message));
            } else {
                report.warnings.push((field, message));
            }
        }
    }

    report
}
