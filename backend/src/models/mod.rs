//! Domain models for the constant manager.
//!
//! - [`ConstantRecord`] - a named constant keyed by its physical name
//! - [`RecordDraft`] - unvalidated input for building a record
//! - [`Field`] - the five persisted columns, in file order

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult};

/// Construction rule for physical names: leading letter or underscore, then
/// letters, digits, underscores.
static PHYSICAL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("valid physical name regex"));

/// Maximum physical name length, in characters.
pub const MAX_PHYSICAL_NAME_LEN: usize = 32;
pub const MAX_LOGICAL_NAME_LEN: usize = 64;
pub const MAX_VALUE_LEN: usize = 256;
pub const MAX_UNIT_LEN: usize = 16;
pub const MAX_DESCRIPTION_LEN: usize = 256;

// =============================================================================
// Field
// =============================================================================

/// A persisted column of a constant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    PhysicalName,
    LogicalName,
    Value,
    Unit,
    Description,
}

impl Field {
    /// All columns in file order.
    pub const ALL: [Field; 5] = [
        Field::PhysicalName,
        Field::LogicalName,
        Field::Value,
        Field::Unit,
        Field::Description,
    ];

    /// Column title used in the CSV header.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::PhysicalName => "PhysicalName",
            Self::LogicalName => "LogicalName",
            Self::Value => "Value",
            Self::Unit => "Unit",
            Self::Description => "Description",
        }
    }

    /// Maximum length in characters.
    pub fn max_len(self) -> usize {
        match self {
            Self::PhysicalName => MAX_PHYSICAL_NAME_LEN,
            Self::LogicalName => MAX_LOGICAL_NAME_LEN,
            Self::Value => MAX_VALUE_LEN,
            Self::Unit => MAX_UNIT_LEN,
            Self::Description => MAX_DESCRIPTION_LEN,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

// =============================================================================
// Constant Record
// =============================================================================

/// A named constant.
///
/// The physical name is fixed at construction and is the record's identity:
/// equality and hashing look at nothing else. Every mutator compares before
/// assigning, and only a real change sets the modified flag. The flag is
/// cleared by [`ConstantRecord::mark_clean`] alone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantRecord {
    physical_name: String,
    logical_name: String,
    value: String,
    unit: String,
    description: String,
    modified: bool,
}

impl ConstantRecord {
    /// Build a record, rejecting an invalid physical name or a blank value.
    pub fn new(
        physical_name: impl Into<String>,
        logical_name: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> RecordResult<Self> {
        let physical_name = physical_name.into();
        let value = value.into();

        check_physical_name(&physical_name)?;
        if value.trim().is_empty() {
            return Err(RecordError::invalid("value", "Value cannot be empty"));
        }

        Ok(Self {
            physical_name,
            logical_name: logical_name.into(),
            value,
            unit: unit.into(),
            description: description.into(),
            modified: false,
        })
    }

    /// Build a record with only a key and a value.
    pub fn with_value(physical_name: impl Into<String>, value: impl Into<String>) -> RecordResult<Self> {
        Self::new(physical_name, "", value, "", "")
    }

    /// Build a record from a draft. Missing optional fields become `""`.
    pub fn from_draft(draft: &RecordDraft) -> RecordResult<Self> {
        Self::new(
            draft.physical_name.clone(),
            draft.logical_name.clone().unwrap_or_default(),
            draft.value.clone(),
            draft.unit.clone().unwrap_or_default(),
            draft.description.clone().unwrap_or_default(),
        )
    }

    /// Identity key used for equality, hashing and lookups.
    pub fn key(&self) -> &str {
        &self.physical_name
    }

    pub fn physical_name(&self) -> &str {
        &self.physical_name
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Read a column by field.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::PhysicalName => &self.physical_name,
            Field::LogicalName => &self.logical_name,
            Field::Value => &self.value,
            Field::Unit => &self.unit,
            Field::Description => &self.description,
        }
    }

    /// All five columns in file order.
    pub fn columns(&self) -> [&str; 5] {
        Field::ALL.map(|f| self.field(f))
    }

    /// True when a field changed since construction or the last [`mark_clean`](Self::mark_clean).
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns true if the field changed.
    pub fn set_logical_name(&mut self, logical_name: impl Into<String>) -> bool {
        assign(&mut self.logical_name, logical_name.into(), &mut self.modified)
    }

    /// Returns true if the field changed.
    pub fn set_value(&mut self, value: impl Into<String>) -> bool {
        assign(&mut self.value, value.into(), &mut self.modified)
    }

    /// Returns true if the field changed.
    pub fn set_unit(&mut self, unit: impl Into<String>) -> bool {
        assign(&mut self.unit, unit.into(), &mut self.modified)
    }

    /// Returns true if the field changed.
    pub fn set_description(&mut self, description: impl Into<String>) -> bool {
        assign(&mut self.description, description.into(), &mut self.modified)
    }

    /// Copy every mutable field from `other` through the mutators.
    ///
    /// The key is left alone. Returns true if anything changed.
    pub fn overwrite_from(&mut self, other: &ConstantRecord) -> bool {
        let mut changed = self.set_logical_name(other.logical_name.as_str());
        changed |= self.set_value(other.value.as_str());
        changed |= self.set_unit(other.unit.as_str());
        changed |= self.set_description(other.description.as_str());
        changed
    }

    /// Clear the modified flag.
    pub fn mark_clean(&mut self) {
        self.modified = false;
    }
}

fn assign(slot: &mut String, new: String, modified: &mut bool) -> bool {
    if *slot == new {
        return false;
    }
    *slot = new;
    *modified = true;
    true
}

fn check_physical_name(name: &str) -> RecordResult<()> {
    if name.trim().is_empty() {
        return Err(RecordError::invalid(
            "physicalName",
            "PhysicalName cannot be empty",
        ));
    }
    if name.chars().count() > MAX_PHYSICAL_NAME_LEN {
        return Err(RecordError::invalid(
            "physicalName",
            format!("PhysicalName exceeds {} characters", MAX_PHYSICAL_NAME_LEN),
        ));
    }
    if !PHYSICAL_NAME_RE.is_match(name) {
        return Err(RecordError::invalid(
            "physicalName",
            "PhysicalName must match [A-Z_][A-Z0-9_]*",
        ));
    }
    Ok(())
}

impl PartialEq for ConstantRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ConstantRecord {}

impl Hash for ConstantRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

// Hash and Eq both reduce to the key, so sets of records can be queried by name.
impl Borrow<str> for ConstantRecord {
    fn borrow(&self) -> &str {
        self.key()
    }
}

impl fmt::Display for ConstantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} = {} {}",
            self.physical_name, self.logical_name, self.value, self.unit
        )
    }
}

// =============================================================================
// Record Draft
// =============================================================================

/// Unvalidated record input, as typed by a user or read from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub physical_name: String,
    #[serde(default)]
    pub logical_name: Option<String>,
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RecordDraft {
    pub fn new(physical_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            physical_name: physical_name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn logical_name(mut self, logical_name: impl Into<String>) -> Self {
        self.logical_name = Some(logical_name.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate and build.
    pub fn build(&self) -> RecordResult<ConstantRecord> {
        ConstantRecord::from_draft(self)
    }
}

impl From<&ConstantRecord> for RecordDraft {
    fn from(record: &ConstantRecord) -> Self {
        Self {
            physical_name: record.physical_name.clone(),
            logical_name: Some(record.logical_name.clone()),
            value: record.value.clone(),
            unit: Some(record.unit.clone()),
            description: Some(record.description.clone()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
