//! # Constman - named constants kept in CSV files
//!
//! Constman manages a small set of named constant records (key, label, value,
//! unit, description), loads and saves them as CSV, validates user input, and
//! tracks unsaved changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Caller    │────▶│  Collection  │────▶│    Codec    │────▶│  CSV File   │
//! │ (CLI / UI)  │     │ (merge/dirty)│     │ (BOM/quote) │     │ (UTF-8 BOM) │
//! └─────────────┘     └──────────────┘     └─────────────┘     └─────────────┘
//!        │                    │
//!        ▼                    ▼
//!   Validation            Records
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use constman::{ConstantCollection, ConstantRecord, LoadMode};
//!
//! let mut constants = ConstantCollection::new();
//! constants.load("constants.csv", LoadMode::Merge)?;
//! constants.add(ConstantRecord::with_value("MAX_SPEED", "120")?)?;
//! if constants.has_unsaved_changes() {
//!     constants.save("constants.csv")?;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - `ConstantRecord` and input drafts
//! - [`validation`] - Coded field checks (E/W codes)
//! - [`codec`] - CSV load/save with BOM detection
//! - [`collection`] - Ordered collection with merge/replace and dirty tracking
//! - [`logs`] - Operation log broadcast
//! - [`config`] - Environment settings

// Core modules
pub mod error;
pub mod models;

// Validation
pub mod validation;

// CSV I/O
pub mod codec;

// Collection manager
pub mod collection;

// Ambient
pub mod config;
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CollectionError, CollectionResult, ConfigError, CsvError, CsvResult, RecordError,
    RecordResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{ConstantRecord, Field, RecordDraft};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    validate_description, validate_draft, validate_field, validate_logical_name,
    validate_physical_name, validate_unit, validate_value, FieldCheck, ValidationCode,
    ValidationMessage, ValidationReport,
};

// =============================================================================
// Re-exports - Codec
// =============================================================================

pub use codec::{
    detect_encoding, escape_field, load_with_report, Encoding, LoadReport, SkipReason, SkippedRow,
    HEADER,
};

// =============================================================================
// Re-exports - Collection
// =============================================================================

pub use collection::{ConstantCollection, LoadMode, LoadSummary};

// =============================================================================
// Re-exports - Config & logs
// =============================================================================

pub use config::Settings;
pub use logs::{LogEntry, LogLevel, LOG_BROADCASTER};
