//! Data validation utilities.

use std::path::Path;

use tactics_core::data::GameData;
use tactics_core::error::{GameError, Result};

/// What validating a data directory found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Ability templates loaded.
    pub abilities: usize,
    /// Unit templates loaded.
    pub units: usize,
    /// Consistency problems. Empty when the data is usable.
    pub problems: Vec<String>,
}

impl ValidationReport {
    /// Check whether the data passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Validate the RON data files in a directory.
///
/// Consistency problems are collected into the report. A file that is
/// missing or does not parse is an error.
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] for unreadable files.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    match GameData::load_from_dir(path) {
        Ok(data) => Ok(ValidationReport {
            abilities: data.abilities().count(),
            units: data.unit_type_count(),
            problems: Vec::new(),
        }),
        Err(GameError::DataValidation(problems)) => Ok(ValidationReport {
            problems,
            ..ValidationReport::default()
        }),
        Err(e) => Err(e),
    }
}
