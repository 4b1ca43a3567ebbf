//! Centralized input limits shared by the CLI, the HTTP service and dataset matching.

/// Maximum length in bytes of a scientific name or authorship (DOS protection)
pub const MAX_NAME_LENGTH: usize = 1000;

/// Maximum length in bytes of a dataset key
pub const MAX_DATASET_KEY_LENGTH: usize = 256;

/// Maximum number of rows read from a single record or backbone file (DOS protection)
pub const MAX_RECORDS: usize = 10_000_000;

/// Input validation error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name too long: {0} bytes exceeds maximum of {MAX_NAME_LENGTH}")]
    NameTooLong(usize),
    #[error("Name contains control characters")]
    ControlCharacters,
    #[error("Empty dataset key provided")]
    EmptyDatasetKey,
    #[error("Dataset key too long: exceeds {MAX_DATASET_KEY_LENGTH} bytes")]
    DatasetKeyTooLong,
    #[error("Too many records: exceeds maximum of {MAX_RECORDS}")]
    TooManyRecords,
}

/// Validate a scientific name or authorship string.
///
/// Tabs are tolerated as whitespace; every other control character is rejected.
///
/// # Examples
///
/// ```
/// use nub_matcher::utils::validation::validate_name;
///
/// assert!(validate_name("Abies alba Mill.").is_ok());
/// assert!(validate_name("Abies\u{0}alba").is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::NameTooLong` if the name exceeds [`MAX_NAME_LENGTH`] bytes or
/// `ValidationError::ControlCharacters` if it contains control characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong(name.len()));
    }
    if name.chars().any(|c| c.is_control() && c != '\t') {
        return Err(ValidationError::ControlCharacters);
    }
    Ok(())
}

/// Validate a dataset key.
///
/// # Errors
///
/// Returns `ValidationError::EmptyDatasetKey` for blank keys and
/// `ValidationError::DatasetKeyTooLong` above [`MAX_DATASET_KEY_LENGTH`] bytes.
pub fn validate_dataset_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::EmptyDatasetKey);
    }
    if key.len() > MAX_DATASET_KEY_LENGTH {
        return Err(ValidationError::DatasetKeyTooLong);
    }
    if key.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters);
    }
    Ok(())
}

/// Check if reading another record would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new record.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_record_limit(count: usize) -> Option<String> {
    if count >= MAX_RECORDS {
        Some(format!(
            "Too many records: adding another would exceed maximum of {MAX_RECORDS}"
        ))
    } else {
        None
    }
}

/// Trim a string and turn blanks into `None`.
#[must_use]
pub fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
