//! Submission validation
//!
//! A job accepts exactly one archive. Validation is pure: it never touches job
//! state, so a rejected submission leaves any job already in flight alone.

use std::path::Path;

use crate::models::SubmittedFile;

/// Validation errors for submissions and chat queries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No file selected")]
    NoFile,

    #[error("Only one archive can be submitted per job ({count} files selected)")]
    MultipleFiles { count: usize },

    #[error("Invalid file extension for {file_name} (expected .{expected})")]
    InvalidExtension { file_name: String, expected: String },

    #[error("Empty file: {0}")]
    EmptyFile(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Question must not be empty")]
    EmptyQuery,
}

/// Validates the files handed to a job submission.
#[derive(Debug, Clone)]
pub struct SubmissionValidator {
    accepted_extension: String,
    max_file_size: u64,
}

impl SubmissionValidator {
    /// `accepted_extension` may be given with or without the leading dot.
    pub fn new(accepted_extension: &str, max_file_size: u64) -> Self {
        Self {
            accepted_extension: normalize_extension(accepted_extension),
            max_file_size,
        }
    }

    /// Validate a submission and return the single accepted file.
    pub fn validate<'a>(&self, files: &'a [SubmittedFile]) -> Result<&'a SubmittedFile, ValidationError> {
        let file = match files {
            [] => return Err(ValidationError::NoFile),
            [file] => file,
            _ => {
                return Err(ValidationError::MultipleFiles { count: files.len() });
            }
        };

        self.validate_extension(&file.file_name)?;
        self.validate_file_size(&file.file_name, file.size_bytes())?;

        Ok(file)
    }

    /// Validate file extension (case-insensitive)
    pub fn validate_extension(&self, file_name: &str) -> Result<(), ValidationError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        if extension.as_deref() != Some(self.accepted_extension.as_str()) {
            return Err(ValidationError::InvalidExtension {
                file_name: file_name.to_string(),
                expected: self.accepted_extension.clone(),
            });
        }

        Ok(())
    }

    /// Validate file size
    pub fn validate_file_size(&self, file_name: &str, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile(file_name.to_string()));
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }
}

/// Reject blank chat questions before they reach the network.
pub fn validate_query(query: &str) -> Result<&str, ValidationError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(trimmed)
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}
