//! Reportdesk Core Library
//!
//! This crate provides the domain models, error types, configuration, input
//! validation and the backend contract shared by all Reportdesk components.

pub mod backend;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use backend::{BackendError, JobBackend, StatusReply};
pub use config::{ClientConfig, PollSettings};
pub use display::truncate_for_display;
pub use error::{ErrorMetadata, JobError, LogLevel};
pub use validation::{SubmissionValidator, ValidationError};
