//! Data models for the application
//!
//! Organized by domain: job lifecycle, uploads, and artifact chat.

mod chat;
mod job;
mod upload;

// Re-export all models for convenient imports
pub use chat::*;
pub use job::*;
pub use upload::*;
