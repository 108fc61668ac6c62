//! Reportdesk job worker
//!
//! Client-side job lifecycle: upload handshake, status polling with a
//! stale-job guard, and the chat gate on the finished artifact. All network
//! access goes through [`reportdesk_core::JobBackend`].

pub mod chat;
pub mod controller;
pub mod poller;
pub mod state;
pub mod upload;

pub use chat::ChatGate;
pub use controller::JobController;
pub use poller::{progress_message, PollHandle, PollOutcome, StatusPoller};
pub use state::JobState;
pub use upload::UploadCoordinator;
