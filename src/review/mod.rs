//! AI-assisted review notes.
//!
//! This module builds the review prompt from a filtered view and sends it to
//! the text-generation service.

pub mod prompt;
pub mod requester;

pub use prompt::ReviewRequest;
pub use requester::{ReviewConfig, ReviewNoteRequester};
