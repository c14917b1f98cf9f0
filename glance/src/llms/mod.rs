//! LLM backend implementations.
//!
//! Each backend is organized into its own submodule.
//!
//! # Available Backends
//!
//! - [`gemini`] - Google Gemini API (chat and the Files API)

pub mod error;
pub mod gemini;

pub use error::LlmError;
pub use gemini::{Gemini, GeminiConfig};
