//! Glance - ask questions about videos and images.
//!
//! This crate holds the analysis pipeline behind the `glance` app: media
//! intake and normalization, registration of videos with the Gemini Files
//! API, and an agent that answers with Gemini and a web-search tool.

pub mod agent;
pub mod analysis;
pub mod chat;
pub mod error;
pub mod llms;
pub mod media;
pub mod message;
pub mod prelude;
pub mod tool;
pub mod tools;

pub use error::{Error, LlmError, MediaError, Result, ToolError};
