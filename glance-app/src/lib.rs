//! Glance app - a small web page for asking a multimodal agent about an
//! uploaded video or image.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as a
//! library so the router can be exercised in tests.

pub mod config;
pub mod error;
pub mod render;
pub mod server;

pub use error::{AppError, Result};
