//! Google Gemini API client implementation.
//!
//! This module provides a client for the Gemini API, supporting:
//! - Content generation with function calling
//! - Resumable uploads and status lookups through the Files API

mod chat;
mod client;
mod config;
mod files;
mod types;

pub use client::Gemini;
pub use config::GeminiConfig;
