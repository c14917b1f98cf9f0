//! Built-in tools available to the agent.
//!
//! - [`WebSearchTool`]: web search through `DuckDuckGo`

pub mod web_search;

pub use web_search::{SearchResult, WebSearchArgs, WebSearchTool};
