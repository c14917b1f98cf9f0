//! Tool trait and utilities for defining agent tools.
//!
//! Tools are the way the agent reaches beyond the model. Each tool declares a
//! JSON schema for its arguments; the provider translates the resulting
//! [`ToolDefinition`] into its own function-calling format.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// A type alias for `Result<T, ToolError>`.
pub type ToolResult<T> = Result<T, ToolError>;

/// Definition of a tool for LLM function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ToolDefinition {
    /// Name of the tool (e.g., "web_search").
    pub name: String,

    /// Description of what the tool does.
    /// This helps the model decide when to use the tool.
    pub description: String,

    /// JSON schema for the tool's parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Returns the tool name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The core trait for all tools that agents can use.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static name of the tool.
    const NAME: &'static str;

    /// Arguments type for the tool.
    type Args: for<'de> Deserialize<'de> + Send;

    /// Output type of the tool.
    type Output: Serialize + Send;

    /// Error type for tool execution.
    type Error: Into<ToolError> + Send;

    /// Get the name of the tool.
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Get the description of the tool.
    fn description(&self) -> String;

    /// Get the JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;

    /// Get the tool definition for LLM function calling.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters_schema())
    }

    /// Call the tool with JSON arguments and return JSON output.
    async fn call_json(&self, args: Value) -> Result<Value, ToolError>
    where
        Self::Output: 'static,
    {
        // Some models send arguments as an encoded JSON string.
        let typed_args: Self::Args = match &args {
            Value::String(s) => {
                serde_json::from_str(s).map_err(|e| ToolError::InvalidArguments(e.to_string()))?
            }
            _ => serde_json::from_value(args)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?,
        };

        let result = self.call(typed_args).await.map_err(Into::into)?;
        serde_json::to_value(result).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

/// A boxed dynamic tool that can be used in collections.
pub type BoxedTool = Box<dyn DynTool>;

/// Object-safe version of the Tool trait for dynamic dispatch.
#[async_trait]
pub trait DynTool: Send + Sync {
    /// Get the name of the tool.
    fn name(&self) -> &str;

    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Call the tool with JSON arguments.
    async fn call_json(&self, args: Value) -> Result<Value, ToolError>;
}

#[async_trait]
impl<T: Tool + 'static> DynTool for T
where
    T::Output: 'static,
{
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        Tool::call_json(self, args).await
    }
}

/// A collection of tools that can be used by an agent.
///
/// Tools are kept in name order so the definitions sent to the model are
/// stable between requests.
#[derive(Default)]
pub struct ToolBox {
    tools: BTreeMap<String, BoxedTool>,
}

impl ToolBox {
    /// Create a new empty toolbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool to the toolbox, replacing any tool with the same name.
    pub fn add<T: Tool + 'static>(&mut self, tool: T)
    where
        T::Output: 'static,
    {
        self.tools.insert(Tool::name(&tool).to_owned(), Box::new(tool));
    }

    /// Get all tool definitions.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Get the names of all tools.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Check if the toolbox contains a tool with the given name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of tools in the toolbox.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the toolbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Call a tool by name with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unknown names, or whatever the tool
    /// itself reports.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::not_found(name))?;
        tool.call_json(args).await
    }
}

impl fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct MockTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for MockTool {
        const NAME: &'static str = "mock_tool";
        type Args = Value;
        type Output = Value;
        type Error = ToolError;

        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> String {
            format!("Mock tool: {}", self.name)
        }

        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
            Ok(serde_json::json!({"received": args}))
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct FailingTool;

    #[derive(Debug, Deserialize)]
    struct FailingArgs {
        #[allow(dead_code)]
        query: String,
    }

    #[async_trait]
    impl Tool for FailingTool {
        const NAME: &'static str = "failing";
        type Args = FailingArgs;
        type Output = String;
        type Error = ToolError;

        fn description(&self) -> String {
            "Always fails".into()
        }

        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }

        async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
            Err(ToolError::execution("backend unavailable"))
        }
    }

    mod tool_definition {
        use super::*;

        #[test]
        fn definition_from_tool() {
            let def = Tool::definition(&MockTool { name: "lookup" });
            assert_eq!(def.name(), "lookup");
            assert_eq!(def.description, "Mock tool: lookup");
            assert!(def.parameters.is_object());
        }
    }

    mod toolbox {
        use super::*;

        #[test]
        fn new_creates_empty_toolbox() {
            let toolbox = ToolBox::new();
            assert!(toolbox.is_empty());
            assert_eq!(toolbox.len(), 0);
        }

        #[test]
        fn add_inserts_tool() {
            let mut toolbox = ToolBox::new();
            toolbox.add(MockTool { name: "test_tool" });
            assert_eq!(toolbox.len(), 1);
            assert!(toolbox.contains("test_tool"));
        }

        #[test]
        fn definitions_are_name_ordered() {
            let mut toolbox = ToolBox::new();
            toolbox.add(MockTool { name: "zeta" });
            toolbox.add(MockTool { name: "alpha" });
            let names: Vec<String> = toolbox.definitions().into_iter().map(|d| d.name).collect();
            assert_eq!(names, vec!["alpha", "zeta"]);
        }

        #[tokio::test]
        async fn call_executes_tool() {
            let mut toolbox = ToolBox::new();
            toolbox.add(MockTool { name: "echo" });
            let out = toolbox
                .call("echo", serde_json::json!({"q": 1}))
                .await
                .unwrap();
            assert_eq!(out["received"]["q"], 1);
        }

        #[tokio::test]
        async fn call_returns_error_for_missing_tool() {
            let toolbox = ToolBox::new();
            let err = toolbox.call("nope", Value::Null).await.unwrap_err();
            assert!(matches!(err, ToolError::NotFound(_)));
        }

        #[tokio::test]
        async fn call_accepts_string_encoded_arguments() {
            let mut toolbox = ToolBox::new();
            toolbox.add(FailingTool);
            let err = toolbox
                .call("failing", Value::String(r#"{"query":"x"}"#.into()))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::Execution(_)));
        }

        #[tokio::test]
        async fn call_rejects_bad_arguments() {
            let mut toolbox = ToolBox::new();
            toolbox.add(FailingTool);
            let err = toolbox
                .call("failing", serde_json::json!({"wrong": true}))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }

        #[test]
        fn debug_lists_names() {
            let mut toolbox = ToolBox::new();
            toolbox.add(MockTool { name: "a" });
            assert!(format!("{toolbox:?}").contains("\"a\""));
        }
    }
}
