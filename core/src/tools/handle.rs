use super::error::ToolResult;
use super::traits::ToolBackend;
use crate::schema::InvocationSchema;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Invokable tool handed to the agent runtime
#[derive(Clone)]
pub struct ToolHandle {
    pub name: String,
    pub description: String,
    pub schema: InvocationSchema,
    backend: Arc<dyn ToolBackend>,
}

impl ToolHandle {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: InvocationSchema,
        backend: Arc<dyn ToolBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            backend,
        }
    }

    /// Validate `arguments` and dispatch them. Rejected arguments never reach the backend.
    pub async fn invoke(&self, arguments: Value) -> ToolResult<Value> {
        let arguments = self.schema.validate(&arguments)?;
        debug!(target: "tool", tool = %self.name, "Invoking tool");
        self.backend.call(arguments).await
    }

    /// JSON Schema of the arguments
    pub fn parameters(&self) -> Value {
        self.schema.to_json_schema()
    }

    /// Function-calling tool definition
    pub fn to_openai_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters(),
            }
        })
    }
}

impl fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
