use super::error::ToolResult;
use super::handle::ToolHandle;
use super::traits::ToolBackend;
use crate::control_plane::StoreFunctionParameter;
use crate::schema::build_schema;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

type SyncFn = dyn Fn(Value) -> ToolResult<Value> + Send + Sync;
type AsyncFn = dyn Fn(Value) -> BoxFuture<'static, ToolResult<Value>> + Send + Sync;

/// Function body of a locally declared tool
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl Handler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> ToolResult<Value> + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<Value>> + Send + 'static,
    {
        Handler::Async(Arc::new(move |args| Box::pin(f(args))))
    }
}

#[async_trait]
impl ToolBackend for Handler {
    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        match self {
            Handler::Sync(f) => f(arguments),
            Handler::Async(f) => f(arguments).await,
        }
    }
}

/// Builder for a tool implemented in-process
#[derive(Clone)]
pub struct LocalFunction {
    name: String,
    description: String,
    parameters: Vec<StoreFunctionParameter>,
    handler: Handler,
}

impl LocalFunction {
    /// `name` is slugified: `Hello World` -> `hello-world`
    pub fn new(name: &str, handler: Handler) -> Self {
        Self {
            name: slugify(name),
            description: String::new(),
            parameters: Vec::new(),
            handler,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parameter(mut self, parameter: StoreFunctionParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(mut self, parameters: Vec<StoreFunctionParameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_tool(self) -> ToolHandle {
        ToolHandle::new(
            self.name,
            self.description,
            build_schema(&self.parameters),
            Arc::new(self.handler),
        )
    }
}

pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '_'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use serde_json::json;

    #[test]
    fn names_are_slugified() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("get_weather"), "get-weather");
    }

    #[tokio::test]
    async fn sync_handler() {
        let tool = LocalFunction::new(
            "Add",
            Handler::sync(|args| {
                let a = args["a"].as_f64().unwrap_or_default();
                let b = args["b"].as_f64().unwrap_or_default();
                Ok(json!(a + b))
            }),
        )
        .description("Add two numbers")
        .parameter(StoreFunctionParameter::new("a", "number").required(true))
        .parameter(StoreFunctionParameter::new("b", "number").required(true))
        .into_tool();

        assert_eq!(tool.name, "add");
        assert_eq!(tool.invoke(json!({"a": 1, "b": 2})).await.unwrap(), json!(3.0));
    }

    #[tokio::test]
    async fn async_handler() {
        let tool = LocalFunction::new(
            "fail_later",
            Handler::future(|_args| async { Err(ToolError::ExecutionFailed("boom".into())) }),
        )
        .into_tool();

        let err = tool.invoke(json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Execution failed: boom");
    }
}
