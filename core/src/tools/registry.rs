use super::error::ToolError;
use super::handle::ToolHandle;
use super::local::LocalFunction;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A group of locally defined tools registered at startup
pub trait FunctionModule: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Result<Vec<ToolHandle>, ToolError>;
}

struct FnModule<F> {
    name: String,
    loader: F,
}

impl<F> FunctionModule for FnModule<F>
where
    F: Fn() -> Result<Vec<ToolHandle>, ToolError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<ToolHandle>, ToolError> {
        (self.loader)()
    }
}

/// Ordered manifest of function modules
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    modules: Vec<Arc<dyn FunctionModule>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn FunctionModule>) -> &mut Self {
        debug!(target: "function_registry", module = %module.name(), "Registering module");
        self.modules.push(module);
        self
    }

    /// Register a module from a loader closure
    pub fn register_fn<F>(&mut self, name: impl Into<String>, loader: F) -> &mut Self
    where
        F: Fn() -> Result<Vec<ToolHandle>, ToolError> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnModule {
            name: name.into(),
            loader,
        }))
    }

    /// Register a single local function as its own module
    pub fn register_function(&mut self, function: LocalFunction) -> &mut Self {
        let name = function.name().to_string();
        self.register_fn(name, move || Ok(vec![function.clone().into_tool()]))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Load every module in registration order.
    ///
    /// A module that fails to load is skipped; `warning` decides whether that
    /// is reported at warn or debug level. Modules returning no tools
    /// contribute nothing. A module name registered twice is loaded once.
    pub fn scan(&self, warning: bool) -> Vec<ToolHandle> {
        let mut seen = HashSet::new();
        let mut tools = Vec::new();
        for module in &self.modules {
            if !seen.insert(module.name().to_string()) {
                debug!(target: "function_registry", module = %module.name(), "Module already loaded");
                continue;
            }
            match module.load() {
                Ok(loaded) if loaded.is_empty() => {
                    debug!(target: "function_registry", module = %module.name(), "Module exposes no tools");
                }
                Ok(loaded) => {
                    info!(target: "function_registry", module = %module.name(), count = loaded.len(), "Loaded tools");
                    tools.extend(loaded);
                }
                Err(e) if warning => {
                    warn!(target: "function_registry", module = %module.name(), error = %e, "Error loading module");
                }
                Err(e) => {
                    debug!(target: "function_registry", module = %module.name(), error = %e, "Error loading module");
                }
            }
        }
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Handler;
    use serde_json::json;

    fn echo(name: &str) -> LocalFunction {
        LocalFunction::new(name, Handler::sync(Ok))
    }

    #[test]
    fn scan_keeps_registration_order_and_skips_failures() {
        let mut registry = FunctionRegistry::new();
        registry
            .register_function(echo("first"))
            .register_fn("broken", || Err(ToolError::Internal("bad module".into())))
            .register_fn("empty", || Ok(vec![]))
            .register_fn("math", || {
                Ok(vec![echo("add").into_tool(), echo("sub").into_tool()])
            });

        let names: Vec<_> = registry.scan(true).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["first", "add", "sub"]);
    }

    #[test]
    fn duplicate_modules_load_once() {
        let mut registry = FunctionRegistry::new();
        registry.register_function(echo("a")).register_function(echo("a"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.scan(false).len(), 1);
    }

    #[tokio::test]
    async fn registered_function_is_invokable() {
        let mut registry = FunctionRegistry::new();
        registry.register_function(echo("echo"));
        let tools = registry.scan(false);
        assert_eq!(tools[0].invoke(json!({"x": 1})).await.unwrap(), json!({}));
    }
}
