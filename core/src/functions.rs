/// Function aggregation
///
/// Merges tools from the local registry, remote functions, local MCP
/// servers and agent chains into one list. A source that keeps failing is
/// logged and left out; the aggregation itself never fails.
use crate::control_plane::AgentChain;
use crate::retry::RetryPolicy;
use crate::toolkit::{
    AnyToolkit, ChainToolkit, LocalEndpoint, LocalToolkit, RemoteToolkit, Toolkit, ToolkitContext,
};
use crate::tools::{FunctionRegistry, ToolHandle};
use futures_util::future::join_all;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Default, Clone)]
pub struct GetFunctionsOptions {
    /// Statically declared tool modules
    pub registry: Option<FunctionRegistry>,
    /// Names of functions deployed on the platform
    pub remote_functions: Vec<String>,
    pub local_functions: Vec<LocalEndpoint>,
    pub chain: Vec<AgentChain>,
    /// Report registry load failures at warn level
    pub warning: bool,
}

pub struct Functions {
    ctx: ToolkitContext,
    retry: RetryPolicy,
}

impl Functions {
    pub fn new(ctx: ToolkitContext) -> Self {
        Self {
            ctx,
            retry: RetryPolicy::aggregation(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve every requested source.
    ///
    /// Order: registry, remote functions, local functions, chain. Names
    /// already seen are dropped with a warning.
    pub async fn get(&self, options: GetFunctionsOptions) -> Vec<ToolHandle> {
        let mut tools = Vec::new();

        if let Some(registry) = &options.registry {
            tools.extend(registry.scan(options.warning));
        }

        let toolkits: Vec<AnyToolkit> = options
            .remote_functions
            .iter()
            .map(|name| AnyToolkit::Remote(RemoteToolkit::new(self.ctx.clone(), name.clone())))
            .chain(options.local_functions.iter().map(|endpoint| {
                AnyToolkit::Local(LocalToolkit::new(self.ctx.clone(), endpoint.clone()))
            }))
            .collect();

        // All sources start before any is awaited
        let resolved = join_all(toolkits.into_iter().map(|t| self.resolve(t))).await;
        for source in resolved.into_iter().flatten() {
            tools.extend(source);
        }

        if !options.chain.is_empty() {
            let mut chain = ChainToolkit::new(self.ctx.clone(), options.chain.clone());
            match chain.initialize().await.and_then(|_| chain.get_tools()) {
                Ok(chain_tools) => tools.extend(chain_tools),
                Err(e) => {
                    warn!(target: "functions", error = %e, "Failed to initialize chain toolkit")
                }
            }
        }

        let tools = dedup(tools);
        info!(target: "functions", count = tools.len(), "Resolved functions");
        tools
    }

    /// Initialize one toolkit with bounded, strictly sequential retries
    async fn resolve(&self, mut toolkit: AnyToolkit) -> Option<Vec<ToolHandle>> {
        let label = toolkit.label();
        let attempts = self.retry.attempts();
        for attempt in 1..=attempts {
            match toolkit.initialize().await.and_then(|_| toolkit.get_tools()) {
                Ok(tools) => {
                    debug!(target: "functions", source = %label, attempt, count = tools.len(), "Source resolved");
                    return Some(tools);
                }
                Err(e) => {
                    info!(target: "functions", source = %label, attempt, max_attempts = attempts, error = %e, "Failed to initialize source");
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
        warn!(target: "functions", source = %label, attempts, "Giving up on source");
        None
    }
}

/// First occurrence of each name wins
fn dedup(tools: Vec<ToolHandle>) -> Vec<ToolHandle> {
    let mut seen = HashSet::new();
    tools
        .into_iter()
        .filter(|tool| {
            let fresh = seen.insert(tool.name.clone());
            if !fresh {
                warn!(target: "functions", tool = %tool.name, "Duplicate tool name, keeping the first one");
            }
            fresh
        })
        .collect()
}

/// Aggregate with the default retry policy
pub async fn get_functions(ctx: ToolkitContext, options: GetFunctionsOptions) -> Vec<ToolHandle> {
    Functions::new(ctx).get(options).await
}
