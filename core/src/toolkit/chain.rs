use super::{Toolkit, ToolkitContext};
use crate::control_plane::AgentChain;
use crate::run::{ResourceRunner, ResourceType, RunRequest};
use crate::schema::{FieldSchema, InvocationSchema, ParamKind};
use crate::tools::{ToolBackend, ToolHandle, ToolResult};
use crate::{Result, ToolkitError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Agent resolved from a chain entry
#[derive(Debug, Clone, PartialEq)]
pub struct ChainedAgent {
    pub name: String,
    pub description: String,
    pub prompt: Option<String>,
}

/// Other deployed agents exposed as tools
pub struct ChainToolkit {
    ctx: ToolkitContext,
    /// Requested entries; disabled ones are ignored
    chain: Vec<AgentChain>,
    /// Deployed agents matched by `initialize`
    agents: Option<Vec<ChainedAgent>>,
}

impl ChainToolkit {
    pub fn new(ctx: ToolkitContext, chain: Vec<AgentChain>) -> Self {
        Self {
            ctx,
            chain,
            agents: None,
        }
    }

    pub fn agents(&self) -> Option<&[ChainedAgent]> {
        self.agents.as_deref()
    }
}

/// Single required string field `inputs`
fn chain_input_schema() -> InvocationSchema {
    InvocationSchema::new(vec![FieldSchema {
        name: "inputs".to_string(),
        kind: ParamKind::String,
        description: None,
        default: None,
        required: true,
    }])
}

#[async_trait]
impl Toolkit for ChainToolkit {
    fn label(&self) -> String {
        "chain".to_string()
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.agents.is_some() {
            return Ok(());
        }

        let deployed = self.ctx.control_plane.list_agents().await?;
        if deployed.is_empty() {
            return Err(ToolkitError::NoAgents);
        }

        let mut agents = Vec::new();
        for entry in self.chain.iter().filter(|c| c.enabled) {
            let Some(agent) = deployed
                .iter()
                .find(|a| a.metadata.name.as_deref() == Some(entry.name.as_str()))
            else {
                debug!(target: "chain_toolkit", agent = %entry.name, "Agent not deployed, skipping");
                continue;
            };
            let Some(spec) = agent.spec.as_ref() else {
                debug!(target: "chain_toolkit", agent = %entry.name, "Agent has no spec, skipping");
                continue;
            };

            let prompt = non_empty(&entry.prompt).or_else(|| non_empty(&spec.prompt));
            let description = non_empty(&entry.description)
                .or_else(|| non_empty(&spec.description))
                .or_else(|| prompt.clone())
                .unwrap_or_default();
            agents.push(ChainedAgent {
                name: entry.name.clone(),
                description,
                prompt,
            });
        }

        info!(target: "chain_toolkit", count = agents.len(), "Resolved chained agents");
        self.agents = Some(agents);
        Ok(())
    }

    fn get_tools(&self) -> Result<Vec<ToolHandle>> {
        let agents = self.agents.as_ref().ok_or(ToolkitError::NotInitialized)?;
        Ok(agents
            .iter()
            .map(|agent| {
                ToolHandle::new(
                    agent.name.clone(),
                    agent.description.clone(),
                    chain_input_schema(),
                    Arc::new(AgentBackend {
                        runner: Arc::clone(&self.ctx.runner),
                        agent: agent.name.clone(),
                    }),
                )
            })
            .collect())
    }
}

/// Empty strings count as unset
fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

struct AgentBackend {
    runner: Arc<dyn ResourceRunner>,
    agent: String,
}

#[async_trait]
impl ToolBackend for AgentBackend {
    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let response = self
            .runner
            .run(RunRequest::post(
                ResourceType::Agent,
                self.agent.clone(),
                arguments,
            ))
            .await?;
        Ok(Value::String(response.body))
    }
}
