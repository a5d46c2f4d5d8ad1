use std::fs;
use std::path::Path;

use blaxel_toolkit::control_plane::AgentChain;
use blaxel_toolkit::LocalEndpoint;

/// What the probe should resolve
#[derive(Clone, Debug, Default)]
pub struct ProbeConfig {
    pub remote_functions: Vec<String>,
    pub local_functions: Vec<LocalEndpoint>,
    pub chain: Vec<AgentChain>,
    /// Register the built-in `hello-world` local function
    pub with_local_examples: bool,
    pub warning: bool,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `name=url,name=url`
fn parse_endpoints(value: &str) -> Vec<LocalEndpoint> {
    split_list(value)
        .into_iter()
        .filter_map(|entry| {
            let (name, url) = entry.split_once('=')?;
            Some(LocalEndpoint::new(name.trim(), url.trim()))
        })
        .collect()
}

impl ProbeConfig {
    fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|s| !s.is_empty());
        Self {
            remote_functions: var("PROBE_FUNCTIONS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            local_functions: var("PROBE_LOCAL_FUNCTIONS")
                .map(|v| parse_endpoints(&v))
                .unwrap_or_default(),
            chain: var("PROBE_CHAIN")
                .map(|v| split_list(&v).into_iter().map(AgentChain::enabled).collect())
                .unwrap_or_default(),
            with_local_examples: var("PROBE_LOCAL_EXAMPLES")
                .map(|v| v != "0" && v != "false")
                .unwrap_or(true),
            warning: var("PROBE_WARNING").map(|v| v == "1" || v == "true").unwrap_or(true),
        }
    }

    /// Load from env, overlay `functions_probe.toml` (or `PROBE_CONFIG`),
    /// then command-line function names.
    pub fn load(args: &[String]) -> Self {
        let mut cfg = Self::from_env();
        let path = std::env::var("PROBE_CONFIG").unwrap_or_else(|_| "functions_probe.toml".into());
        let p = Path::new(&path);
        if p.exists() {
            match fs::read_to_string(p) {
                Ok(s) => match toml::from_str::<ProbeToml>(&s) {
                    Ok(t) => t.apply(&mut cfg),
                    Err(e) => {
                        tracing::warn!(target: "functions_probe", error = %e, "Failed to parse TOML; using env");
                    }
                },
                Err(e) => {
                    tracing::warn!(target: "functions_probe", error = %e, "Failed to read TOML; using env");
                }
            }
        }
        if !args.is_empty() {
            cfg.remote_functions = args.to_vec();
        }
        cfg
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ProbeToml {
    functions: Option<Vec<String>>,
    #[serde(default)]
    local: Vec<LocalEndpoint>,
    #[serde(default)]
    chain: Vec<AgentChain>,
    local_examples: Option<bool>,
    warning: Option<bool>,
}

impl ProbeToml {
    fn apply(self, cfg: &mut ProbeConfig) {
        if let Some(f) = self.functions {
            cfg.remote_functions = f;
        }
        if !self.local.is_empty() {
            cfg.local_functions = self.local;
        }
        if !self.chain.is_empty() {
            cfg.chain = self.chain;
        }
        if let Some(v) = self.local_examples {
            cfg.with_local_examples = v;
        }
        if let Some(v) = self.warning {
            cfg.warning = v;
        }
    }
}
