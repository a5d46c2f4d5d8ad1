/// SDK settings
///
/// Built once at startup and handed to every component explicitly.
/// Sources, lowest priority first: built-in defaults, an optional TOML file
/// (`blaxel.toml`, or the path in `BL_CONFIG`), then `BL_*` environment variables.
use crate::{Result, ToolkitError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "blaxel.toml";

const PROD_BASE_URL: &str = "https://api.blaxel.ai/v0";
const PROD_RUN_URL: &str = "https://run.blaxel.ai";
const DEV_BASE_URL: &str = "https://api.blaxel.dev/v0";
const DEV_RUN_URL: &str = "https://run.blaxel.dev";

/// Runtime configuration shared by every component
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Workspace sent with every authenticated request
    pub workspace: String,
    /// Client name advertised during the MCP handshake
    pub name: String,
    /// `prod` or `dev`; selects the default URLs
    pub env: String,
    /// Control-plane API root
    pub base_url: String,
    /// Root of the public run endpoints
    pub run_url: String,
    /// Suffix of in-cluster function hostnames, e.g. `svc.cluster.local`
    pub run_internal_hostname: String,
    pub api_key: Option<String>,
    /// Pre-issued bearer token, used when no API key is set
    pub access_token: Option<String>,
    /// Default filter level for binaries that install a subscriber
    pub log_level: String,
    /// Snapshot of `BL_FUNCTION_*_SERVICE_NAME` variables
    pub(crate) service_names: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: String::new(),
            name: "blaxel-agent".to_string(),
            env: "prod".to_string(),
            base_url: PROD_BASE_URL.to_string(),
            run_url: PROD_RUN_URL.to_string(),
            run_internal_hostname: String::new(),
            api_key: None,
            access_token: None,
            log_level: "info".to_string(),
            service_names: HashMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsToml {
    workspace: Option<String>,
    name: Option<String>,
    env: Option<String>,
    base_url: Option<String>,
    run_url: Option<String>,
    run_internal_hostname: Option<String>,
    log_level: Option<String>,
    #[serde(default)]
    authentication: AuthenticationToml,
    /// function name -> internal service name
    #[serde(default)]
    functions: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthenticationToml {
    api_key: Option<String>,
    access_token: Option<String>,
}

/// Name of the variable carrying the internal service name of `function`.
///
/// `my-func` -> `BL_FUNCTION_MY_FUNC_SERVICE_NAME`
pub fn function_env_var(function: &str) -> String {
    format!(
        "BL_FUNCTION_{}_SERVICE_NAME",
        function.replace('-', "_").to_uppercase()
    )
}

impl Settings {
    /// Load settings from the config file and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("BL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        let p = Path::new(&path);
        let file = if p.exists() {
            match fs::read_to_string(p) {
                Ok(s) => {
                    info!(target: "settings", path = %path, "Loaded settings file");
                    Some(s)
                }
                Err(e) => {
                    warn!(target: "settings", path = %path, error = %e, "Failed to read settings file; using defaults/env");
                    None
                }
            }
        } else {
            debug!(target: "settings", path = %path, "No settings file found; using defaults/env");
            None
        };
        Self::from_sources(file.as_deref(), std::env::vars())
    }

    /// Build settings from TOML content and an environment snapshot
    pub fn from_sources<I>(toml_content: Option<&str>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let file: SettingsToml = match toml_content {
            Some(s) => toml::from_str(s)
                .map_err(|e| ToolkitError::Config(format!("Invalid settings file: {}", e)))?,
            None => SettingsToml::default(),
        };
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(k, v)| k.starts_with("BL_") && !v.is_empty())
            .collect();

        let env = vars
            .get("BL_ENV")
            .cloned()
            .or(file.env)
            .unwrap_or_else(|| "prod".to_string());
        let (base_url, run_url) = if env == "dev" {
            (DEV_BASE_URL, DEV_RUN_URL)
        } else {
            (PROD_BASE_URL, PROD_RUN_URL)
        };

        let mut settings = Settings {
            env,
            base_url: base_url.to_string(),
            run_url: run_url.to_string(),
            ..Settings::default()
        };

        // File overlay
        overlay(&mut settings.workspace, file.workspace);
        overlay(&mut settings.name, file.name);
        overlay(&mut settings.base_url, file.base_url);
        overlay(&mut settings.run_url, file.run_url);
        overlay(&mut settings.run_internal_hostname, file.run_internal_hostname);
        overlay(&mut settings.log_level, file.log_level);
        settings.api_key = file.authentication.api_key;
        settings.access_token = file.authentication.access_token;
        for (function, service) in file.functions {
            settings
                .service_names
                .insert(function_env_var(&function), service);
        }

        // Environment overlay
        let var = |key: &str| vars.get(key).cloned();
        overlay(&mut settings.workspace, var("BL_WORKSPACE"));
        overlay(&mut settings.name, var("BL_NAME"));
        overlay(&mut settings.base_url, var("BL_BASE_URL"));
        overlay(&mut settings.run_url, var("BL_RUN_URL"));
        overlay(
            &mut settings.run_internal_hostname,
            var("BL_RUN_INTERNAL_HOSTNAME"),
        );
        overlay(&mut settings.log_level, var("BL_LOG_LEVEL"));
        if let Some(key) = var("BL_API_KEY").or_else(|| var("BL_AUTHENTICATION_API_KEY")) {
            settings.api_key = Some(key);
        }
        if let Some(token) = var("BL_ACCESS_TOKEN") {
            settings.access_token = Some(token);
        }
        for (key, value) in &vars {
            if key.starts_with("BL_FUNCTION_") && key.ends_with("_SERVICE_NAME") {
                settings.service_names.insert(key.clone(), value.clone());
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Register an internal service name for `function` (overrides the environment)
    pub fn with_service_name(mut self, function: &str, service: impl Into<String>) -> Self {
        self.service_names
            .insert(function_env_var(function), service.into());
        self
    }

    /// Internal service name for `function`, if one was provided
    pub fn function_service_name(&self, function: &str) -> Option<&str> {
        self.service_names
            .get(&function_env_var(function))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    fn validate(&self) -> Result<()> {
        for (key, value) in [("base_url", &self.base_url), ("run_url", &self.run_url)] {
            url::Url::parse(value).map_err(|_| {
                ToolkitError::Config(format!("Invalid URL format for {}: {}", key, value))
            })?;
        }
        Ok(())
    }
}

fn overlay(target: &mut String, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        *target = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_point_at_production() {
        let settings = Settings::from_sources(None, vars(&[])).unwrap();
        assert_eq!(settings.base_url, "https://api.blaxel.ai/v0");
        assert_eq!(settings.run_url, "https://run.blaxel.ai");
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn dev_env_switches_urls() {
        let settings = Settings::from_sources(None, vars(&[("BL_ENV", "dev")])).unwrap();
        assert_eq!(settings.base_url, "https://api.blaxel.dev/v0");
        assert_eq!(settings.run_url, "https://run.blaxel.dev");
    }

    #[test]
    fn env_overrides_file() {
        let toml = r#"
            workspace = "from-file"
            run_internal_hostname = "internal.local"

            [authentication]
            api_key = "file-key"
        "#;
        let settings = Settings::from_sources(
            Some(toml),
            vars(&[("BL_WORKSPACE", "main"), ("BL_AUTHENTICATION_API_KEY", "env-key")]),
        )
        .unwrap();
        assert_eq!(settings.workspace, "main");
        assert_eq!(settings.run_internal_hostname, "internal.local");
        assert_eq!(settings.api_key.as_deref(), Some("env-key"));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = Settings::from_sources(None, vars(&[("BL_BASE_URL", "fake-url")])).unwrap_err();
        assert!(err.to_string().contains("Invalid URL format"));
    }

    #[test]
    fn service_name_convention() {
        assert_eq!(function_env_var("my-func"), "BL_FUNCTION_MY_FUNC_SERVICE_NAME");

        let settings = Settings::from_sources(
            None,
            vars(&[("BL_FUNCTION_MY_FUNC_SERVICE_NAME", "my-func-svc")]),
        )
        .unwrap();
        assert_eq!(settings.function_service_name("my-func"), Some("my-func-svc"));
        assert_eq!(settings.function_service_name("other"), None);
    }

    #[test]
    fn file_can_declare_service_names() {
        let toml = r#"
            [functions]
            github-search = "github-search-svc"
        "#;
        let settings = Settings::from_sources(Some(toml), vars(&[])).unwrap();
        assert_eq!(
            settings.function_service_name("github-search"),
            Some("github-search-svc")
        );
    }
}
