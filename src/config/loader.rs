//! Configuration loading with multi-layer merge

use super::{GeneratorConfig, WorkflowDefinition};
use crate::engine::FailurePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level nodeflow configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NodeflowConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Generator definitions
    #[serde(default)]
    pub generators: HashMap<String, GeneratorConfig>,
}

/// Global default settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Generator used by aiModel nodes when none is chosen on the command line
    pub generator: Option<String>,

    /// What happens to the dependents of a failed node
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Default generation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    300
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            generator: None,
            failure_policy: FailurePolicy::default(),
            timeout: default_timeout(),
        }
    }
}

impl NodeflowConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/nodeflow/config.toml
    /// 3. .nodeflow/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".nodeflow/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".nodeflow/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/nodeflow/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nodeflow/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.generator.is_some() {
            self.defaults.generator = other.defaults.generator;
        }
        if other.defaults.failure_policy != FailurePolicy::default() {
            self.defaults.failure_policy = other.defaults.failure_policy;
        }
        if other.defaults.timeout != default_timeout() {
            self.defaults.timeout = other.defaults.timeout;
        }

        // Merge generators (other wins for same key)
        for (name, generator) in other.generators {
            self.generators.insert(name, generator);
        }
    }

    /// Get a generator by name
    pub fn get_generator(&self, name: &str) -> Option<&GeneratorConfig> {
        self.generators.get(name)
    }

    /// Get all enabled generators, sorted by name
    pub fn enabled_generators(&self) -> Vec<(&String, &GeneratorConfig)> {
        let mut enabled: Vec<_> = self.generators.iter().filter(|(_, g)| g.enabled).collect();
        enabled.sort_by(|a, b| a.0.cmp(b.0));
        enabled
    }
}

/// Load a workflow definition from a JSON or TOML file
///
/// The format is chosen by extension; anything other than `.toml` is read as
/// JSON, the format the workflow editor exports. Structural validation is left
/// to the engine so that a broken graph is reported as a failed run.
pub fn load_definition(path: &Path) -> Result<WorkflowDefinition> {
    let expanded = expand_path(path);
    let contents = std::fs::read_to_string(&expanded)
        .with_context(|| format!("reading {}", expanded.display()))?;

    let is_toml = expanded
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let mut definition: WorkflowDefinition = if is_toml {
        toml::from_str(&contents).with_context(|| format!("parsing {}", expanded.display()))?
    } else {
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", expanded.display()))?
    };

    if definition.name.is_none() {
        definition.name = expanded
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }

    Ok(definition)
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}
