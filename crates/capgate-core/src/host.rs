//! Reference host that drives plugins through one configuration run.
//!
//! For every registered plugin the host evaluates the activation decision
//! against the registry snapshot, calls each declared contribution hook at most
//! once when the plugin is active, checks the returned values, and merges them. Any
//! hook failure aborts the whole run and nothing is returned.

use std::collections::{BTreeMap, HashSet};

use capgate_plugin_sdk::{
    ConfigurationContributionError, ControlPlugin, Fragment, HookContext, HookKind, IdentityKeys,
    Node, OptionSpec, API_VERSION,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("plugin `{0}` is already registered")]
    DuplicatePlugin(String),
    #[error("plugin `{plugin}` targets host API {found}, expected {expected}")]
    IncompatibleApi {
        plugin: String,
        found: u32,
        expected: u32,
    },
    #[error("plugin `{plugin}` failed: {source}")]
    Contribution {
        plugin: String,
        #[source]
        source: ConfigurationContributionError,
    },
}

/// Per-run lifecycle state of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Inactive,
    Active,
}

impl PluginState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginState::Inactive => "inactive",
            PluginState::Active => "active",
        }
    }
}

/// Output of a single active plugin, already checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contributions {
    pub identity_keys: BTreeMap<String, String>,
    pub options: Vec<OptionSpec>,
    pub global: Fragment,
}

impl Contributions {
    pub fn is_empty(&self) -> bool {
        self.identity_keys.is_empty() && self.options.is_empty() && self.global.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginReport {
    pub plugin: String,
    pub state: PluginState,
}

/// Merged result of a configuration run across every registered plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedConfig {
    pub plugins: Vec<PluginReport>,
    /// Node keys, namespaced as `<plugin>_<key>`.
    pub node_keys: BTreeMap<String, String>,
    /// Recognised options, namespaced as `<plugin>.<option>`.
    pub options: BTreeMap<String, OptionSpec>,
    pub global: Fragment,
}

impl MergedConfig {
    pub fn state_of(&self, plugin: &str) -> Option<PluginState> {
        self.plugins
            .iter()
            .find(|report| report.plugin == plugin)
            .map(|report| report.state)
    }

    pub fn any_active(&self) -> bool {
        self.plugins
            .iter()
            .any(|report| report.state == PluginState::Active)
    }
}

#[derive(Default)]
pub struct Host {
    plugins: Vec<Box<dyn ControlPlugin>>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn ControlPlugin>) -> Result<(), HostError> {
        if plugin.api_version() != API_VERSION {
            return Err(HostError::IncompatibleApi {
                plugin: plugin.name().to_string(),
                found: plugin.api_version(),
                expected: API_VERSION,
            });
        }
        if self.plugins.iter().any(|p| p.name() == plugin.name()) {
            return Err(HostError::DuplicatePlugin(plugin.name().to_string()));
        }
        tracing::debug!(plugin = plugin.name(), version = %plugin.version(), "plugin registered");
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn plugins(&self) -> &[Box<dyn ControlPlugin>] {
        &self.plugins
    }

    /// Runs one configuration pass over an immutable registry snapshot.
    pub fn run(&self, nodes: &[Node]) -> Result<MergedConfig, HostError> {
        let span = tracing::info_span!("config_pass", nodes = nodes.len());
        let _enter = span.enter();

        let mut merged = MergedConfig::default();
        for plugin in &self.plugins {
            let name = plugin.name();
            let (state, contributions) = match evaluate(plugin.as_ref(), nodes) {
                Ok(outcome) => outcome,
                Err(source) => {
                    metrics::counter!("capgate_config_runs_total", "outcome" => "error")
                        .increment(1);
                    tracing::error!(plugin = name, hook = %source.hook, error = %source, "contribution failed");
                    return Err(HostError::Contribution {
                        plugin: name.to_string(),
                        source,
                    });
                }
            };
            tracing::info!(plugin = name, state = ?state, "plugin evaluated");
            merged.plugins.push(PluginReport {
                plugin: name.to_string(),
                state,
            });
            merge_into(&mut merged, name, contributions).map_err(|source| {
                metrics::counter!("capgate_config_runs_total", "outcome" => "error").increment(1);
                HostError::Contribution {
                    plugin: name.to_string(),
                    source,
                }
            })?;
        }

        let outcome = if merged.any_active() { "active" } else { "inactive" };
        metrics::counter!("capgate_config_runs_total", "outcome" => outcome).increment(1);
        Ok(merged)
    }
}

/// Evaluates a single plugin: gate first, then each declared hook when active.
pub fn evaluate(
    plugin: &dyn ControlPlugin,
    nodes: &[Node],
) -> Result<(PluginState, Contributions), ConfigurationContributionError> {
    if !plugin.is_active(nodes) {
        return Ok((PluginState::Inactive, Contributions::default()));
    }

    let ctx = HookContext::new(nodes, true);
    let identity_keys = if plugin.declares(HookKind::NodeIdentityKeys) {
        checked_identity_keys(plugin, &ctx)?
    } else {
        IdentityKeys::new()
    };
    let options = if plugin.declares(HookKind::DeclaredOptions) {
        checked_options(plugin, &ctx)?
    } else {
        Vec::new()
    };
    let global = if plugin.declares(HookKind::GlobalConfigContribution) {
        plugin.global_config_contribution(&ctx)?
    } else {
        Fragment::new()
    };

    Ok((
        PluginState::Active,
        Contributions {
            identity_keys,
            options,
            global,
        },
    ))
}

fn checked_identity_keys(
    plugin: &dyn ControlPlugin,
    ctx: &HookContext<'_>,
) -> Result<IdentityKeys, ConfigurationContributionError> {
    let identity_keys = plugin.node_identity_keys(ctx)?;
    for (key, value) in &identity_keys {
        check_identifier(HookKind::NodeIdentityKeys, key)?;
        if value.contains(['\n', '\r']) {
            return Err(ConfigurationContributionError::new(
                HookKind::NodeIdentityKeys,
                key.as_str(),
                "value must not contain line breaks",
            ));
        }
    }
    Ok(identity_keys)
}

fn checked_options(
    plugin: &dyn ControlPlugin,
    ctx: &HookContext<'_>,
) -> Result<Vec<OptionSpec>, ConfigurationContributionError> {
    let options = plugin.declared_options(ctx)?;
    let mut seen = HashSet::new();
    for option in &options {
        check_identifier(HookKind::DeclaredOptions, &option.name)?;
        if !seen.insert(option.name.as_str()) {
            return Err(ConfigurationContributionError::new(
                HookKind::DeclaredOptions,
                option.name.as_str(),
                "option declared more than once",
            ));
        }
        option
            .validate_default()
            .map_err(ConfigurationContributionError::invalid_option)?;
    }
    Ok(options)
}

fn check_identifier(hook: HookKind, name: &str) -> Result<(), ConfigurationContributionError> {
    if name.is_empty() {
        return Err(ConfigurationContributionError::new(hook, name, "name must not be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ConfigurationContributionError::new(
            hook,
            name,
            "name may only contain ASCII letters, digits and underscores",
        ));
    }
    Ok(())
}

fn merge_into(
    merged: &mut MergedConfig,
    plugin: &str,
    contributions: Contributions,
) -> Result<(), ConfigurationContributionError> {
    for (key, value) in contributions.identity_keys {
        let key = format!("{plugin}_{key}");
        if merged.node_keys.contains_key(&key) {
            return Err(ConfigurationContributionError::new(
                HookKind::NodeIdentityKeys,
                key,
                "node key collides with another plugin",
            ));
        }
        merged.node_keys.insert(key, value);
    }
    for option in contributions.options {
        let key = format!("{plugin}.{}", option.name);
        merged.options.insert(key, option);
    }
    merged.global.append(contributions.global);
    Ok(())
}
