use std::fmt;

use thiserror::Error;

use crate::{fragment::InvalidDirective, options::InvalidOptionValue};

/// The contribution hooks a plugin exposes to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    NodeIdentityKeys,
    DeclaredOptions,
    GlobalConfigContribution,
}

impl HookKind {
    /// Capability a plugin must declare for the host to call this hook.
    pub fn capability(&self) -> &'static str {
        match self {
            HookKind::NodeIdentityKeys => "node_keys",
            HookKind::DeclaredOptions => "options",
            HookKind::GlobalConfigContribution => "global_config",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::NodeIdentityKeys => "node_identity_keys",
            HookKind::DeclaredOptions => "declared_options",
            HookKind::GlobalConfigContribution => "global_config_contribution",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook could not produce valid output. Fatal to the configuration run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hook `{hook}` cannot contribute configuration for `{input}`: {reason}")]
pub struct ConfigurationContributionError {
    pub hook: HookKind,
    pub input: String,
    pub reason: String,
}

impl ConfigurationContributionError {
    pub fn new(hook: HookKind, input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            hook,
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_directive(hook: HookKind, err: InvalidDirective) -> Self {
        Self::new(hook, err.line, err.reason)
    }

    pub fn invalid_option(err: InvalidOptionValue) -> Self {
        let reason = err.to_string();
        Self::new(HookKind::DeclaredOptions, err.option, reason)
    }
}
