pub mod error;
pub mod fragment;
pub mod manifest;
pub mod node;
pub mod options;

pub use error::{ConfigurationContributionError, HookKind};
pub use fragment::{Fragment, InvalidDirective};
pub use manifest::PluginManifest;
pub use node::{InterfaceSpec, Node, NodeRole, UnknownRole};
pub use options::{InvalidOptionValue, OptionKind, OptionSpec};

use std::collections::BTreeMap;

/// Host plugin API revision implemented by this SDK.
pub const API_VERSION: u32 = 1;

/// Extra identity attributes a plugin asks the host to expose for its nodes.
pub type IdentityKeys = BTreeMap<String, String>;

pub type HookResult<T> = Result<T, ConfigurationContributionError>;

/// Read-only view handed to every contribution hook.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    nodes: &'a [Node],
    active: bool,
}

impl<'a> HookContext<'a> {
    pub fn new(nodes: &'a [Node], active: bool) -> Self {
        Self { nodes, active }
    }

    pub fn nodes(&self) -> &'a [Node] {
        self.nodes
    }

    /// Activation decision computed by the host for this run.
    pub fn active(&self) -> bool {
        self.active
    }
}

/// Capability interface a control-tool plugin exposes to the host.
///
/// The host calls [`ControlPlugin::is_active`] once per configuration run. Only
/// when it returns `true` may it call the three contribution hooks, each at
/// most once and in any order, and only for hooks whose capability (see
/// [`HookKind::capability`]) the plugin lists in
/// [`ControlPlugin::capabilities`]. Hooks must still return empty output if
/// they are invoked while the plugin is inactive.
pub trait ControlPlugin: Send + Sync {
    fn name(&self) -> &'static str;
    fn version(&self) -> semver::Version;
    fn capabilities(&self) -> &'static [&'static str];

    fn declares(&self, hook: HookKind) -> bool {
        self.capabilities().contains(&hook.capability())
    }

    fn api_version(&self) -> u32 {
        API_VERSION
    }

    fn description(&self) -> Option<&'static str> {
        None
    }

    fn is_active(&self, nodes: &[Node]) -> bool;

    fn node_identity_keys(&self, _ctx: &HookContext<'_>) -> HookResult<IdentityKeys> {
        Ok(IdentityKeys::new())
    }

    fn declared_options(&self, _ctx: &HookContext<'_>) -> HookResult<Vec<OptionSpec>> {
        Ok(Vec::new())
    }

    fn global_config_contribution(&self, _ctx: &HookContext<'_>) -> HookResult<Fragment> {
        Ok(Fragment::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl ControlPlugin for Bare {
        fn name(&self) -> &'static str {
            "bare"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        fn capabilities(&self) -> &'static [&'static str] {
            &[]
        }

        fn is_active(&self, _nodes: &[Node]) -> bool {
            true
        }
    }

    #[test]
    fn default_hooks_contribute_nothing() {
        let nodes = vec![Node::new("w1", NodeRole::Worker).with_interface("eth0")];
        let ctx = HookContext::new(&nodes, true);
        let plugin = Bare;
        assert!(plugin.node_identity_keys(&ctx).unwrap().is_empty());
        assert!(plugin.declared_options(&ctx).unwrap().is_empty());
        assert!(plugin.global_config_contribution(&ctx).unwrap().is_empty());
        assert_eq!(plugin.api_version(), API_VERSION);
        assert!(!plugin.declares(HookKind::DeclaredOptions));
    }
}
