use capgate_plugin_sdk::{
    ControlPlugin, Fragment, HookContext, HookResult, IdentityKeys, Node, OptionSpec,
};

use crate::gate::{self, NAPATECH_PREFIX};

/// Activates when a worker captures from a Napatech NTAPI stream.
///
/// The contribution hooks are placeholders for now and always return empty
/// output, whether or not the host respected the activation decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct NapatechPlugin;

impl NapatechPlugin {
    pub const NAME: &'static str = "napatech";

    pub fn new() -> Self {
        Self
    }
}

impl ControlPlugin for NapatechPlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(1, 0, 0)
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &["node_keys", "options", "global_config"]
    }

    fn description(&self) -> Option<&'static str> {
        Some("Packet acquisition via Napatech NTAPI")
    }

    fn is_active(&self, nodes: &[Node]) -> bool {
        let mut active = false;
        for node in gate::matching_workers(nodes, NAPATECH_PREFIX) {
            active = true;
            tracing::debug!(
                plugin = Self::NAME,
                node = %node.name,
                stream = node.interface_spec().map(|s| s.identifier()).unwrap_or_default(),
                "worker captures from napatech stream"
            );
        }
        active
    }

    fn node_identity_keys(&self, ctx: &HookContext<'_>) -> HookResult<IdentityKeys> {
        tracing::trace!(
            plugin = Self::NAME,
            active = ctx.active(),
            nodes = ctx.nodes().len(),
            "node_identity_keys"
        );
        Ok(IdentityKeys::new())
    }

    fn declared_options(&self, ctx: &HookContext<'_>) -> HookResult<Vec<OptionSpec>> {
        tracing::trace!(
            plugin = Self::NAME,
            active = ctx.active(),
            nodes = ctx.nodes().len(),
            "declared_options"
        );
        Ok(Vec::new())
    }

    fn global_config_contribution(&self, ctx: &HookContext<'_>) -> HookResult<Fragment> {
        tracing::trace!(
            plugin = Self::NAME,
            active = ctx.active(),
            nodes = ctx.nodes().len(),
            "global_config_contribution"
        );
        Ok(Fragment::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capgate_plugin_sdk::{NodeRole, API_VERSION};

    #[test]
    fn worker_stream_with_blank_manager_activates() {
        let nodes = vec![
            Node::new("worker-1", NodeRole::Worker).with_interface("napatech::0"),
            Node::new("manager", NodeRole::Manager).with_interface(""),
        ];
        let plugin = NapatechPlugin::new();
        assert!(plugin.is_active(&nodes));

        let ctx = HookContext::new(&nodes, true);
        assert!(plugin.declared_options(&ctx).unwrap().is_empty());
        assert!(plugin.node_identity_keys(&ctx).unwrap().is_empty());
        assert!(plugin.global_config_contribution(&ctx).unwrap().is_empty());
    }

    #[test]
    fn hooks_are_empty_when_called_while_inactive() {
        let nodes = vec![Node::new("worker-1", NodeRole::Worker).with_interface("eth0")];
        let plugin = NapatechPlugin::new();
        assert!(!plugin.is_active(&nodes));

        let ctx = HookContext::new(&nodes, false);
        assert_eq!(plugin.node_identity_keys(&ctx), Ok(IdentityKeys::new()));
        assert_eq!(plugin.declared_options(&ctx), Ok(Vec::new()));
        assert_eq!(plugin.global_config_contribution(&ctx), Ok(Fragment::new()));
    }

    #[test]
    fn activation_agrees_with_gate() {
        let plugin = NapatechPlugin::new();
        let clusters = vec![
            vec![],
            vec![Node::new("w1", NodeRole::Worker).with_interface("Napatech::0")],
            vec![
                Node::new("m", NodeRole::Manager).with_interface("napatech::0"),
                Node::new("w1", NodeRole::Worker).with_interface("eth0"),
            ],
            vec![
                Node::new("w1", NodeRole::Worker).with_interface("eth0"),
                Node::new("w2", NodeRole::Worker).with_interface("napatech::4"),
            ],
        ];
        for nodes in &clusters {
            assert_eq!(plugin.is_active(nodes), gate::is_active(nodes));
        }
    }

    #[test]
    fn empty_registry_is_inactive() {
        assert!(!NapatechPlugin::new().is_active(&[]));
    }

    #[test]
    fn identity_matches_host_expectations() {
        let plugin = NapatechPlugin::new();
        assert_eq!(plugin.name(), "napatech");
        assert_eq!(plugin.version(), semver::Version::new(1, 0, 0));
        assert_eq!(plugin.api_version(), API_VERSION);
        assert!(plugin.capabilities().contains(&"global_config"));
    }
}
