use capgate_plugin_sdk::Node;

/// Interface family prefix that marks a Napatech capture source.
pub const NAPATECH_PREFIX: &str = "napatech::";

/// Returns true when at least one worker reads from a Napatech interface.
pub fn is_active(nodes: &[Node]) -> bool {
    any_worker_with_prefix(nodes, NAPATECH_PREFIX)
}

/// Exact, case-sensitive prefix match over worker interfaces. Nodes without
/// an interface never match.
pub fn any_worker_with_prefix(nodes: &[Node], prefix: &str) -> bool {
    matching_workers(nodes, prefix).next().is_some()
}

pub fn matching_workers<'a>(
    nodes: &'a [Node],
    prefix: &'a str,
) -> impl Iterator<Item = &'a Node> + 'a {
    nodes.iter().filter(move |node| {
        node.is_worker()
            && node
                .interface_spec()
                .map_or(false, |spec| spec.has_prefix(prefix))
    })
}
