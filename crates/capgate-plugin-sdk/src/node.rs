use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role a cluster member plays, as declared in the node registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Standalone,
    Manager,
    Proxy,
    Logger,
    Worker,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Standalone => "standalone",
            NodeRole::Manager => "manager",
            NodeRole::Proxy => "proxy",
            NodeRole::Logger => "logger",
            NodeRole::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown node type `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for NodeRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standalone" => Ok(NodeRole::Standalone),
            "manager" => Ok(NodeRole::Manager),
            "proxy" => Ok(NodeRole::Proxy),
            "logger" => Ok(NodeRole::Logger),
            "worker" => Ok(NodeRole::Worker),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A node record from the registry snapshot. Read-only to plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    pub role: NodeRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            role,
            host: None,
            interface: None,
        }
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn is_worker(&self) -> bool {
        self.role == NodeRole::Worker
    }

    /// Capture source of the node; `None` when absent or empty.
    pub fn interface_spec(&self) -> Option<InterfaceSpec<'_>> {
        self.interface.as_deref().and_then(InterfaceSpec::parse)
    }
}

/// Borrowed view over a `<family>::<identifier>` interface string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceSpec<'a> {
    raw: &'a str,
}

impl<'a> InterfaceSpec<'a> {
    pub const SEPARATOR: &'static str = "::";

    pub fn parse(raw: &'a str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self { raw })
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    /// Exact, case-sensitive prefix test on the raw string.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.raw.starts_with(prefix)
    }

    /// Text before the first separator, if there is one.
    pub fn family(&self) -> Option<&'a str> {
        self.raw
            .split_once(Self::SEPARATOR)
            .map(|(family, _)| family)
    }

    /// Text after the first separator, or the whole string for a plain device.
    pub fn identifier(&self) -> &'a str {
        self.raw
            .split_once(Self::SEPARATOR)
            .map_or(self.raw, |(_, id)| id)
    }
}

impl fmt::Display for InterfaceSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw)
    }
}
