use std::{collections::HashSet, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use capgate_plugin_sdk::{Node, NodeRole, UnknownRole};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root of the node registry file, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Registry {
    pub nodes: Vec<NodeEntry>,
}

/// A node record as written in the registry file, before validation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NodeEntry {
    pub name: Option<toml::Value>,
    #[serde(rename = "type")]
    pub role: Option<toml::Value>,
    pub host: Option<toml::Value>,
    pub interface: Option<toml::Value>,
}

/// A registry record too malformed to build a node from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryReadError {
    #[error("node #{index} has no name")]
    MissingName { index: usize },
    #[error("node `{node}` does not declare a type")]
    MissingRole { node: String },
    #[error("node `{node}`: {source}")]
    UnknownRole {
        node: String,
        #[source]
        source: UnknownRole,
    },
    #[error("duplicate node name `{0}`")]
    DuplicateName(String),
    #[error("node `{node}`: field `{field}` must be a string")]
    MalformedField { node: String, field: &'static str },
}

impl Registry {
    /// Reads, interpolates and parses a registry file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read registry file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let expanded = interpolate_env(raw);
        Ok(toml::from_str::<Registry>(&expanded)?)
    }

    /// Validates every record and rejects duplicate names.
    pub fn validate(&self) -> Result<(), RegistryReadError> {
        self.resolved_nodes().map(|_| ())
    }

    /// Returns the immutable node snapshot handed to plugins.
    pub fn resolved_nodes(&self) -> Result<Vec<Node>, RegistryReadError> {
        let mut names = HashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, entry) in self.nodes.iter().enumerate() {
            let node = entry.resolve(index)?;
            if !names.insert(node.name.clone()) {
                return Err(RegistryReadError::DuplicateName(node.name));
            }
            nodes.push(node);
        }
        Ok(nodes)
    }
}

impl NodeEntry {
    fn resolve(&self, index: usize) -> Result<Node, RegistryReadError> {
        let label = format!("#{index}");
        let name = text_field(self.name.as_ref(), &label, "name")?
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() {
            return Err(RegistryReadError::MissingName { index });
        }
        let role = text_field(self.role.as_ref(), name, "type")?
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .ok_or_else(|| RegistryReadError::MissingRole {
                node: name.to_string(),
            })?
            .parse::<NodeRole>()
            .map_err(|source| RegistryReadError::UnknownRole {
                node: name.to_string(),
                source,
            })?;
        let host = text_field(self.host.as_ref(), name, "host")?;
        let interface = text_field(self.interface.as_ref(), name, "interface")?;
        Ok(Node {
            name: name.to_string(),
            role,
            host: host.map(str::to_string),
            interface: interface.map(str::to_string),
        })
    }
}

/// Absent fields are `None`; anything other than a string is malformed.
fn text_field<'v>(
    value: Option<&'v toml::Value>,
    node: &str,
    field: &'static str,
) -> Result<Option<&'v str>, RegistryReadError> {
    match value {
        None => Ok(None),
        Some(toml::Value::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(RegistryReadError::MalformedField {
            node: node.to_string(),
            field,
        }),
    }
}

/// Expands `${VAR}` and `${VAR:default}` references from the environment.
pub fn interpolate_env(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let regex = RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Z0-9_]+)(?::([^}]+))?\}").expect("interpolation pattern is valid")
    });
    let result = regex.replace_all(input, |caps: &regex::Captures| {
        let key = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    });
    result.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER: &str = r#"
[[nodes]]
name = "manager"
type = "manager"
host = "10.0.0.1"

[[nodes]]
name = "worker-1"
type = "worker"
host = "10.0.0.5"
interface = "napatech::0"

[[nodes]]
name = "worker-2"
type = "worker"
host = "10.0.0.6"
interface = "eth1"
"#;

    #[test]
    fn cluster_file_resolves_in_order() {
        let registry = Registry::from_toml_str(CLUSTER).unwrap();
        let nodes = registry.resolved_nodes().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].role, NodeRole::Manager);
        assert!(nodes[0].interface.is_none());
        assert_eq!(nodes[1].interface.as_deref(), Some("napatech::0"));
        assert_eq!(nodes[2].host.as_deref(), Some("10.0.0.6"));
    }

    #[test]
    fn missing_type_is_a_read_error() {
        let registry = Registry::from_toml_str("[[nodes]]\nname = \"w1\"\n").unwrap();
        assert_eq!(
            registry.validate(),
            Err(RegistryReadError::MissingRole { node: "w1".into() })
        );
    }

    #[test]
    fn unknown_type_is_a_read_error() {
        let registry =
            Registry::from_toml_str("[[nodes]]\nname = \"w1\"\ntype = \"sensor\"\n").unwrap();
        let err = registry.validate().unwrap_err();
        assert_eq!(err.to_string(), "node `w1`: unknown node type `sensor`");
    }

    #[test]
    fn unnamed_and_duplicate_nodes_are_rejected() {
        let unnamed = Registry::from_toml_str("[[nodes]]\ntype = \"worker\"\n").unwrap();
        assert_eq!(
            unnamed.validate(),
            Err(RegistryReadError::MissingName { index: 0 })
        );

        let dup = Registry::from_toml_str(
            "[[nodes]]\nname = \"w\"\ntype = \"worker\"\n[[nodes]]\nname = \"w\"\ntype = \"proxy\"\n",
        )
        .unwrap();
        assert_eq!(
            dup.validate(),
            Err(RegistryReadError::DuplicateName("w".into()))
        );
    }

    #[test]
    fn non_string_fields_are_read_errors() {
        let bad_type =
            Registry::from_toml_str("[[nodes]]\nname = \"w1\"\ntype = 5\n").unwrap();
        assert_eq!(
            bad_type.validate(),
            Err(RegistryReadError::MalformedField {
                node: "w1".into(),
                field: "type",
            })
        );

        let bad_interface = Registry::from_toml_str(
            "[[nodes]]\nname = \"w1\"\ntype = \"worker\"\ninterface = 5\n",
        )
        .unwrap();
        let err = bad_interface.validate().unwrap_err();
        assert_eq!(
            err,
            RegistryReadError::MalformedField {
                node: "w1".into(),
                field: "interface",
            }
        );
        assert_eq!(err.to_string(), "node `w1`: field `interface` must be a string");

        let bad_name = Registry::from_toml_str("[[nodes]]\nname = 7\ntype = \"worker\"\n").unwrap();
        assert_eq!(
            bad_name.validate(),
            Err(RegistryReadError::MalformedField {
                node: "#0".into(),
                field: "name",
            })
        );
    }

    #[test]
    fn empty_registry_is_valid() {
        let registry = Registry::from_toml_str("").unwrap();
        assert!(registry.resolved_nodes().unwrap().is_empty());
    }

    #[test]
    fn interpolation_uses_default_when_unset() {
        let out = interpolate_env("interface = \"${CAPGATE_TEST_UNSET_IFACE:napatech::2}\"");
        assert_eq!(out, "interface = \"napatech::2\"");
        assert_eq!(interpolate_env("${CAPGATE_TEST_UNSET_OTHER}"), "");
    }
}
