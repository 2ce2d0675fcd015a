use serde::{Deserialize, Serialize};

use crate::{ControlPlugin, API_VERSION};

/// On-disk JSON manifest located next to each plugin artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub api_version: u32,
    pub capabilities: Vec<String>,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: String::new(),
            description: None,
            api_version: API_VERSION,
            capabilities: Vec::new(),
        }
    }
}

impl PluginManifest {
    /// Builds the manifest of a plugin linked into the host binary.
    pub fn describe(plugin: &dyn ControlPlugin) -> Self {
        Self {
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
            description: plugin.description().map(str::to_string),
            api_version: plugin.api_version(),
            capabilities: plugin.capabilities().iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.api_version == API_VERSION
    }
}
