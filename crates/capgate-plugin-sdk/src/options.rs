use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Bool,
    Int,
    String,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptionKind::Bool => "bool",
            OptionKind::Int => "int",
            OptionKind::String => "string",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("option `{option}` expects a {kind} value, got {value:?}")]
pub struct InvalidOptionValue {
    pub option: String,
    pub kind: OptionKind,
    pub value: String,
}

/// A configuration option a plugin understands, with its validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    pub kind: OptionKind,
    pub default: String,
    #[serde(default)]
    pub description: String,
}

impl OptionSpec {
    pub fn new(
        name: impl Into<String>,
        kind: OptionKind,
        default: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default: default.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self, value: &str) -> Result<(), InvalidOptionValue> {
        let ok = match self.kind {
            OptionKind::Bool => matches!(
                value.to_ascii_lowercase().as_str(),
                "0" | "1" | "true" | "false"
            ),
            OptionKind::Int => value.parse::<i64>().is_ok(),
            OptionKind::String => !value.contains(['\n', '\r']),
        };
        if ok {
            Ok(())
        } else {
            Err(InvalidOptionValue {
                option: self.name.clone(),
                kind: self.kind,
                value: value.to_string(),
            })
        }
    }

    pub fn validate_default(&self) -> Result<(), InvalidOptionValue> {
        self.validate(&self.default)
    }
}
