use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use capgate_core::{config::Registry, host::Host};
use capgate_plugin_sdk::{Node, PluginManifest};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_REGISTRY: &str = "demos/config/cluster.toml";
const DEFAULT_PLUGIN_DIR: &str = "demos/plugins";

#[derive(Parser, Debug)]
#[command(
    name = "capgate",
    author,
    version,
    about = "Capture-interface plugin gate for cluster control tooling"
)]
struct Cli {
    /// Sets the log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one configuration pass and print the merged plugin output.
    Run {
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REGISTRY)]
        registry: PathBuf,
    },
    /// Interact with registry files (validate, sample output).
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Inspect built-in and installed plugins.
    Plugins {
        #[command(subcommand)]
        command: PluginCommands,
    },
    /// Dump the resolved registry and activation decisions as JSON.
    Diag {
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REGISTRY)]
        registry: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validates the provided registry file.
    Validate {
        #[arg(value_name = "FILE")]
        registry: PathBuf,
    },
    /// Prints the bundled example registry.
    Example,
}

#[derive(Subcommand, Debug)]
enum PluginCommands {
    /// Lists the built-in plugins and any manifests found under DIR.
    List {
        #[arg(long, value_name = "DIR", default_value = DEFAULT_PLUGIN_DIR)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    match cli.command {
        Commands::Run { registry } => handle_run(&registry),
        Commands::Config { command } => handle_config(command),
        Commands::Plugins { command } => handle_plugins(command),
        Commands::Diag { registry } => handle_diag(&registry),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn build_host() -> Result<Host> {
    let mut host = Host::new();
    for plugin in capgate_core::builtin_plugins() {
        host.register(plugin)?;
    }
    Ok(host)
}

fn load_nodes(path: &Path) -> Result<Vec<Node>> {
    let registry = Registry::load(path)?;
    let nodes = registry
        .resolved_nodes()
        .with_context(|| format!("invalid node registry {}", path.display()))?;
    tracing::debug!(registry = %path.display(), nodes = nodes.len(), "registry loaded");
    Ok(nodes)
}

fn handle_run(path: &Path) -> Result<()> {
    let nodes = load_nodes(path)?;
    let host = build_host()?;
    let merged = host.run(&nodes)?;

    for report in &merged.plugins {
        println!("plugin {}: {}", report.plugin, report.state.as_str());
    }
    if !merged.any_active() {
        println!("no plugin is active for this cluster; nothing to contribute");
        return Ok(());
    }

    println!("# node keys");
    for (key, value) in &merged.node_keys {
        println!("{key}={value}");
    }
    println!("# options");
    for (name, option) in &merged.options {
        println!("{name} ({}) = {}", option.kind, option.default);
    }
    println!("# global config");
    print!("{}", merged.global.render());
    Ok(())
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { registry } => {
            let nodes = load_nodes(&registry)?;
            println!(
                "registry OK: {} ({} nodes)",
                registry.display(),
                nodes.len()
            );
        }
        ConfigCommands::Example => {
            println!("{}", include_str!("../../../demos/config/cluster.toml"));
        }
    }
    Ok(())
}

fn handle_plugins(command: PluginCommands) -> Result<()> {
    match command {
        PluginCommands::List { dir } => {
            let host = build_host()?;
            for plugin in host.plugins() {
                print_manifest(&PluginManifest::describe(plugin.as_ref()), "built-in");
            }
            let manifests = discover_plugins(&dir)?;
            if manifests.is_empty() {
                println!("no plugin manifests found under {}", dir.display());
            }
            for manifest in manifests {
                let origin = if manifest.is_compatible() {
                    "manifest"
                } else {
                    "manifest, incompatible api"
                };
                print_manifest(&manifest, origin);
            }
        }
    }
    Ok(())
}

fn print_manifest(manifest: &PluginManifest, origin: &str) {
    println!(
        "- {} v{} [{}]{}",
        manifest.name,
        manifest.version,
        origin,
        manifest
            .description
            .as_ref()
            .map(|d| format!(": {d}"))
            .unwrap_or_default()
    );
}

#[derive(Serialize)]
struct Diagnostics<'a> {
    nodes: &'a [Node],
    plugins: Vec<PluginDiag>,
}

#[derive(Serialize)]
struct PluginDiag {
    name: &'static str,
    version: String,
    active: bool,
}

fn handle_diag(path: &Path) -> Result<()> {
    let nodes = load_nodes(path)?;
    let host = build_host()?;
    let plugins = host
        .plugins()
        .iter()
        .map(|plugin| PluginDiag {
            name: plugin.name(),
            version: plugin.version().to_string(),
            active: plugin.is_active(&nodes),
        })
        .collect();
    let diag = Diagnostics {
        nodes: &nodes,
        plugins,
    };
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn discover_plugins(dir: &Path) -> Result<Vec<PluginManifest>> {
    let mut manifests = Vec::new();
    if !dir.exists() {
        return Ok(manifests);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let data = fs::read_to_string(&path)?;
        let manifest: PluginManifest = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        manifests.push(manifest);
    }
    manifests.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plugin_dir_defaults_to_bundled_manifests() {
        let cli = Cli::try_parse_from(["capgate", "plugins", "list"]).unwrap();
        match cli.command {
            Commands::Plugins {
                command: PluginCommands::List { dir },
            } => {
                assert_eq!(dir, PathBuf::from("demos/plugins"));
                assert!(Path::new(env!("CARGO_MANIFEST_DIR"))
                    .join("../../demos/plugins/napatech.json")
                    .exists());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_defaults_to_bundled_registry() {
        let cli = Cli::try_parse_from(["capgate", "--log-level", "debug", "run"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(
            cli.command,
            Commands::Run { registry } if registry == PathBuf::from(DEFAULT_REGISTRY)
        ));
    }
}
