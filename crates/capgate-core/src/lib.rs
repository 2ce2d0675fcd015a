pub mod config;
pub mod gate;
pub mod host;
pub mod napatech;

use capgate_plugin_sdk::ControlPlugin;

/// Returns the crate version baked in at compile time.
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Plugins compiled into the host binary.
pub fn builtin_plugins() -> Vec<Box<dyn ControlPlugin>> {
    vec![Box::new(napatech::NapatechPlugin::new())]
}
