//! Prints the effective configuration.

use anyhow::Result;
use tradelink_core::config::{ConfigFormat, ConfigLoader, Configurable};
use tradelink_transport::TransportConfig;
use tradelink_transport::config::ENV_PREFIX;

use crate::settings::Settings;

/// Renders validated settings as YAML, followed by the override variables.
pub fn render(settings: &Settings) -> Result<String> {
    let mut out = ConfigLoader::serialize(settings, ConfigFormat::Yaml)?;
    out.push_str("\n# Environment overrides:\n");
    for name in TransportConfig::env_var_names(ENV_PREFIX) {
        out.push_str("#   ");
        out.push_str(&name);
        out.push('\n');
    }
    Ok(out)
}

/// Prints the settings that `watch` and `request` would use.
pub fn run(settings: &Settings) -> Result<()> {
    print!("{}", render(settings)?);
    Ok(())
}
