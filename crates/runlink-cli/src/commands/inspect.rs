//! Configuration and identifier inspection

use std::path::Path;

use anyhow::Context;

use runlink_core::OracleConfig;
use runlink_types::{Address, ExternalId, RequestId};

use crate::display;

/// Load configuration from a JSON file, or from the environment
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OracleConfig> {
    let config: OracleConfig = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => OracleConfig::from_env()?,
    };

    if let Err(errors) = config.validate() {
        anyhow::bail!("invalid configuration: {}", errors.join("; "));
    }
    Ok(config)
}

pub fn show_config(config: &OracleConfig) -> anyhow::Result<()> {
    display::section("Configuration");
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Accept a hex address or derive one from a label
pub fn resolve_address(input: &str) -> Address {
    Address::parse(input).unwrap_or_else(|_| Address::from_label(input))
}

pub fn show_request_id(requester: &str, external_id: &str) {
    let address = resolve_address(requester);
    let id = RequestId::derive(&address, &ExternalId::new(external_id));

    display::section("Request id");
    display::kv("requester", &address.to_string());
    display::kv("external id", external_id);
    display::kv("internal id", &id.to_string());
}
