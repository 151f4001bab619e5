//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: Option<&str>, settings: Settings) -> Result<()> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(&config_path)?;
            Output::success(&format!("Set {} = {} in {}", key, value, config_path.display()));
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Apply a dotted `section.field` assignment and re-validate the result.
fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let mut root = toml::Value::try_from(settings).context("Failed to serialize config")?;

    let (section, field) = key
        .split_once('.')
        .with_context(|| format!("Key must look like section.field, got {}", key))?;

    let table = root
        .get_mut(section)
        .and_then(|v| v.as_table_mut())
        .with_context(|| format!("Unknown config section: {}", section))?;

    table.insert(field.to_string(), parse_value(value));

    let updated: Settings = root
        .try_into()
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;

    // Unknown fields are silently dropped by serde; catch typos here.
    let check = toml::Value::try_from(&updated).context("Failed to serialize config")?;
    if check.get(section).and_then(|s| s.get(field)).is_none() {
        bail!("Unknown config key: {}", key);
    }

    Ok(updated)
}

fn parse_value(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(raw.to_string())
}
