//! Utility command handlers.

use std::path::Path;

use anyhow::bail;

use sdm4540_driver::DriverConfig;
use sdm4540_transport::{DeviceDiscovery, HidDiscovery, TransportError};

use super::{permission_hint, CommandResult};

/// List connected keyboards
pub async fn list(json: bool) -> CommandResult {
    let discovery = HidDiscovery::new();
    let devices = match discovery.list_devices().await {
        Ok(d) => d,
        Err(e @ TransportError::HidPermissionDenied(_)) => {
            permission_hint();
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        let infos: Vec<_> = devices.iter().map(|d| &d.info).collect();
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No SDM4540UL keyboard found");
        return Ok(());
    }
    for device in &devices {
        let info = &device.info;
        println!(
            "{:04x}:{:04x} {} {}",
            info.vid,
            info.pid,
            info.manufacturer.as_deref().unwrap_or(""),
            info.product_name.as_deref().unwrap_or("Unknown")
        );
        for iface in &info.interfaces {
            println!(
                "  if={} usage={:04x}:{:04x} path={}",
                iface.interface_number, iface.usage_page, iface.usage, iface.path
            );
        }
    }
    Ok(())
}

/// Print the effective button table
pub fn keymap(config: &DriverConfig, json: bool) -> CommandResult {
    let mapping = config.key_mapping()?;

    if json {
        let rows: Vec<_> = mapping
            .entries()
            .map(|(key, signature, code)| {
                serde_json::json!({
                    "button": key,
                    "signature": signature,
                    "code": code,
                    "value": code.code(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<12} {:>5} {:>4} {:>5}  Key code", "Button", "Group", "Byte", "Value");
    for (key, signature, code) in mapping.entries() {
        println!(
            "{:<12} {:>5} {:>4} {:>#5x}  {} ({})",
            key.label(),
            signature.group,
            signature.index,
            signature.value,
            code,
            code.code()
        );
    }
    println!("{:<12} {:>5} {:>4} {:>5}  byte 2 unchanged", "(other)", "*", "", "");
    Ok(())
}

/// Write the default configuration
pub fn init_config(path: &Path, force: bool) -> CommandResult {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    DriverConfig::documented_default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
