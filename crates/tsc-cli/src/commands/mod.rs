//! Command handlers for tsc-cli.
//!
//! Shared helpers live here; the reconcile path has its own module.

pub mod reconcile;

use anyhow::{Context, Result};
use tsc_config::{LoadedConfig, SetupConfig};
use tsc_schemas::NetworkProfile;

/// Load layered YAML and its typed view.
pub fn load_setup(config_paths: &[String]) -> Result<(LoadedConfig, SetupConfig)> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = tsc_config::load_layered_yaml(&path_refs)?;
    let setup = loaded
        .setup()
        .with_context(|| format!("config {:?} is not a setup document", config_paths))?;
    Ok((loaded, setup))
}

/// Execute `tsc validate`.
pub fn validate(config_paths: &[String]) -> Result<()> {
    let (loaded, setup) = load_setup(config_paths)?;
    println!("config_hash={}", loaded.config_hash);

    let failures = setup.target.validate();
    for f in &failures {
        println!("invalid label={} kind={:?} value={}", f.label, f.kind, f.value);
    }
    if !failures.is_empty() {
        let first = &failures[0];
        anyhow::bail!(
            "{} invalid address(es); first: {}",
            failures.len(),
            first
        );
    }

    let checked = setup.target.labeled_addresses().len();
    println!("addresses_ok=true checked={checked}");
    Ok(())
}

pub fn print_profile(p: &NetworkProfile) {
    println!(
        "profile={} network_id={} name=\"{}\"",
        p.kind.as_str(),
        p.network_id,
        p.name
    );
    println!("  router={}", p.router.to_checksum(None));
    println!("  min_operator_balance={}", p.min_operator_balance);
    println!("  funding_amount={}", p.funding_amount);
    println!(
        "  gas_ceiling_per_operation={}",
        p.gas_ceiling_per_operation
            .map(|g| g.to_string())
            .unwrap_or_else(|| "default".to_string())
    );
    println!("  safety_delay_ms={}", p.safety_delay_ms);
}
