//! tsc-config
//!
//! Layered YAML configuration for the setup controller.
//!
//! - Documents merge in order (base -> network -> operator overrides); later
//!   documents win, objects merge deeply.
//! - The merged document is canonicalised (sorted keys) and hashed so a run
//!   can record exactly which configuration it acted on.
//! - Leaf strings that look like signing material abort the load. This system
//!   never holds keys; a key in config is an operator mistake.
//! - Unknown keys are reported; on the primary network they are rejected.

pub mod network;
pub mod target;
pub mod validate;

pub use network::{
    known_profiles, resolve_profile, unidentified_profile, PRIMARY_NETWORK_ID, STAGING_NETWORK_ID,
};
pub use target::{SetupConfig, TargetSpec};
pub use validate::{check_address, validate_addresses, FailureKind, ValidationFailure};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

/// Leaf string prefixes treated as secrets.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "xprv",       // BIP32 extended private key
    "sk-",
    "sk_live",
    "ghp_",
    "AKIA",
];

/// JSON-pointer prefixes the controller actually reads.
const CONSUMED_POINTERS: &[&str] = &[
    "/token/expected_name",
    "/token/expected_symbol",
    "/target/helper_contract",
    "/target/lens_contract",
    "/target/advertising_wallet",
    "/target/community_wallet",
    "/target/liquidity_pool",
    "/target/additional_exclusions",
    "/target/features",
    "/policy/wallet_rebind",
    "/policy/fund_wallets",
    "/policy/complete_setup",
    "/policy/deadline_secs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Leaf pointers not covered by any consumed prefix (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Report config leaves nothing reads. With `Fail`, any unused leaf is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = CONSUMED_POINTERS
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !consumed.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s): {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" covers "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix) && leaf[prefix.len()..].starts_with('/')
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                let token = k.replace('~', "~0").replace('/', "~1");
                collect_leaf_pointers(vv, &format!("{prefix}/{token}"), out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_pointers(vv, &format!("{prefix}/{i}"), out);
            }
        }
        _ => out.push(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the document.
    pub fn setup(&self) -> Result<SetupConfig> {
        SetupConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs = Vec::with_capacity(paths.len());
    for p in paths {
        docs.push(fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?);
    }
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json =
        serde_json::to_string(&sort_keys(&merged)).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

/// Prefix match, or a bare 32-byte hex string (raw private key).
fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    let hex_body = t.strip_prefix("0x").unwrap_or(t);
    if hex_body.len() == 64 && hex_body.chars().all(|c| c.is_ascii_hexdigit()) {
        return true;
    }
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_documents_override_earlier() {
        let base = "policy:\n  fund_wallets: true\n  complete_setup: false\n";
        let over = "policy:\n  complete_setup: true\n";
        let loaded = load_layered_yaml_from_strings(&[base, over]).unwrap();
        assert_eq!(loaded.config_json["policy"]["fund_wallets"], true);
        assert_eq!(loaded.config_json["policy"]["complete_setup"], true);
    }

    #[test]
    fn hash_ignores_key_order() {
        let a = load_layered_yaml_from_strings(&["a: 1\nb: 2\n"]).unwrap();
        let b = load_layered_yaml_from_strings(&["b: 2\na: 1\n"]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn raw_private_key_is_rejected() {
        let yaml = format!("operator:\n  key: \"0x{}\"\n", "ab".repeat(32));
        let err = load_layered_yaml_from_strings(&[&yaml]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
        assert!(!err.to_string().contains("abab"));
    }

    #[test]
    fn addresses_are_not_secrets() {
        assert!(!looks_like_secret("0x10ED43C718714eb63d5aA57B78B54704E256024E"));
    }

    #[test]
    fn prefix_pointer_respects_boundaries() {
        assert!(is_prefix_pointer("/target/features", "/target/features/buy_tax"));
        assert!(!is_prefix_pointer("/target/feat", "/target/features"));
    }
}
