//! Scenario: layered setup document.
//!
//! GREEN when:
//! - A network override layered over the base replaces only what it names.
//! - The typed setup view carries the merged values, and validation reports
//!   every unfilled address with its config path.
//! - Unknown keys are reported under `Warn` and rejected under `Fail`.

use tsc_config::{
    load_layered_yaml_from_strings, report_unused_keys, FailureKind, UnusedKeyPolicy,
};
use tsc_schemas::WalletRebindPolicy;

const BASE_YAML: &str = r#"
token:
  expected_symbol: "MILLIES"
target:
  helper_contract: "YOUR_HELPER_CONTRACT"
  advertising_wallet: "0x5BD594887A6a99b991E56E2541785B61606063bF"
  community_wallet: "YOUR_COMMUNITY_WALLET"
  additional_exclusions: []
policy:
  fund_wallets: true
"#;

const NETWORK_YAML: &str = r#"
target:
  helper_contract: "0x824730FE53a434E700D43Ac128264d580b0C105c"
policy:
  wallet_rebind: overwrite
  deadline_secs: 600
"#;

#[test]
fn override_replaces_only_named_leaves() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, NETWORK_YAML]).unwrap();
    let setup = loaded.setup().unwrap();

    assert_eq!(setup.token.expected_symbol.as_deref(), Some("MILLIES"));
    assert_eq!(setup.policy.wallet_rebind, WalletRebindPolicy::Overwrite);
    assert!(setup.policy.fund_wallets);
    assert_eq!(setup.policy.deadline().map(|d| d.as_secs()), Some(600));
    assert!(setup.target.features.buy_tax);

    // community wallet is still the template value from the base layer
    let failures = setup.target.to_target().unwrap_err();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].label, "target.community_wallet");
    assert_eq!(failures[0].kind, FailureKind::Placeholder);
}

#[test]
fn layering_changes_the_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let both = load_layered_yaml_from_strings(&[BASE_YAML, NETWORK_YAML]).unwrap();
    assert_ne!(base.config_hash, both.config_hash);
}

#[test]
fn unknown_keys_warn_or_fail() {
    let typo = "policy:\n  fund_walets: false\n";
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, typo]).unwrap();

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(report.unused_leaf_pointers, vec!["/policy/fund_walets".to_string()]);

    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));
}
