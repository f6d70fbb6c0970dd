//! Raw target configuration as written by the operator, and its conversion to
//! the validated [`TargetConfiguration`].

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tsc_schemas::{FeatureSet, SetupPolicy, TargetConfiguration, TokenIdentity};

use crate::validate::{check_address, validate_addresses, ValidationFailure};

/// Target section before validation. Every address is still a string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(default)]
    pub helper_contract: String,
    #[serde(default)]
    pub lens_contract: Option<String>,
    #[serde(default)]
    pub advertising_wallet: String,
    #[serde(default)]
    pub community_wallet: String,
    /// Optional; empty or absent means "not created yet".
    #[serde(default)]
    pub liquidity_pool: Option<String>,
    #[serde(default)]
    pub additional_exclusions: Vec<String>,
    #[serde(default)]
    pub features: FeatureSet,
}

impl TargetSpec {
    /// Every address the operator supplied, labeled by config path.
    /// Optional fields appear only when set to a non-empty value.
    pub fn labeled_addresses(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("target.helper_contract".to_string(), self.helper_contract.clone()),
            ("target.advertising_wallet".to_string(), self.advertising_wallet.clone()),
            ("target.community_wallet".to_string(), self.community_wallet.clone()),
        ];
        if let Some(lens) = non_empty(&self.lens_contract) {
            out.push(("target.lens_contract".to_string(), lens.to_string()));
        }
        if let Some(pool) = non_empty(&self.liquidity_pool) {
            out.push(("target.liquidity_pool".to_string(), pool.to_string()));
        }
        for (i, a) in self.additional_exclusions.iter().enumerate() {
            out.push((format!("target.additional_exclusions[{i}]"), a.clone()));
        }
        out
    }

    pub fn validate(&self) -> Vec<ValidationFailure> {
        let labeled = self.labeled_addresses();
        validate_addresses(labeled.iter().map(|(l, v)| (l.as_str(), v.as_str())))
    }

    /// Validate and convert. Fails with the complete failure list.
    pub fn to_target(&self) -> Result<TargetConfiguration, Vec<ValidationFailure>> {
        let failures = self.validate();
        if !failures.is_empty() {
            return Err(failures);
        }

        // validate() returned no failures, so every parse below succeeds;
        // map_err keeps this path free of panics regardless.
        let parse = |label: &str, raw: &str| {
            check_address(raw).map_err(|kind| {
                vec![ValidationFailure {
                    label: label.to_string(),
                    value: raw.to_string(),
                    kind,
                }]
            })
        };

        let mut additional_exclusions = BTreeSet::new();
        for (i, raw) in self.additional_exclusions.iter().enumerate() {
            additional_exclusions.insert(parse(&format!("target.additional_exclusions[{i}]"), raw)?);
        }

        Ok(TargetConfiguration {
            helper_contract: parse("target.helper_contract", &self.helper_contract)?,
            lens_contract: non_empty(&self.lens_contract)
                .map(|raw| parse("target.lens_contract", raw))
                .transpose()?,
            advertising_wallet: parse("target.advertising_wallet", &self.advertising_wallet)?,
            community_wallet: parse("target.community_wallet", &self.community_wallet)?,
            liquidity_pool: non_empty(&self.liquidity_pool)
                .map(|raw| parse("target.liquidity_pool", raw))
                .transpose()?,
            additional_exclusions,
            features: self.features,
        })
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// The whole setup document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub token: TokenIdentity,
    #[serde(default)]
    pub target: TargetSpec,
    #[serde(default)]
    pub policy: SetupPolicy,
}

impl SetupConfig {
    pub fn from_json(cfg: &Value) -> Result<Self> {
        serde_json::from_value(cfg.clone()).context("config does not match the setup schema")
    }
}
