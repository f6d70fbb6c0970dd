//! Network profile resolution.
//!
//! Exact match on the ledger's reported network id. Anything unrecognised gets
//! the fallback profile: staging-scale funding, no gas ceiling override, and
//! never the primary router or primary funding amounts.

use alloy_primitives::address;
use tsc_schemas::{tenths, tokens, NetworkProfile, ProfileKind};

pub const PRIMARY_NETWORK_ID: u64 = 56;
pub const STAGING_NETWORK_ID: u64 = 97;

pub fn resolve_profile(network_id: u64) -> NetworkProfile {
    match network_id {
        PRIMARY_NETWORK_ID => primary(),
        STAGING_NETWORK_ID => staging(),
        other => fallback(other),
    }
}

/// Profile for a ledger whose network id could not be read at all.
pub fn unidentified_profile() -> NetworkProfile {
    NetworkProfile {
        name: "Unidentified network".to_string(),
        ..fallback(0)
    }
}

pub fn known_profiles() -> Vec<NetworkProfile> {
    vec![primary(), staging()]
}

fn primary() -> NetworkProfile {
    NetworkProfile {
        kind: ProfileKind::Primary,
        network_id: PRIMARY_NETWORK_ID,
        name: "BSC Mainnet".to_string(),
        router: address!("10ED43C718714eb63d5aA57B78B54704E256024E"),
        min_operator_balance: tenths(5),
        funding_amount: tokens(70_000_000),
        gas_ceiling_per_operation: Some(2_000_000),
        safety_delay_ms: 3_000,
    }
}

fn staging() -> NetworkProfile {
    NetworkProfile {
        kind: ProfileKind::Staging,
        network_id: STAGING_NETWORK_ID,
        name: "BSC Testnet".to_string(),
        router: address!("D99D1c33F9fC3444f8101754aBC46c52416550D1"),
        min_operator_balance: tenths(1),
        funding_amount: tokens(10_000_000),
        gas_ceiling_per_operation: None,
        safety_delay_ms: 0,
    }
}

fn fallback(network_id: u64) -> NetworkProfile {
    NetworkProfile {
        kind: ProfileKind::Fallback,
        network_id,
        name: format!("Unrecognized network {network_id}"),
        ..staging()
    }
}
