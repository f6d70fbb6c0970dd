//! Shared fixtures for scenario tests.
//!
//! One token, one operator, one set of system addresses. Fixtures return
//! plain values; tests tweak them before building a [`SimLedger`].

use alloy_primitives::address;
use tsc_config::{resolve_profile, SetupConfig, TargetSpec, STAGING_NETWORK_ID};
use tsc_ledger::Mutation;
use tsc_ledger_sim::{SimHelper, SimLedger, SimState};
use tsc_schemas::{tenths, tokens, Address, FeatureFlag, FeatureSet, SetupPolicy, TokenIdentity};

pub const OPERATOR: Address = address!("8ba1f109551bD432803012645Ac136ddd64DBA72");
pub const TOKEN: Address = address!("0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82");
pub const HELPER: Address = address!("824730FE53a434E700D43Ac128264d580b0C105c");
pub const LENS: Address = address!("4a9640dc292F7025bD0D1410eEc6CE900020FEfd");
pub const ADVERTISING: Address = address!("5BD594887A6a99b991E56E2541785B61606063bF");
pub const COMMUNITY: Address = address!("3c4AA84c1e2177c18420E7F1cE70fa65fBC4Fd59");
pub const EXTRA: Address = address!("54D6442676a2B849a35a36341EB5BaBa7248db7d");
pub const POOL: Address = address!("16b9a82891338f9bA80E2D6970FddA79D1eb0daE");
pub const STRANGER: Address = address!("Ab5801a7D398351b8bE11C439e05C5B3259aeC9B");

pub const TOKEN_NAME: &str = "Millies";
pub const TOKEN_SYMBOL: &str = "MILLIES";

/// Checksummed string form, as an operator would write it in config.
pub fn hex(a: Address) -> String {
    a.to_checksum(None)
}

pub fn target_spec() -> TargetSpec {
    TargetSpec {
        helper_contract: hex(HELPER),
        lens_contract: Some(hex(LENS)),
        advertising_wallet: hex(ADVERTISING),
        community_wallet: hex(COMMUNITY),
        liquidity_pool: None,
        additional_exclusions: vec![hex(EXTRA)],
        features: FeatureSet::all_on(),
    }
}

pub fn setup_config() -> SetupConfig {
    SetupConfig {
        token: TokenIdentity {
            expected_name: Some(TOKEN_NAME.to_string()),
            expected_symbol: Some(TOKEN_SYMBOL.to_string()),
        },
        target: target_spec(),
        policy: SetupPolicy::default(),
    }
}

/// Freshly deployed token: nothing configured, degraded mode tripped because
/// no helper is bound, operator holds the whole supply. The helper contract
/// is deployed for this token and owned by the operator.
pub fn fresh_token(network_id: u64) -> SimState {
    let profile = resolve_profile(network_id);
    let mut s = SimState {
        network_id,
        operator: OPERATOR,
        owner: OPERATOR,
        token_address: TOKEN,
        name: TOKEN_NAME.to_string(),
        symbol: TOKEN_SYMBOL.to_string(),
        total_supply: tokens(1_000_000_000),
        router: profile.router,
        degraded_mode: true,
        degraded_mode_activated_at: 1_714_564_800,
        ..SimState::default()
    };
    s.native_balances.insert(OPERATOR, tenths(10));
    s.token_balances.insert(OPERATOR, tokens(1_000_000_000));
    s.helper_contracts.insert(
        HELPER,
        SimHelper {
            owner: OPERATOR,
            token: TOKEN,
        },
    );
    // a fresh token excludes the router from fees until told otherwise
    s.fee_excluded.insert(profile.router);
    s
}

pub fn fresh_staging_token() -> SimState {
    fresh_token(STAGING_NETWORK_ID)
}

/// Everything the default config asks for is already in place.
pub fn converged_token(network_id: u64) -> SimState {
    let profile = resolve_profile(network_id);
    let mut s = fresh_token(network_id);
    s.helper = HELPER;
    s.advertising_wallet = ADVERTISING;
    s.community_wallet = COMMUNITY;
    s.degraded_mode = false;
    s.fee_excluded.remove(&profile.router);
    s.cooldown_excluded.insert(profile.router);
    for a in [HELPER, LENS, ADVERTISING, COMMUNITY, EXTRA] {
        s.fee_excluded.insert(a);
        s.cooldown_excluded.insert(a);
    }
    s.features.extend(FeatureFlag::ALL);
    for w in [ADVERTISING, COMMUNITY] {
        s.token_balances.insert(w, profile.funding_amount);
    }
    s
}

pub fn converged_staging_token() -> SimState {
    converged_token(STAGING_NETWORK_ID)
}

pub fn ledger(state: SimState) -> SimLedger {
    SimLedger::new(state)
}

/// Operation names of `ops`, for compact assertions.
pub fn op_names(ops: &[Mutation]) -> Vec<&'static str> {
    ops.iter().map(Mutation::name).collect()
}

/// Phase 3/4 mutations: fee and cooldown exclusion changes.
pub fn is_exclusion_op(m: &Mutation) -> bool {
    matches!(
        m,
        Mutation::SetFeeExclusion { .. } | Mutation::SetCooldownExclusion { .. }
    )
}
