//! Treasury funding rules.
//!
//! The allocator decides; the engine executes. Recipients are the bound
//! wallets whose balance is exactly zero. A funded wallet is never topped up.
//! With no recipients the treasury is not consulted at all. Otherwise the
//! threshold is all-or-nothing: a treasury below 2 x amount disburses nothing
//! and each recipient reports a funding failure (recoverable; can be done out
//! of band later).

use tsc_schemas::U256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FundingAllocator {
    /// Per-recipient amount, token base units.
    pub amount: U256,
}

impl FundingAllocator {
    pub fn new(amount: U256) -> Self {
        Self { amount }
    }

    /// Minimum treasury balance before any disbursement: two recipients'
    /// worth, whatever the recipient count.
    pub fn required_treasury(&self) -> U256 {
        self.amount.saturating_mul(U256::from(2u64))
    }

    pub fn admits(&self, treasury: U256) -> bool {
        treasury >= self.required_treasury()
    }

    pub fn needs_funding(balance: U256) -> bool {
        balance.is_zero()
    }
}
