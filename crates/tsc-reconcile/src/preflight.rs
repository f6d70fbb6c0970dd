//! Identity preflight: who is submitting, against which token.

use futures_util::join;
use tracing::{info, warn};
use tsc_ledger::{Ledger, Query, ReadFailure};
use tsc_schemas::{short_addr, Address, NetworkProfile, TokenIdentity};

use crate::error::PreflightFailure;
use crate::types::Warning;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreflightReport {
    pub operator: Address,
    pub warnings: Vec<Warning>,
}

/// Reads only. Token owner, the configured helper's owner and token,
/// expected name/symbol and operator gas balance are hard requirements; a
/// router mismatch is a warning.
pub async fn preflight<L: Ledger + ?Sized>(
    ledger: &L,
    profile: &NetworkProfile,
    token: &TokenIdentity,
    helper: Address,
) -> Result<PreflightReport, PreflightFailure> {
    let (operator, owner, token_address, helper_owner, helper_token, name, symbol, router) = join!(
        ledger.operator(),
        ledger.owner(),
        ledger.token_address(),
        ledger.helper_owner(helper),
        ledger.helper_token(helper),
        ledger.name(),
        ledger.symbol(),
        ledger.router(),
    );

    let operator = required(Query::Operator, operator)?;
    let owner = required(Query::Owner, owner)?;
    if owner != operator {
        return Err(PreflightFailure::OwnershipMismatch { owner, operator });
    }

    let helper_owner = required(Query::HelperOwner(helper), helper_owner)?;
    if helper_owner != operator {
        return Err(PreflightFailure::HelperOwnershipMismatch {
            helper,
            owner: helper_owner,
            operator,
        });
    }
    let token_address = required(Query::TokenAddress, token_address)?;
    let helper_token = required(Query::HelperToken(helper), helper_token)?;
    if helper_token != token_address {
        return Err(PreflightFailure::HelperTokenMismatch {
            helper,
            helper_token,
            token: token_address,
        });
    }

    let name = required(Query::Name, name)?;
    let symbol = required(Query::Symbol, symbol)?;
    expect_identity("name", token.expected_name.as_deref(), &name)?;
    expect_identity("symbol", token.expected_symbol.as_deref(), &symbol)?;

    let balance = required(
        Query::NativeBalance(operator),
        ledger.native_balance(operator).await,
    )?;
    if balance < profile.min_operator_balance {
        return Err(PreflightFailure::InsufficientGasBalance {
            balance,
            required: profile.min_operator_balance,
        });
    }

    let mut warnings = Vec::new();
    match router {
        Ok(r) if r != profile.router => {
            warn!(
                token_router = %short_addr(&r),
                network_router = %short_addr(&profile.router),
                "token router differs from network router"
            );
            warnings.push(Warning::RouterMismatch {
                configured: r,
                expected: profile.router,
            });
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "token router unreadable; skipping router comparison"),
    }

    info!(
        operator = %short_addr(&operator),
        helper = %short_addr(&helper),
        name = %name,
        symbol = %symbol,
        "preflight passed"
    );
    Ok(PreflightReport { operator, warnings })
}

fn required<T>(q: Query, r: Result<T, tsc_ledger::LedgerError>) -> Result<T, PreflightFailure> {
    r.map_err(|e| PreflightFailure::Unreadable(ReadFailure::new(q, &e)))
}

fn expect_identity(field: &str, expected: Option<&str>, observed: &str) -> Result<(), PreflightFailure> {
    match expected {
        Some(want) if want != observed => Err(PreflightFailure::IdentityMismatch {
            field: field.to_string(),
            expected: want.to_string(),
            observed: observed.to_string(),
        }),
        _ => Ok(()),
    }
}
