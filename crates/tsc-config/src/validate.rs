//! Address validation for operator-supplied configuration.
//!
//! Runs before anything touches the ledger. There are no safe defaults for an
//! unset identity, so any failure here is fatal to the run.

use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Substrings marking a value the operator never filled in.
const PLACEHOLDER_MARKERS: &[&str] = &["YOUR_"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Empty, template marker, or the zero address.
    Placeholder,
    /// Not `0x` + 40 hex digits, or mixed case with a bad EIP-55 checksum.
    MalformedAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub label: String,
    pub value: String,
    pub kind: FailureKind,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Placeholder => {
                write!(f, "{}: placeholder value '{}'", self.label, self.value)
            }
            FailureKind::MalformedAddress => {
                write!(f, "{}: invalid address format '{}'", self.label, self.value)
            }
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// Validate every labeled entry. Empty result = all valid.
pub fn validate_addresses<'a, I>(entries: I) -> Vec<ValidationFailure>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    entries
        .into_iter()
        .filter_map(|(label, raw)| {
            check_address(raw).err().map(|kind| ValidationFailure {
                label: label.to_string(),
                value: raw.to_string(),
                kind,
            })
        })
        .collect()
}

/// Parse one address under the strict rules.
///
/// All-lowercase and all-uppercase hex are accepted without a checksum;
/// mixed case must match the EIP-55 checksum exactly.
pub fn check_address(raw: &str) -> Result<Address, FailureKind> {
    let t = raw.trim();
    if t.is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| t.contains(m)) {
        return Err(FailureKind::Placeholder);
    }

    let body = t.strip_prefix("0x").ok_or(FailureKind::MalformedAddress)?;
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FailureKind::MalformedAddress);
    }

    let addr: Address = t.parse().map_err(|_| FailureKind::MalformedAddress)?;
    if addr == Address::ZERO {
        return Err(FailureKind::Placeholder);
    }

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && addr.to_checksum(None)[2..] != *body {
        return Err(FailureKind::MalformedAddress);
    }

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTER: &str = "0x10ED43C718714eb63d5aA57B78B54704E256024E";

    #[test]
    fn checksummed_address_is_accepted() {
        assert!(check_address(ROUTER).is_ok());
    }

    #[test]
    fn single_case_skips_checksum() {
        assert!(check_address(&ROUTER.to_lowercase()).is_ok());
        let upper = format!("0x{}", ROUTER[2..].to_uppercase());
        assert!(check_address(&upper).is_ok());
    }

    #[test]
    fn broken_checksum_is_malformed() {
        // flip the case of one letter
        let bad = ROUTER.replacen("ED", "eD", 1);
        assert_eq!(check_address(&bad), Err(FailureKind::MalformedAddress));
    }

    #[test]
    fn zero_and_template_values_are_placeholders() {
        assert_eq!(
            check_address("0x0000000000000000000000000000000000000000"),
            Err(FailureKind::Placeholder)
        );
        assert_eq!(check_address("YOUR_HELPER_ADDRESS"), Err(FailureKind::Placeholder));
        assert_eq!(check_address("  "), Err(FailureKind::Placeholder));
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert_eq!(check_address("0x1234"), Err(FailureKind::MalformedAddress));
        assert_eq!(
            check_address("10ED43C718714eb63d5aA57B78B54704E256024E"),
            Err(FailureKind::MalformedAddress)
        );
    }

    #[test]
    fn failures_carry_labels_in_input_order() {
        let failures = validate_addresses([
            ("helper_contract", "YOUR_HELPER"),
            ("router", ROUTER),
            ("community_wallet", "0xnothex"),
        ]);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].label, "helper_contract");
        assert_eq!(failures[0].kind, FailureKind::Placeholder);
        assert_eq!(failures[1].label, "community_wallet");
        assert_eq!(failures[1].kind, FailureKind::MalformedAddress);
    }
}
