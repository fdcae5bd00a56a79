//! # Identities
//!
//! Two kinds of identity flow through the ledger:
//!
//! - [`Principal`] — an account able to initiate operations and own vaults.
//! - [`ContractId`] — an external callback target that may receive a
//!   release notification.
//!
//! Both are opaque strings as far as the ledger is concerned. The host
//! decides what they look like (hex public keys, account addresses, ...).
//! They are distinct types, so a principal can't be passed
//! where a callback target is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing identities out of user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity must not be empty")]
    Empty,

    #[error("identity must not contain whitespace: {0:?}")]
    Whitespace(String),
}

fn validate(s: &str) -> Result<(), IdentityError> {
    if s.is_empty() {
        return Err(IdentityError::Empty);
    }
    if s.chars().any(char::is_whitespace) {
        return Err(IdentityError::Whitespace(s.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// An account identity that can own vaults and sign operations.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap an identity string. No validation; use [`FromStr`] for user input.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes, used as the sled key for per-principal tables.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for Principal {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ContractId
// ---------------------------------------------------------------------------

/// Identity of an external callback target.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for ContractId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_principal() {
        let p: Principal = "alice".parse().unwrap();
        assert_eq!(p.as_str(), "alice");
        assert_eq!(p.to_string(), "alice");
    }

    #[test]
    fn empty_principal_rejected() {
        assert_eq!("".parse::<Principal>(), Err(IdentityError::Empty));
    }

    #[test]
    fn whitespace_contract_id_rejected() {
        assert!(matches!(
            "callback one".parse::<ContractId>(),
            Err(IdentityError::Whitespace(_))
        ));
    }

    #[test]
    fn principal_serializes_as_plain_string() {
        let p = Principal::new("bob");
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"bob\"");
    }
}
