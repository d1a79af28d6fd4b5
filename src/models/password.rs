//! This file defines the type that handles password hashing and verification.
//! `PasswordHash` wraps a bcrypt hash so that raw and hashed passwords cannot
//! be mixed up at compile time.

use std::fmt::Display;

use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The work factor used for hashing passwords.
    ///
    /// Verification time doubles with each increment, so this is a trade-off
    /// between log-in latency and resistance to brute-forcing.
    pub const HASH_COST: u32 = 10;

    /// Hash a raw password string with the specified bcrypt `cost`.
    ///
    /// Pass in [PasswordHash::HASH_COST] outside of tests. Lower costs are
    /// only appropriate for tests that would otherwise spend most of their
    /// time hashing.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, Error> {
        match hash(raw_password, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(e) => Err(Error::HashingError(e.to_string())),
        }
    }

    /// Create a new `PasswordHash` from a string that is already a bcrypt hash.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid password
    /// hash. This function has `_unchecked` in the name but is not `unsafe`,
    /// because an invalid hash may cause incorrect behaviour but will not
    /// affect memory safety.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Check that `raw_password` matches the stored password.
    ///
    /// # Errors
    ///
    /// This function will return an error if the stored hash could not be
    /// parsed by the hashing library.
    pub fn verify(&self, raw_password: &str) -> Result<bool, Error> {
        verify(raw_password, &self.0).map_err(|e| Error::HashingError(e.to_string()))
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
