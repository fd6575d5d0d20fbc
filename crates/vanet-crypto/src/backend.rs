// ============================================
// File: crates/vanet-crypto/src/backend.rs
// ============================================
//! # Backend Initialisation
//!
//! ## Creation Reason
//! Cryptographic primitives are initialised once per process and shared
//! read-only afterwards. The pure-Rust backend needs no global setup, so
//! initialisation is a known-answer self test whose outcome is cached.
//!
//! ## ⚠️ Important Note for Next Developer
//! - A failed self test is permanent for the life of the process
//! - Every `CryptoLayer` constructor calls `ensure_initialized()`
//!
//! ## Last Modified
//! v0.1.0 - Initial self test

use std::sync::OnceLock;

use tracing::{error, info};

use crate::error::{CryptoError, Result};
use crate::hash::sha256;

/// SHA-256("abc") from FIPS 180-2, appendix B.1.
const SHA256_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

static SELF_TEST: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Runs the backend self test on first call and reports its cached result.
///
/// # Errors
/// Returns `BackendInit` if the known-answer test failed.
pub fn ensure_initialized() -> Result<()> {
    SELF_TEST
        .get_or_init(run_self_test)
        .clone()
        .map_err(CryptoError::backend_init)
}

fn run_self_test() -> std::result::Result<(), String> {
    let got = hex::encode(sha256(b"abc"));
    if got == SHA256_ABC {
        info!("Cryptographic backend self test passed");
        Ok(())
    } else {
        error!(digest = %got, "SHA-256 known-answer test failed");
        Err("SHA-256 known-answer test mismatch".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialisation_is_idempotent() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok());
    }
}
