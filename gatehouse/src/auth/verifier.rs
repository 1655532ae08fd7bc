//! Credential verification against the external user store.

use std::sync::Arc;

use tracing::instrument;

use crate::auth::password::{self, Argon2Params};
use crate::errors::{Error, Result};
use crate::store::UserStore;
use crate::types::Identity;

/// Upper bound on identifier and secret length. Anything longer is treated as
/// a mismatch rather than a distinct validation error.
const MAX_INPUT_LEN: usize = 1024;

/// Verifies a presented (identifier, secret) pair against the stored hash.
///
/// Read-only: a successful verification returns the matched [`Identity`] and
/// nothing else. Session establishment is the caller's concern.
///
/// # Timing
///
/// The lookup-miss path and the hash-mismatch path both return
/// [`Error::InvalidCredentials`] and both perform a full Argon2 verification:
/// unknown identifiers (and records without a stored hash) are verified
/// against a throwaway hash computed at construction time, so the two failure
/// paths are indistinguishable to the caller in both value and timing.
pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
    fallback_hash: String,
}

impl CredentialVerifier {
    /// Create a verifier over `store` with default Argon2 parameters.
    pub fn new(store: Arc<dyn UserStore>) -> Result<Self> {
        Self::with_params(store, Argon2Params::default())
    }

    /// Create a verifier whose fallback hash uses the given parameters.
    ///
    /// The fallback must cost the same as real stored hashes, so pass the
    /// same parameters used when provisioning user records.
    pub fn with_params(store: Arc<dyn UserStore>, params: Argon2Params) -> Result<Self> {
        let fallback_hash = password::hash_string_with_params(&password::generate_token(), Some(params))?;
        Ok(Self { store, fallback_hash })
    }

    /// Check `secret` against the stored credential for `identifier`.
    ///
    /// Returns the matched identity, or [`Error::InvalidCredentials`] for
    /// unknown identifiers and wrong secrets alike.
    #[instrument(skip_all)]
    pub async fn verify(&self, identifier: &str, secret: &str) -> Result<Identity> {
        let well_formed = !identifier.is_empty()
            && !secret.is_empty()
            && identifier.len() <= MAX_INPUT_LEN
            && secret.len() <= MAX_INPUT_LEN;

        let record = if well_formed {
            self.store.find_by_identifier(identifier).await?
        } else {
            None
        };

        // Real hash when we have one, fallback otherwise: every path pays for
        // a full verification.
        let stored_hash = record
            .as_ref()
            .and_then(|r| r.password_hash.clone())
            .unwrap_or_else(|| self.fallback_hash.clone());
        let has_stored_hash = record.as_ref().is_some_and(|r| r.password_hash.is_some());

        // Verify on a blocking thread to avoid stalling the async runtime
        let presented = secret.to_string();
        let matched = tokio::task::spawn_blocking(move || password::verify_string(&presented, &stored_hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn credential verification task: {e}"),
            })??;

        match record {
            Some(record) if matched && has_stored_hash => Ok(Identity::from(&record)),
            _ => Err(Error::InvalidCredentials),
        }
    }
}
