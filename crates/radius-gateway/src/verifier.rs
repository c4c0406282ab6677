//! Credential verification seam
//!
//! The gateway never stores or caches credentials; every Access-Request that
//! passes the username and domain checks costs one call to a
//! [`CredentialVerifier`].

use async_trait::async_trait;
use std::collections::HashMap;

/// Outcome of a single verification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The upstream accepted the credentials
    Accepted,
    /// The upstream explicitly refused the credentials
    Rejected,
    /// The upstream could not be asked (unreachable, timeout, protocol error)
    TransportError(String),
}

/// Checks a username/password pair against an external provider
///
/// One call is one independent attempt: no retries, no caching.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> VerificationResult;
}

/// In-memory verifier for tests and local setups
#[derive(Debug, Default)]
pub struct StaticVerifier {
    users: HashMap<String, String>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(username.into(), password.into());
    }
}

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, username: &str, password: &str) -> VerificationResult {
        match self.users.get(username) {
            Some(expected) if expected == password => VerificationResult::Accepted,
            _ => VerificationResult::Rejected,
        }
    }
}
