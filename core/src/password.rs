use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::OsRng;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Argon2id work factors. Stored hashes carry their own parameters, so
/// changing these only affects newly hashed passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Verified against when a username does not exist, so a miss costs the
/// same Argon2 work as a wrong password.
const ABSENT_USER_PASSWORD: &str = "fitmeal-absent-user";

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    absent_user_hash: String,
}

impl CredentialHasher {
    pub fn new(params: HashParams) -> Result<Self> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| Error::Config(format!("invalid password hashing parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let absent_user_hash = argon2
            .hash_password(ABSENT_USER_PASSWORD.as_bytes(), &salt)
            .map_err(|e| Error::Hash(e.to_string()))?
            .to_string();
        Ok(Self {
            argon2,
            absent_user_hash,
        })
    }

    /// Hash `raw` with a fresh random salt, returning a PHC string.
    pub fn hash(&self, raw: Option<&str>) -> Result<String> {
        let raw = match raw {
            Some(p) if !p.is_empty() => p,
            _ => {
                return Err(Error::InvalidCredential(
                    "Password must not be empty".to_string(),
                ));
            }
        };
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| Error::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Constant-time check of `raw` against a stored PHC string. A stored
    /// value that does not parse never matches.
    #[must_use]
    pub fn verify(&self, raw: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2.verify_password(raw.as_bytes(), &parsed).is_ok()
    }

    /// Full-cost verification for a login whose username is unknown. The
    /// outcome is discarded.
    pub fn verify_absent(&self, raw: &str) {
        let _ = self.verify(raw, &self.absent_user_hash);
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(HashParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash(Some("password")).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, "password");
        assert!(hasher.verify("password", &hash));
        assert!(!hasher.verify("passwordx", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = test_hasher();
        let a = hasher.hash(Some("same")).unwrap();
        let b = hasher.hash(Some("same")).unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same", &a));
        assert!(hasher.verify("same", &b));
    }

    #[test]
    fn test_empty_or_missing_password_rejected() {
        let hasher = test_hasher();
        assert!(matches!(
            hasher.hash(Some("")),
            Err(Error::InvalidCredential(_))
        ));
        assert!(matches!(hasher.hash(None), Err(Error::InvalidCredential(_))));
    }

    #[test]
    fn test_garbage_stored_hash_never_matches() {
        let hasher = test_hasher();
        assert!(!hasher.verify("password", "not-a-hash"));
        assert!(!hasher.verify("", ""));
    }

    #[test]
    fn test_verify_uses_params_from_stored_hash() {
        let strong = CredentialHasher::new(HashParams {
            memory_kib: 128,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let hash = strong.hash(Some("rotate-me")).unwrap();
        assert!(test_hasher().verify("rotate-me", &hash));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let err = CredentialHasher::new(HashParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_verify_absent_pays_configured_cost() {
        let hasher = test_hasher();
        hasher.verify_absent("password");
        assert!(hasher.verify(ABSENT_USER_PASSWORD, &hasher.absent_user_hash));

        let parsed = PasswordHash::new(&hasher.absent_user_hash).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert_eq!(parsed.params.get_decimal("m"), Some(64));
        assert_eq!(parsed.params.get_decimal("t"), Some(1));
    }

    #[test]
    fn test_params_reject_unknown_keys() {
        assert!(serde_json::from_str::<HashParams>(r#"{"memory": 65536}"#).is_err());
        let partial: HashParams = serde_json::from_str(r#"{"iterations": 3}"#).unwrap();
        assert_eq!(partial.iterations, 3);
        assert_eq!(partial.memory_kib, 19_456);
    }

    #[test]
    fn test_default_params() {
        let params = HashParams::default();
        assert_eq!(params.memory_kib, 19_456);
        assert_eq!(params.iterations, 2);
        assert_eq!(params.parallelism, 1);
        assert!(CredentialHasher::new(params).is_ok());
    }
}
