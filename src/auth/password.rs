//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant. The PHC-formatted output embeds the salt and
//! cost parameters, so verification needs nothing but the stored string.

use std::sync::OnceLock;

use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::types::StorehouseError;

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// One-way, salted credential hasher
#[derive(Debug)]
pub struct CredentialHasher {
    params: Params,
    /// Hash used to burn equivalent time when the account does not exist
    dummy_hash: OnceLock<String>,
}

impl CredentialHasher {
    pub fn new(config: HasherConfig) -> Result<Self, StorehouseError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| StorehouseError::Config(format!("Invalid argon2 parameters: {e}")))?;

        Ok(Self {
            params,
            dummy_hash: OnceLock::new(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password using Argon2id
    ///
    /// Returns the PHC-formatted hash string that includes the salt and parameters.
    pub fn hash(&self, password: &str) -> Result<String, StorehouseError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StorehouseError::Internal(format!("Failed to hash password: {e}")))
    }

    /// Verify a password against a stored hash
    ///
    /// A mismatch is `Ok(false)`. A hash that cannot be parsed or verified
    /// (foreign algorithm, bad parameters) is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, StorehouseError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            StorehouseError::Internal(format!("Invalid password hash format: {e}"))
        })?;

        // Cost parameters come from the PHC string, not from self
        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(StorehouseError::Internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }

    /// Spend one verification's worth of work and report a mismatch
    pub fn verify_against_dummy(&self, password: &str) -> Result<bool, StorehouseError> {
        let hash = match self.dummy_hash.get() {
            Some(hash) => hash.clone(),
            None => {
                let hash = self.hash("storehouse-dummy-credential")?;
                self.dummy_hash.get_or_init(|| hash).clone()
            }
        };
        self.verify(password, &hash).map(|_| false)
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
            dummy_hash: OnceLock::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = CredentialHasher::default();
        let password = "correct-horse-battery-staple";
        let hash = hasher.hash(password).unwrap();

        // Hash should be in PHC format
        assert!(hash.starts_with("$argon2id$"));

        assert!(hasher.verify(password, &hash).unwrap());
        assert!(!hasher.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_different_salts() {
        let hasher = CredentialHasher::default();
        let password = "same-password";
        let hash1 = hasher.hash(password).unwrap();
        let hash2 = hasher.hash(password).unwrap();

        // Same password should produce different hashes (different salts)
        assert_ne!(hash1, hash2);

        assert!(hasher.verify(password, &hash1).unwrap());
        assert!(hasher.verify(password, &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let hasher = CredentialHasher::default();
        assert!(hasher.verify("password", "not-a-valid-hash").is_err());
    }

    #[test]
    fn test_foreign_algorithm_is_error_not_mismatch() {
        let hasher = CredentialHasher::default();
        let scrypt = "$scrypt$ln=16,r=8,p=1$aM15713r3Xsvxbi31lqr1Q$nFNh2CVHVjNldFVKDHDlm4CbdRSCdEBsjjJxD+iCs5E";
        let result = hasher.verify("password", scrypt);
        assert!(matches!(result, Err(StorehouseError::Internal(_))), "got {result:?}");
    }

    #[test]
    fn test_custom_cost_is_embedded() {
        let hasher = CredentialHasher::new(HasherConfig {
            memory_kib: 8 * 1024,
            iterations: 3,
            parallelism: 1,
        })
        .unwrap();
        let hash = hasher.hash("password123").unwrap();
        assert!(hash.contains("m=8192,t=3,p=1"));

        // A default-configured hasher still verifies it
        assert!(CredentialHasher::default().verify("password123", &hash).unwrap());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = CredentialHasher::new(HasherConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        });
        assert!(matches!(result, Err(StorehouseError::Config(_))));
    }

    #[test]
    fn test_dummy_verification_never_matches() {
        let hasher = CredentialHasher::default();
        assert!(!hasher.verify_against_dummy("storehouse-dummy-credential").unwrap());
        assert!(!hasher.verify_against_dummy("anything").unwrap());
    }
}
