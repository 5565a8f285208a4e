//! Password hashing and API token generation.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::{RngCore, rngs::OsRng};
use serde::Deserialize;

use crate::{EngineError, ResultEngine};

const OUTPUT_LENGTH: usize = 32;
const TOKEN_BYTES: usize = 20;

/// Hash and verify credentials, issue opaque API tokens.
pub trait CredentialService: Send + Sync {
    fn hash(&self, password: &str) -> ResultEngine<String>;

    /// `false` for a wrong password and for a hash that cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> bool;

    fn generate_token(&self) -> String;
}

/// Argon2 cost parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            memory_cost: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id credential service.
#[derive(Debug)]
pub struct Argon2Credentials {
    params: Params,
}

impl Argon2Credentials {
    pub fn new(config: &CredentialsConfig) -> ResultEngine<Self> {
        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(OUTPUT_LENGTH),
        )
        .map_err(|err| EngineError::Credential(err.to_string()))?;

        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialService for Argon2Credentials {
    fn hash(&self, password: &str) -> ResultEngine<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| EngineError::Credential(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.hasher()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn generate_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Argon2Credentials {
        Argon2Credentials::new(&CredentialsConfig {
            memory_cost: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_verifies_only_the_original_password() {
        let credentials = service();
        let hash = credentials.hash("s3cret").unwrap();

        assert_ne!(hash, "s3cret");
        assert!(credentials.verify("s3cret", &hash));
        assert!(!credentials.verify("S3cret", &hash));
    }

    #[test]
    fn unparsable_hash_never_verifies() {
        assert!(!service().verify("admin", "admin"));
    }

    #[test]
    fn tokens_are_forty_hex_chars_and_fresh() {
        let credentials = service();
        let a = credentials.generate_token();
        let b = credentials.generate_token();

        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let err = Argon2Credentials::new(&CredentialsConfig {
            memory_cost: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::Credential(_)));
    }
}
