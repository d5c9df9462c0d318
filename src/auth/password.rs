//! Argon2id password hashing and verification.

use std::sync::{Arc, OnceLock};

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::AppError;

/// CredentialHasher
///
/// One-way password hashing. The login path only ever calls `verify`.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;

    /// `Ok(false)` for a wrong password, `Err` only when the stored hash is unusable.
    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AppError>;

    /// Does the work of one `verify` against a fixed hash. Used when the account does not
    /// exist, so the response time does not tell callers which emails are registered.
    fn verify_decoy(&self, password: &str) -> Result<(), AppError>;
}

pub type HasherState = Arc<dyn CredentialHasher>;

const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Argon2Hasher
///
/// Argon2id with PHC-formatted output. `Default` uses the crate's production parameters
/// (19 MiB, 2 iterations); `with_params` lets tests trade strength for speed.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
    // Hashed with `params` on first use, so decoy checks cost the same as real ones.
    decoy_hash: Arc<OnceLock<String>>,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
            decoy_hash: Arc::default(),
        }
    }
}

impl Argon2Hasher {
    pub fn with_params(memory_kib: u32, iterations: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AppError::internal(format!("invalid argon2 params: {e}")))?;
        Ok(Self {
            params,
            decoy_hash: Arc::default(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AppError::internal(format!("invalid password hash format: {e}")))?;

        // Parameters are read from the PHC string, so hashes made with other costs still verify.
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "password verification failed: {e}"
            ))),
        }
    }

    fn verify_decoy(&self, password: &str) -> Result<(), AppError> {
        let decoy = match self.decoy_hash.get() {
            Some(hash) => hash,
            None => {
                let hash = self.hash(DECOY_PASSWORD)?;
                self.decoy_hash.get_or_init(|| hash)
            }
        };
        self.verify(password, decoy).map(|_| ())
    }
}
