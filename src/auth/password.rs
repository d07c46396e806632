//! Password hashing
//!
//! Argon2id with a configurable time cost. The comparison is the slow,
//! salted hash verification itself; callers get no other timing signal.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Default argon2 memory cost in KiB.
const MEMORY_COST_KIB: u32 = 19456;

#[derive(Clone, Debug)]
pub struct PasswordHasher {
    time_cost: u32,
}

impl PasswordHasher {
    pub fn new(time_cost: u32) -> Self {
        Self {
            time_cost: time_cost.max(1),
        }
    }

    #[cfg(not(feature = "test-fast-hasher"))]
    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(MEMORY_COST_KIB, self.time_cost, 1, None)
            .map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    #[cfg(feature = "test-fast-hasher")]
    fn argon2(&self) -> Result<Argon2<'static>> {
        // Cheapest parameters argon2 accepts, for fast test runs only.
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash_string = self
            .argon2()?
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify(&self, plain: &str, target_hash: &str) -> Result<bool> {
        let password_hash = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
        Ok(self
            .argon2()?
            .verify_password(plain.as_bytes(), &password_hash)
            .is_ok())
    }
}
