// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Password hashing with PBKDF2-HMAC-SHA256.
//!
//! Hashes are stored as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with
//! unpadded standard base64 for salt and hash, so the iteration count can be
//! raised later without invalidating existing accounts.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::num::NonZeroU32;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;
static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Errors from password hashing.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Iteration count must be non-zero")]
    ZeroIterations,

    #[error("Random number generator failure")]
    Rng,

    #[error("Malformed password hash")]
    Malformed,
}

/// Hashes and verifies passwords. Cheap to clone.
#[derive(Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Result<Self, PasswordError> {
        Ok(Self {
            iterations: NonZeroU32::new(iterations).ok_or(PasswordError::ZeroIterations)?,
            rng: SystemRandom::new(),
        })
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| PasswordError::Rng)?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(ALGORITHM, self.iterations, &salt, password.as_bytes(), &mut hash);

        Ok(format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(hash)
        ))
    }

    /// Check `password` against a stored hash. Comparison is constant-time.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordError> {
        let parsed = ParsedHash::parse(stored)?;
        Ok(pbkdf2::verify(
            ALGORITHM,
            parsed.iterations,
            &parsed.salt,
            password.as_bytes(),
            &parsed.hash,
        )
        .is_ok())
    }

    /// Burn the same CPU as a real verification.
    ///
    /// Used when the username does not exist so response timing does not
    /// reveal which half of the credential was wrong.
    pub fn dummy_verify(&self, password: &str) {
        let mut out = [0u8; HASH_LEN];
        pbkdf2::derive(
            ALGORITHM,
            self.iterations,
            &[0u8; SALT_LEN],
            password.as_bytes(),
            &mut out,
        );
    }
}

struct ParsedHash {
    iterations: NonZeroU32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl ParsedHash {
    fn parse(stored: &str) -> Result<Self, PasswordError> {
        let parts: Vec<&str> = stored.split('$').collect();
        let [scheme, iterations, salt, hash] = parts.as_slice() else {
            return Err(PasswordError::Malformed);
        };
        if *scheme != SCHEME {
            return Err(PasswordError::Malformed);
        }

        let iterations = iterations
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(PasswordError::Malformed)?;
        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|_| PasswordError::Malformed)?;
        let hash = STANDARD_NO_PAD
            .decode(hash)
            .map_err(|_| PasswordError::Malformed)?;
        if hash.len() != HASH_LEN {
            return Err(PasswordError::Malformed);
        }

        Ok(Self {
            iterations,
            salt,
            hash,
        })
    }
}
