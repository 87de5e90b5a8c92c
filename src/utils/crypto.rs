use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{AppError, AppResult};

const VERSION_PREFIX: &str = "v1:";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 120_000;

/// Hashes a password as `v1:` + base64(salt || PBKDF2-SHA256 digest).
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let hash = derive_hash(password, &salt);

    let mut payload = Vec::with_capacity(SALT_LEN + HASH_LEN);
    payload.extend_from_slice(&salt);
    payload.extend_from_slice(&hash);

    format!("{VERSION_PREFIX}{}", Base64.encode(payload))
}

/// Checks `password` against a stored hash. A malformed stored value is an
/// error, a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let encoded = stored
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| AppError::other("unsupported password hash format"))?;

    let decoded = Base64
        .decode(encoded.as_bytes())
        .map_err(|_| AppError::other("password hash is corrupted"))?;

    if decoded.len() != SALT_LEN + HASH_LEN {
        return Err(AppError::other("password hash has an invalid length"));
    }

    let (salt, expected) = decoded.split_at(SALT_LEN);
    let actual = derive_hash(password, salt);
    Ok(constant_time_eq(&actual, expected))
}

fn derive_hash(password: &str, salt: &[u8]) -> [u8; HASH_LEN] {
    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut hash);
    hash
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
