use rand::Rng;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Random 16-byte salt, hex encoded for storage.
pub fn make_salt() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}

/// bcrypt hash of `password` using the stored hex salt.
pub fn hash_password(password: &str, salt: &str, cost: u32) -> AppResult<String> {
    let salt: [u8; 16] = hex::decode(salt)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| AppError::Internal("stored salt is not 16 hex-encoded bytes".into()))?;

    let parts = bcrypt::hash_with_salt(password, cost, salt)?;
    Ok(parts.format_for_version(bcrypt::Version::TwoB))
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    bcrypt::verify(password, hashed).unwrap_or(false)
}
