use chrono::Utc;
use jsonwebtoken::errors::{Error, ErrorKind};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// Bearer credential payload. `sub` is the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

fn secret(config: &AuthConfig) -> Result<&[u8], Error> {
    match config.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => Ok(secret.as_bytes()),
        _ => Err(ErrorKind::InvalidKeyFormat.into()),
    }
}

pub fn issue_token(config: &AuthConfig, user_id: &str) -> Result<String, Error> {
    let now = Utc::now();
    let expires = config
        .token_lifetime()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| Error::from(ErrorKind::MissingRequiredClaim("exp".to_string())))?;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expires.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret(config)?),
    )
}

pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret(config)?),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
