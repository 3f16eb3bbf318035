/**
 * Session Tokens
 *
 * HS256 JWTs signed with the configured secret, valid for 30 days.
 */

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User document id
    pub id: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

pub fn create_token(secret: &str, user_id: &str, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        id: user_id.to_string(),
        email: email.to_string(),
        exp: u64::try_from(now + TOKEN_TTL_SECS).unwrap_or_default(),
        iat: u64::try_from(now).unwrap_or_default(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_claims() {
        let token = create_token("s3cret", "abc123", "ada@example.com").unwrap();
        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.id, "abc123");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS as u64);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token("s3cret", "abc123", "ada@example.com").unwrap();
        assert!(verify_token("other", &token).is_err());
        assert!(verify_token("s3cret", "invalid.token.here").is_err());
    }
}
