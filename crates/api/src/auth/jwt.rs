//! Bearer-token validation.
//!
//! Tokens are HS256 JWTs minted by the hosted auth provider; `sub` carries
//! the user id the professional profile is keyed on.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Auth provider user id.
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JwtManager {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Provider tokens carry an `aud` we don't key on.
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    fn token(secret: &str, exp_offset: Duration) -> String {
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            email: Some("pro@example.com".to_string()),
            exp: (OffsetDateTime::now_utc() + exp_offset).unix_timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let manager = JwtManager::new("test-secret");
        let claims = manager
            .verify(&token("test-secret", Duration::hours(1)))
            .unwrap();
        assert_eq!(claims.email.as_deref(), Some("pro@example.com"));
        assert!(uuid::Uuid::parse_str(&claims.sub).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let manager = JwtManager::new("test-secret");
        assert!(manager
            .verify(&token("other-secret", Duration::hours(1)))
            .is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = JwtManager::new("test-secret");
        assert!(manager
            .verify(&token("test-secret", Duration::hours(-2)))
            .is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let manager = JwtManager::new("test-secret");
        assert!(manager.verify("not.a.jwt").is_err());
    }
}
