use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, Role, User};

/// JWT claims carried by both the bearer header and the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Hashing(format!("token signing failed: {err}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Timestamps;

    fn agent() -> User {
        User {
            id: "user-7".into(),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            password_hash: String::new(),
            role: Role::Agent,
            phone: None,
            active: true,
            favorites: Vec::new(),
            stamps: Timestamps::now(),
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let service = TokenService::new("unit-test-secret-unit-test-secret", 2);
        let issued = service.issue(&agent()).expect("issues");
        let claims = service.verify(&issued.token).expect("verifies");
        assert_eq!(claims.sub, "user-7");
        assert_eq!(claims.role, Role::Agent);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issuer = TokenService::new("first-secret-first-secret-first", 1);
        let verifier = TokenService::new("second-secret-second-secret-sec", 1);
        let issued = issuer.issue(&agent()).expect("issues");
        assert!(matches!(
            verifier.verify(&issued.token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let service = TokenService::new("unit-test-secret-unit-test-secret", -1);
        let issued = service.issue(&agent()).expect("issues");
        assert!(service.verify(&issued.token).is_err());
    }
}
