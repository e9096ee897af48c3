use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session credential. The token is self-contained:
/// validity can be checked without a store round-trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // account id
    pub exp: i64,    // expiration time
    pub iat: i64,    // issued at
    pub jti: String, // unique token id
}

/// Issues and verifies stateless signed session tokens. Logout is enforced
/// by the client discarding the cookie plus the bounded validity window;
/// there is no server-side revocation.
#[derive(Clone)]
pub struct SessionTokens {
    secret: String,
    validity: Duration,
}

impl SessionTokens {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            validity: Duration::days(7),
        }
    }

    pub fn issue(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = now + self.validity;

        let claims = SessionClaims {
            sub: account_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }

    pub fn max_age_secs(&self) -> i64 {
        self.validity.num_seconds()
    }
}
