//! Access and refresh token issuance (HS256).

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::Principal;

pub const ACCESS: &str = "access";
pub const REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Unique per token; the refresh token's id is stored on the user row.
    pub jti: String,
    /// User id.
    pub sub: String,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
}

impl Claims {
    #[must_use]
    pub fn is_access(&self) -> bool {
        self.token_type == ACCESS
    }

    #[must_use]
    pub fn is_refresh(&self) -> bool {
        self.token_type == REFRESH
    }

    /// The principal named by these claims, if the subject is a valid id.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        Some(Principal {
            id: self.sub.parse().ok()?,
            username: self.username.clone(),
            email: self.email.clone(),
        })
    }
}

/// A signed token plus its id and lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub ttl_secs: u64,
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl JwtManager {
    #[must_use]
    pub fn new(secret: &[u8], access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn issue_access_token(
        &self,
        principal: &Principal,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue(principal, ACCESS, self.access_ttl_secs)
    }

    pub fn issue_refresh_token(
        &self,
        principal: &Principal,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue(principal, REFRESH, self.refresh_ttl_secs)
    }

    fn issue(
        &self,
        principal: &Principal,
        token_type: &str,
        ttl_secs: u64,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let jti = uuid::Uuid::new_v4().to_string();

        let claims = Claims {
            jti: jti.clone(),
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            email: principal.email.clone(),
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
            token_type: token_type.to_string(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            jti,
            ttl_secs,
        })
    }

    /// Checks signature and expiry and returns the claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    #[must_use]
    pub const fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }
}
