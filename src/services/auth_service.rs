//! Domain service for authentication.
//!
//! Handles registration, token issuance and rotation, and the one-time
//! password flow used for password resets.

use serde::{Deserialize, Serialize};

use crate::domain::Principal;

use super::ServiceError;
use super::user_service::UserDto;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

/// Tokens handed out on login and refresh. The refresh token travels in a
/// cookie and is skipped when serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip)]
    pub refresh_token: String,
    #[serde(skip)]
    pub refresh_expires_in: u64,
    pub user: UserDto,
}

/// Delivery channel for one-time passwords.
#[async_trait::async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str, ttl_secs: u64) -> anyhow::Result<()>;
}

/// Writes codes to the log instead of sending mail.
pub struct LogMailer;

#[async_trait::async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(&self, email: &str, code: &str, ttl_secs: u64) -> anyhow::Result<()> {
        tracing::info!(email, code, ttl_secs, "One-time password issued");
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account. The very first account becomes an admin.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for a malformed username, email or password
    /// - [`ServiceError::Conflict`] if the username or email is taken
    async fn register(&self, request: RegisterRequest) -> Result<UserDto, ServiceError>;

    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`] for unknown users and wrong passwords alike.
    async fn login(&self, request: LoginRequest) -> Result<AuthTokens, ServiceError>;

    /// Exchanges a refresh token for a new token pair; the old one stops working.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, ServiceError>;

    async fn logout(&self, principal: &Principal) -> Result<(), ServiceError>;

    /// Resolves a bearer access token.
    async fn authenticate(&self, access_token: &str) -> Result<Principal, ServiceError>;

    /// Issues a new code for `email`, superseding earlier ones. Unknown
    /// addresses succeed without sending anything.
    async fn send_otp(&self, request: SendOtpRequest) -> Result<(), ServiceError>;

    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for a missing, expired or wrong code
    /// - [`ServiceError::Forbidden`] once the attempt limit is reached
    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<(), ServiceError>;

    /// Requires a verified, unexpired code for the address.
    async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), ServiceError>;
}
