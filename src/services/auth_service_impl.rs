//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use crate::config::{AuthConfig, SecurityConfig};
use crate::db::Store;
use crate::db::repositories::user::{hash_password, verify_password};
use crate::db::NewUser;
use crate::domain::{Principal, Role};
use crate::entities::{otps, users};
use crate::services::ServiceError;
use crate::services::auth_service::{
    AuthService, AuthTokens, LoginRequest, OtpMailer, RegisterRequest, ResetPasswordRequest,
    SendOtpRequest, VerifyOtpRequest,
};
use crate::services::jwt::JwtManager;
use crate::services::user_service::UserDto;
use crate::services::validation::{validate_email, validate_password, validate_username};

pub struct SeaOrmAuthService {
    store: Store,
    jwt: JwtManager,
    auth: AuthConfig,
    security: SecurityConfig,
    mailer: Arc<dyn OtpMailer>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        jwt: JwtManager,
        auth: AuthConfig,
        security: SecurityConfig,
        mailer: Arc<dyn OtpMailer>,
    ) -> Self {
        Self {
            store,
            jwt,
            auth,
            security,
            mailer,
        }
    }

    async fn hash(&self, password: String) -> Result<String, ServiceError> {
        let security = self.security.clone();
        tokio::task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await?
            .map_err(|e| ServiceError::internal(format!("{e:#}")))
    }

    /// Issues a token pair and makes the new refresh token the only one accepted.
    async fn issue_tokens(&self, user: users::Model) -> Result<AuthTokens, ServiceError> {
        let principal = Principal {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        };
        let access = self
            .jwt
            .issue_access_token(&principal)
            .map_err(|e| ServiceError::internal(format!("Failed to sign token: {e}")))?;
        let refresh = self
            .jwt
            .issue_refresh_token(&principal)
            .map_err(|e| ServiceError::internal(format!("Failed to sign token: {e}")))?;

        self.store
            .set_refresh_token_id(user.id, Some(refresh.jti))
            .await?;

        Ok(AuthTokens {
            access_token: access.token,
            token_type: "Bearer",
            expires_in: access.ttl_secs,
            refresh_token: refresh.token,
            refresh_expires_in: refresh.ttl_secs,
            user: user.into(),
        })
    }

    /// Latest unexpired code for `email`.
    async fn live_otp(&self, email: &str) -> Result<otps::Model, ServiceError> {
        let otp = self
            .store
            .latest_otp(email)
            .await?
            .ok_or_else(|| ServiceError::validation("No one-time password was requested"))?;
        if is_expired(&otp.expires_at) {
            return Err(ServiceError::validation("One-time password has expired"));
        }
        Ok(otp)
    }
}

fn is_expired(expires_at: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(expires_at)
        .map_or(true, |at| at <= chrono::Utc::now())
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<UserDto, ServiceError> {
        let username = request.username.trim().to_string();
        let email = normalize_email(&request.email);
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&request.password)?;

        if self.store.get_user_by_username(&username).await?.is_some() {
            return Err(ServiceError::conflict("User", &username));
        }
        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict("Email", &email));
        }

        let role = if self.store.count_users().await? == 0 {
            Role::Admin
        } else {
            Role::User
        };
        let password_hash = self.hash(request.password).await?;

        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                password_hash,
                role: role.as_str().to_string(),
            })
            .await?;

        info!(username = %user.username, role = %user.role, "User registered");
        Ok(user.into())
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthTokens, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid credentials".to_string());

        let login = request.login.trim();
        let user = self
            .store
            .get_user_by_login(login)
            .await?
            .ok_or_else(invalid)?;

        let hash = user.password_hash.clone();
        let password = request.password;
        let valid = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
            .await?
            .map_err(|e| ServiceError::internal(format!("{e:#}")))?;
        if !valid {
            warn!(login, "Failed login attempt");
            return Err(invalid());
        }

        info!(username = %user.username, "User logged in");
        self.issue_tokens(user).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, ServiceError> {
        let rejected = || ServiceError::Unauthorized("Invalid refresh token".to_string());

        let claims = self.jwt.validate(refresh_token).map_err(|_| rejected())?;
        if !claims.is_refresh() {
            return Err(rejected());
        }
        let principal = claims.principal().ok_or_else(rejected)?;

        let user = self
            .store
            .get_user(principal.id)
            .await?
            .ok_or_else(rejected)?;
        if user.refresh_token_id.as_deref() != Some(claims.jti.as_str()) {
            return Err(rejected());
        }

        self.issue_tokens(user).await
    }

    async fn logout(&self, principal: &Principal) -> Result<(), ServiceError> {
        self.store.set_refresh_token_id(principal.id, None).await?;
        info!(username = %principal.username, "User logged out");
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<Principal, ServiceError> {
        let rejected = || ServiceError::Unauthorized("Invalid or expired token".to_string());
        let claims = self.jwt.validate(access_token).map_err(|_| rejected())?;
        if !claims.is_access() {
            return Err(rejected());
        }
        claims.principal().ok_or_else(rejected)
    }

    async fn send_otp(&self, request: SendOtpRequest) -> Result<(), ServiceError> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;

        if self.store.get_user_by_email(&email).await?.is_none() {
            info!(email, "One-time password requested for unknown address");
            return Ok(());
        }

        let code = generate_code();
        let ttl = self.auth.otp_ttl_secs;
        let expires_at = i64::try_from(ttl)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| chrono::Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                ServiceError::internal(format!("OTP lifetime {ttl}s is out of range"))
            })?;
        self.store
            .replace_otp(&email, &code, &expires_at.to_rfc3339())
            .await?;

        self.mailer
            .send_otp(&email, &code, ttl)
            .await
            .map_err(|e| ServiceError::internal(format!("Failed to deliver code: {e:#}")))?;
        Ok(())
    }

    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<(), ServiceError> {
        let email = normalize_email(&request.email);
        let otp = self.live_otp(&email).await?;

        if otp.attempts >= self.auth.otp_max_attempts {
            return Err(ServiceError::Forbidden(
                "Too many attempts; request a new code".to_string(),
            ));
        }

        if otp.code != request.otp.trim() {
            self.store.increment_otp_attempts(otp.id).await?;
            warn!(email, attempts = otp.attempts + 1, "Wrong one-time password");
            return Err(ServiceError::validation("Invalid one-time password"));
        }

        self.store.mark_otp_verified(otp.id).await?;
        Ok(())
    }

    async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), ServiceError> {
        let email = normalize_email(&request.email);
        validate_password(&request.new_password)?;

        let otp = self.live_otp(&email).await?;
        if !otp.verified {
            return Err(ServiceError::validation("One-time password not verified"));
        }

        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &email))?;

        let hash = self.hash(request.new_password).await?;
        self.store.update_password_hash(user, hash).await?;
        self.store.delete_otps(&email).await?;

        info!(email, "Password reset");
        Ok(())
    }
}
