use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::{Cookie, SameSite};
use std::sync::Arc;

use super::{ApiError, ApiJson, ApiResponse, AppState};
use crate::domain::Principal;
use crate::services::auth_service::{
    LoginRequest, RegisterRequest, ResetPasswordRequest, SendOtpRequest, VerifyOtpRequest,
};
use crate::services::{AuthTokens, UserDto};

pub const REFRESH_COOKIE: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/api/auth";

// ============================================================================
// Middleware
// ============================================================================

/// Resolves `Authorization: Bearer <access token>` into a [`Principal`]
/// request extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let principal = state.shared.auth_service.authenticate(token).await?;
    tracing::Span::current().record("user_id", principal.id);

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn refresh_token_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == REFRESH_COOKIE)
        .map(|c| c.value().to_string())
}

fn refresh_cookie(token: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(
            i64::try_from(max_age_secs).unwrap_or(i64::MAX),
        ))
        .build()
}

fn expired_refresh_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build()
}

fn with_cookie(mut response: Response, cookie: &Cookie<'_>) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {e}")))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(response)
}

fn token_response(state: &AppState, tokens: AuthTokens) -> Result<Response, ApiError> {
    let cookie = refresh_cookie(
        tokens.refresh_token.clone(),
        tokens.refresh_expires_in,
        state.config().server.secure_cookies,
    );
    with_cookie(Json(ApiResponse::success(tokens)).into_response(), &cookie)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let user = state.shared.auth_service.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(user, "Account created")),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    if payload.login.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }
    let tokens = state.shared.auth_service.login(payload).await?;
    token_response(&state, tokens)
}

/// POST /auth/refresh-token
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = refresh_token_from(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;
    let tokens = state.shared.auth_service.refresh(&token).await?;
    token_response(&state, tokens)
}

/// DELETE /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    state.shared.auth_service.logout(&principal).await?;
    let cookie = expired_refresh_cookie(state.config().server.secure_cookies);
    with_cookie(
        Json(ApiResponse::message("Logged out")).into_response(),
        &cookie,
    )
}

/// POST /auth/sendOtp
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SendOtpRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.shared.auth_service.send_otp(payload).await?;
    Ok(Json(ApiResponse::message(
        "If the address belongs to an account, a code has been sent",
    )))
}

/// POST /auth/verifyOtp
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.shared.auth_service.verify_otp(payload).await?;
    Ok(Json(ApiResponse::message("Code verified")))
}

/// PUT /auth/resetPassword
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.shared.auth_service.reset_password(payload).await?;
    Ok(Json(ApiResponse::message("Password updated")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_cookie_attributes() {
        let rendered = refresh_cookie("abc".to_string(), 60, true).to_string();
        assert!(rendered.starts_with("refresh_token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Max-Age=60"));
    }

    #[test]
    fn refresh_token_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=xyz"),
        );
        assert_eq!(refresh_token_from(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
