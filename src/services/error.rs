//! Error type shared by every domain service.

use thiserror::Error;

use crate::clients::github::ScmError;
use crate::clients::jenkins::CiError;
use crate::db::is_unique_violation;
use crate::generators::GenerateError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: &str, name: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {name} not found"))
    }

    pub fn conflict(resource: &str, name: impl std::fmt::Display) -> Self {
        Self::Conflict(format!("{resource} {name} already exists"))
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("Unauthorized action".to_string())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::Unauthorized(_) => "unauthorized",
            Self::Upstream { .. } => "upstream",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for this outcome. "Already exists" is a plain 400.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Conflict(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Upstream { .. } | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Whether the message is safe to show to the caller as-is.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict("Resource already exists".to_string())
        } else {
            Self::Database(format!("{err:#}"))
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::from(anyhow::Error::from(err))
    }
}

impl From<GenerateError> for ServiceError {
    fn from(err: GenerateError) -> Self {
        if err.is_validation() {
            Self::Validation(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<ScmError> for ServiceError {
    fn from(err: ScmError) -> Self {
        match err {
            ScmError::NotFound(what) => Self::NotFound(format!("Source control: {what} not found")),
            other => Self::Upstream {
                service: "GitHub",
                message: other.to_string(),
            },
        }
    }
}

impl From<CiError> for ServiceError {
    fn from(err: CiError) -> Self {
        match err {
            CiError::NotFound(what) => Self::NotFound(format!("CI: {what} not found")),
            CiError::AlreadyExists(what) => Self::Conflict(format!("CI: {what} already exists")),
            other => Self::Upstream {
                service: "Jenkins",
                message: other.to_string(),
            },
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ServiceError::validation("x").status_code(), 400);
        assert_eq!(ServiceError::conflict("Project", "blog").status_code(), 400);
        assert_eq!(ServiceError::forbidden().status_code(), 403);
        assert_eq!(ServiceError::not_found("Project", "blog").status_code(), 404);
        assert_eq!(ServiceError::internal("boom").status_code(), 500);
    }

    #[test]
    fn generator_errors_are_validation_failures() {
        let err: ServiceError = GenerateError::UnsupportedFramework("Rails".into()).into();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err: ServiceError = GenerateError::Render("yaml".into()).into();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn upstream_not_found_is_remapped() {
        let err: ServiceError = CiError::NotFound("build 4".into()).into();
        assert_eq!(err.status_code(), 404);

        let err: ServiceError = ScmError::Http {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.status_code(), 500);
    }
}
