use regex::Regex;
use std::sync::LazyLock;

use super::ServiceError;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").expect("Invalid regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex")
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").expect("Invalid regex")
});

static DERIVED_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("Invalid regex"));

/// GitHub's repository name limit.
pub const REPOSITORY_NAME_MAX: usize = 100;
/// Limit for names composed from an owner and a project (CI jobs, deployment records).
pub const DERIVED_NAME_MAX: usize = 128;

/// Hosts accepted as project sources.
const SOURCE_HOSTS: [&str; 4] = ["github.com", "gitlab.com", "bitbucket.org", "dev.azure.com"];

pub fn validate_username(username: &str) -> Result<(), ServiceError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ServiceError::validation(
            "Username must be 3-32 characters of letters, digits, '_' or '-'",
        ))
    }
}

pub fn validate_email(email: &str) -> Result<(), ServiceError> {
    if email.len() <= 254 && EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ServiceError::validation(format!("Invalid email address: {email}")))
    }
}

pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < 8 {
        return Err(ServiceError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

/// Project and repository names end up in branch names, CI job names and
/// Kubernetes object names.
pub fn validate_name(kind: &str, name: &str) -> Result<(), ServiceError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ServiceError::validation(format!(
            "{kind} name must start with a letter or digit and contain only letters, digits, '_' or '-' (max 64)"
        )))
    }
}

/// Names composed from already-validated parts are longer than anything a
/// caller may type, so they get their own ceiling.
pub fn validate_derived_name(kind: &str, name: &str, max_len: usize) -> Result<(), ServiceError> {
    if name.len() <= max_len && DERIVED_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ServiceError::validation(format!(
            "{kind} name {name} is not usable (letters, digits, '_' or '-', max {max_len})"
        )))
    }
}

/// `https` URL of a hosted git repository with at least `owner/repo` in the path.
pub fn validate_repository_url(raw: &str) -> Result<(), ServiceError> {
    let invalid = || ServiceError::validation(format!("Invalid repository URL: {raw}"));

    let url = url::Url::parse(raw).map_err(|_| invalid())?;
    if url.scheme() != "https" {
        return Err(invalid());
    }
    let host = url.host_str().ok_or_else(invalid)?;
    if !SOURCE_HOSTS.contains(&host) {
        return Err(ServiceError::validation(format!(
            "Repository host {host} is not supported"
        )));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    if segments.len() < 2 || segments.iter().any(|s| *s == ".git") {
        return Err(invalid());
    }
    Ok(())
}
