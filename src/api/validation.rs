use super::ApiError;

/// Build numbers in paths are positive integers.
pub fn parse_build_number(raw: &str) -> Result<u32, ApiError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ApiError::validation(format!(
            "Invalid build number: {raw}. Build number must be a positive integer"
        ))),
    }
}

/// Resolves the `?username=` owner on pipeline routes.
pub fn owner_or_self(requested: Option<String>, principal_username: &str) -> String {
    requested
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| principal_username.to_string())
}
