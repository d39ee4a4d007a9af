use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub github: GithubConfig,

    pub jenkins: JenkinsConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// `pretty` or `json`
    pub log_format: String,

    /// `development` or `production`. Production hides internal error details.
    pub environment: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/shipwright.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            environment: "development".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on the refresh-token cookie.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access and refresh tokens.
    /// Prefer `SHIPWRIGHT_JWT_SECRET` over writing it to disk.
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    pub access_token_ttl_secs: u64,

    pub refresh_token_ttl_secs: u64,

    /// At most [`MAX_OTP_TTL_SECS`].
    pub otp_ttl_secs: u64,

    /// Wrong codes accepted before an OTP record is locked.
    pub otp_max_attempts: i32,
}

/// One day.
pub const MAX_OTP_TTL_SECS: u64 = 24 * 60 * 60;

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            otp_ttl_secs: 5 * 60,
            otp_max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,

    /// Organization that owns the generated artifact repositories.
    pub organization: String,

    #[serde(skip_serializing)]
    pub token: String,

    pub default_branch: String,

    pub request_timeout_seconds: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            organization: "shipwright-apps".to_string(),
            token: String::new(),
            default_branch: "main".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JenkinsConfig {
    pub url: String,

    pub username: String,

    #[serde(skip_serializing)]
    pub api_token: String,

    /// Registry that CI pushes images to, e.g. `registry.example.com/apps`.
    pub registry: String,

    pub registry_credentials_id: String,

    pub kubeconfig_credentials_id: String,

    pub request_timeout_seconds: u64,
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            api_token: String::new(),
            registry: "docker.io/shipwright".to_string(),
            registry_credentials_id: "registry-credentials".to_string(),
            kubeconfig_credentials_id: "kubeconfig".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets and the database location may come from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(secret) = non_empty("SHIPWRIGHT_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(token) = non_empty("SHIPWRIGHT_GITHUB_TOKEN") {
            self.github.token = token;
        }
        if let Some(token) = non_empty("SHIPWRIGHT_JENKINS_TOKEN") {
            self.jenkins.api_token = token;
        }
        if let Some(url) = non_empty("SHIPWRIGHT_DATABASE_URL") {
            self.general.database_path = url;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shipwright").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".shipwright").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.general.environment.eq_ignore_ascii_case("production")
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_production() && self.auth.jwt_secret.trim().is_empty() {
            anyhow::bail!("auth.jwt_secret (or SHIPWRIGHT_JWT_SECRET) must be set in production");
        }

        if self.auth.access_token_ttl_secs == 0 || self.auth.refresh_token_ttl_secs == 0 {
            anyhow::bail!("Token lifetimes must be greater than zero");
        }

        if self.auth.otp_ttl_secs == 0 || self.auth.otp_max_attempts <= 0 {
            anyhow::bail!("OTP lifetime and attempt limit must be greater than zero");
        }
        if self.auth.otp_ttl_secs > MAX_OTP_TTL_SECS {
            anyhow::bail!("auth.otp_ttl_secs cannot exceed {MAX_OTP_TTL_SECS} seconds");
        }

        if self.github.organization.trim().is_empty() {
            anyhow::bail!("github.organization cannot be empty");
        }

        url::Url::parse(&self.github.api_url)
            .with_context(|| format!("Invalid github.api_url: {}", self.github.api_url))?;

        let jenkins = url::Url::parse(&self.jenkins.url)
            .with_context(|| format!("Invalid jenkins.url: {}", self.jenkins.url))?;
        if !matches!(jenkins.scheme(), "http" | "https") {
            anyhow::bail!("jenkins.url must use http or https");
        }

        if !matches!(self.general.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!("general.log_format must be 'pretty' or 'json'");
        }

        Ok(())
    }
}
