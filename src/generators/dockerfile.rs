//! Dockerfile generation.
//!
//! Stacks with a build step get a multi-stage file (toolchain image feeding a
//! slim runtime image); stacks without one get a single stage. The final
//! stage of every file switches to a non-root user before `EXPOSE`/`CMD`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::LazyLock;

use super::GenerateError;
use super::framework::{Framework, Technology, WebServer};

static IMAGE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z._-]+$").expect("Invalid regex"));

static ENV_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex"));

/// A single `ENV` entry, kept in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Generation inputs. Which fields are required depends on the framework.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DockerfileParams {
    pub node_version: Option<String>,
    pub python_version: Option<String>,
    pub go_version: Option<String>,
    pub php_version: Option<String>,
    pub port: Option<u16>,
    pub build_command: Option<String>,
    pub publish_dir: Option<String>,
    pub start_command: Option<String>,
    pub entrypoint: Option<String>,
    pub env: Vec<EnvVar>,
}

impl DockerfileParams {
    /// Fills every unset field from `defaults`, keeping explicit values.
    #[must_use]
    pub fn with_defaults(self, defaults: Self) -> Self {
        Self {
            node_version: self.node_version.or(defaults.node_version),
            python_version: self.python_version.or(defaults.python_version),
            go_version: self.go_version.or(defaults.go_version),
            php_version: self.php_version.or(defaults.php_version),
            port: self.port.or(defaults.port),
            build_command: self.build_command.or(defaults.build_command),
            publish_dir: self.publish_dir.or(defaults.publish_dir),
            start_command: self.start_command.or(defaults.start_command),
            entrypoint: self.entrypoint.or(defaults.entrypoint),
            env: if self.env.is_empty() {
                defaults.env
            } else {
                self.env
            },
        }
    }
}

const NGINX_OWNERSHIP: &str = "RUN chown -R nginx:nginx /usr/share/nginx/html /var/cache/nginx /var/log/nginx /etc/nginx/conf.d \\\n    && touch /var/run/nginx.pid \\\n    && chown nginx:nginx /var/run/nginx.pid";

const APACHE_RUNTIME_OWNERSHIP: &str =
    "RUN chown -R www-data:www-data /var/run/apache2 /var/lock/apache2 /var/log/apache2";

const LARAVEL_DOCROOT: &str = "ENV APACHE_DOCUMENT_ROOT=/var/www/html/public\nRUN sed -ri -e 's!/var/www/html!${APACHE_DOCUMENT_ROOT}!g' /etc/apache2/sites-available/*.conf \\\n    && sed -ri -e 's!/var/www/!${APACHE_DOCUMENT_ROOT}!g' /etc/apache2/apache2.conf /etc/apache2/conf-available/*.conf";

/// Renders the Dockerfile for `technology`.
pub fn generate(technology: Technology, params: &DockerfileParams) -> Result<String, GenerateError> {
    validate_env(&params.env)?;

    match technology {
        Technology::Static(server) => static_site(server, params),
        Technology::Php => php(params),
        Technology::Frontend(framework) => frontend(framework, params),
        Technology::NodeJs => node(params),
        Technology::Python(framework) => python(framework, params),
        Technology::Go => go(params),
        Technology::Laravel => laravel(params),
    }
}

fn static_site(server: WebServer, params: &DockerfileParams) -> Result<String, GenerateError> {
    let port = port_or_default(Framework::StaticHtml, params)?;
    let mut out = header(Framework::StaticHtml, Some(server.as_str()));

    match server {
        WebServer::Nginx => {
            line(&mut out, "FROM nginx:alpine");
            line(&mut out, "WORKDIR /usr/share/nginx/html");
            line(&mut out, "COPY . .");
            if port != 80 {
                let _ = writeln!(
                    out,
                    "RUN sed -i -E 's/listen( +)(\\[::\\]:)?80;/listen\\1\\2{port};/' /etc/nginx/conf.d/default.conf"
                );
            }
            line(&mut out, NGINX_OWNERSHIP);
            finish(
                &mut out,
                &params.env,
                "nginx",
                port,
                &["nginx", "-g", "daemon off;"],
            );
        }
        WebServer::Apache => {
            line(&mut out, "FROM httpd:alpine");
            line(&mut out, "COPY . /usr/local/apache2/htdocs/");
            if port != 80 {
                let _ = writeln!(
                    out,
                    "RUN sed -i 's/^Listen 80$/Listen {port}/' /usr/local/apache2/conf/httpd.conf"
                );
            }
            line(
                &mut out,
                "RUN chown -R www-data:www-data /usr/local/apache2/htdocs /usr/local/apache2/logs",
            );
            finish(&mut out, &params.env, "www-data", port, &["httpd-foreground"]);
        }
    }

    Ok(out)
}

fn php(params: &DockerfileParams) -> Result<String, GenerateError> {
    let version = require_version(Framework::Php, "phpVersion", params.php_version.as_deref())?;
    let port = port_or_default(Framework::Php, params)?;
    let mut out = header(Framework::Php, None);

    let _ = writeln!(out, "FROM php:{version}-apache");
    line(&mut out, "RUN docker-php-ext-install pdo_mysql mysqli");
    line(
        &mut out,
        "COPY --chown=www-data:www-data . /var/www/html/",
    );
    apache_port(&mut out, port);
    line(&mut out, APACHE_RUNTIME_OWNERSHIP);
    finish(&mut out, &params.env, "www-data", port, &["apache2-foreground"]);
    Ok(out)
}

fn frontend(framework: Framework, params: &DockerfileParams) -> Result<String, GenerateError> {
    let version = require_version(framework, "nodeVersion", params.node_version.as_deref())?;
    let build = require_command(framework, "buildCommand", params.build_command.as_deref())?;
    let publish_dir = require_relative_path(framework, "publishDir", params.publish_dir.as_deref())?;
    let port = port_or_default(framework, params)?;
    let mut out = header(framework, None);

    line(&mut out, "# Build stage");
    let _ = writeln!(out, "FROM node:{version}-alpine AS build");
    line(&mut out, "WORKDIR /app");
    line(&mut out, "COPY package*.json ./");
    line(&mut out, "RUN npm ci");
    line(&mut out, "COPY . .");
    let _ = writeln!(out, "RUN {build}");
    line(&mut out, "");

    line(&mut out, "# Runtime stage");
    line(&mut out, "FROM nginx:alpine");
    let _ = writeln!(
        out,
        "COPY --from=build /app/{publish_dir} /usr/share/nginx/html"
    );
    let _ = writeln!(
        out,
        "RUN printf 'server {{\\n    listen {port};\\n    root /usr/share/nginx/html;\\n    index index.html;\\n    location / {{\\n        try_files $uri $uri/ /index.html;\\n    }}\\n}}\\n' > /etc/nginx/conf.d/default.conf"
    );
    line(&mut out, NGINX_OWNERSHIP);
    finish(
        &mut out,
        &params.env,
        "nginx",
        port,
        &["nginx", "-g", "daemon off;"],
    );
    Ok(out)
}

fn node(params: &DockerfileParams) -> Result<String, GenerateError> {
    let framework = Framework::NodeJs;
    let version = require_version(framework, "nodeVersion", params.node_version.as_deref())?;
    let port = require_port(framework, params)?;
    let build = optional_command("buildCommand", params.build_command.as_deref())?;
    let start = optional_command("startCommand", params.start_command.as_deref())?
        .unwrap_or("npm start");
    let mut out = header(framework, None);

    line(&mut out, "# Dependency and build stage");
    let _ = writeln!(out, "FROM node:{version}-alpine AS build");
    line(&mut out, "WORKDIR /app");
    line(&mut out, "COPY package*.json ./");
    line(&mut out, "RUN npm ci");
    line(&mut out, "COPY . .");
    if let Some(build) = build {
        let _ = writeln!(out, "RUN {build}");
    }
    line(&mut out, "RUN npm prune --omit=dev");
    line(&mut out, "");

    line(&mut out, "# Runtime stage");
    let _ = writeln!(out, "FROM node:{version}-alpine");
    line(&mut out, "ENV NODE_ENV=production");
    let _ = writeln!(out, "ENV PORT={port}");
    line(&mut out, "WORKDIR /app");
    line(&mut out, "COPY --from=build --chown=node:node /app ./");
    let argv: Vec<&str> = start.split_whitespace().collect();
    finish(&mut out, &params.env, "node", port, &argv);
    Ok(out)
}

fn python(framework: Framework, params: &DockerfileParams) -> Result<String, GenerateError> {
    let version = require_version(framework, "pythonVersion", params.python_version.as_deref())?;
    let port = require_port(framework, params)?;
    let fallback = if framework == Framework::Django {
        "config.wsgi:application"
    } else {
        "app:app"
    };
    let entrypoint = match params.entrypoint.as_deref().map(str::trim) {
        None | Some("") => fallback,
        Some(e) if e.chars().any(char::is_whitespace) => {
            return Err(GenerateError::invalid(
                "entrypoint",
                "must be a single WSGI target such as 'module:app'",
            ));
        }
        Some(e) => e,
    };
    let mut out = header(framework, None);

    line(&mut out, "# Wheel build stage");
    let _ = writeln!(out, "FROM python:{version}-slim AS build");
    line(&mut out, "WORKDIR /app");
    line(&mut out, "COPY requirements.txt .");
    line(
        &mut out,
        "RUN pip wheel --no-cache-dir --wheel-dir /wheels -r requirements.txt gunicorn",
    );
    line(&mut out, "");

    line(&mut out, "# Runtime stage");
    let _ = writeln!(out, "FROM python:{version}-slim");
    line(&mut out, "ENV PYTHONDONTWRITEBYTECODE=1 \\\n    PYTHONUNBUFFERED=1");
    line(&mut out, "WORKDIR /app");
    line(
        &mut out,
        "RUN groupadd --system app && useradd --system --gid app --home-dir /app app",
    );
    line(&mut out, "COPY --from=build /wheels /wheels");
    line(
        &mut out,
        "RUN pip install --no-cache-dir /wheels/* && rm -rf /wheels",
    );
    line(&mut out, "COPY --chown=app:app . .");
    let bind = format!("0.0.0.0:{port}");
    finish(
        &mut out,
        &params.env,
        "app",
        port,
        &["gunicorn", "--bind", bind.as_str(), "--workers", "2", entrypoint],
    );
    Ok(out)
}

fn go(params: &DockerfileParams) -> Result<String, GenerateError> {
    let framework = Framework::Go;
    let version = require_version(framework, "goVersion", params.go_version.as_deref())?;
    let port = require_port(framework, params)?;
    let mut out = header(framework, None);

    line(&mut out, "# Compile stage");
    let _ = writeln!(out, "FROM golang:{version}-alpine AS build");
    line(&mut out, "WORKDIR /src");
    line(&mut out, "COPY go.mod go.sum* ./");
    line(&mut out, "RUN go mod download");
    line(&mut out, "COPY . .");
    line(
        &mut out,
        "RUN CGO_ENABLED=0 GOOS=linux go build -trimpath -ldflags=\"-s -w\" -o /out/app .",
    );
    line(&mut out, "");

    line(&mut out, "# Runtime stage");
    line(&mut out, "FROM gcr.io/distroless/static-debian12:nonroot");
    line(&mut out, "WORKDIR /app");
    line(&mut out, "COPY --from=build /out/app /app/app");
    let _ = writeln!(out, "ENV PORT={port}");
    write_env(&mut out, &params.env);
    line(&mut out, "USER nonroot:nonroot");
    let _ = writeln!(out, "EXPOSE {port}");
    line(&mut out, "ENTRYPOINT [\"/app/app\"]");
    Ok(out)
}

fn laravel(params: &DockerfileParams) -> Result<String, GenerateError> {
    let framework = Framework::Laravel;
    let version = require_version(framework, "phpVersion", params.php_version.as_deref())?;
    let port = port_or_default(framework, params)?;
    let mut out = header(framework, None);

    line(&mut out, "# Composer stage");
    line(&mut out, "FROM composer:2 AS vendor");
    line(&mut out, "WORKDIR /app");
    line(&mut out, "COPY composer.json composer.lock ./");
    line(
        &mut out,
        "RUN composer install --no-dev --no-scripts --no-autoloader --prefer-dist",
    );
    line(&mut out, "COPY . .");
    line(&mut out, "RUN composer dump-autoload --optimize --no-dev");
    line(&mut out, "");

    line(&mut out, "# Runtime stage");
    let _ = writeln!(out, "FROM php:{version}-apache");
    line(
        &mut out,
        "RUN docker-php-ext-install pdo_mysql && a2enmod rewrite",
    );
    line(&mut out, LARAVEL_DOCROOT);
    line(&mut out, "WORKDIR /var/www/html");
    line(
        &mut out,
        "COPY --from=vendor --chown=www-data:www-data /app /var/www/html",
    );
    apache_port(&mut out, port);
    line(
        &mut out,
        "RUN chown -R www-data:www-data storage bootstrap/cache /var/run/apache2 /var/lock/apache2 /var/log/apache2",
    );
    finish(&mut out, &params.env, "www-data", port, &["apache2-foreground"]);
    Ok(out)
}

// ============================================================================
// Rendering helpers
// ============================================================================

fn header(framework: Framework, variant: Option<&str>) -> String {
    let mut out = String::new();
    match variant {
        Some(v) => {
            let _ = writeln!(out, "# Generated by shipwright for {framework} ({v})");
        }
        None => {
            let _ = writeln!(out, "# Generated by shipwright for {framework}");
        }
    }
    out
}

fn line(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}

fn apache_port(out: &mut String, port: u16) {
    if port != 80 {
        let _ = writeln!(
            out,
            "RUN sed -i 's/Listen 80/Listen {port}/' /etc/apache2/ports.conf \\\n    && sed -i 's/:80>/:{port}>/' /etc/apache2/sites-available/000-default.conf"
        );
    }
}

fn write_env(out: &mut String, env: &[EnvVar]) {
    for var in env {
        let escaped = var.value.replace('\\', "\\\\").replace('"', "\\\"");
        let _ = writeln!(out, "ENV {}=\"{}\"", var.key, escaped);
    }
}

/// Common tail of a final stage: env, non-root user, port and command.
fn finish(out: &mut String, env: &[EnvVar], user: &str, port: u16, argv: &[&str]) {
    write_env(out, env);
    let _ = writeln!(out, "USER {user}");
    let _ = writeln!(out, "EXPOSE {port}");
    let cmd = serde_json::to_string(argv).unwrap_or_else(|_| "[]".to_string());
    let _ = writeln!(out, "CMD {cmd}");
}

// ============================================================================
// Validation
// ============================================================================

fn missing(framework: Framework, parameter: &'static str) -> GenerateError {
    GenerateError::MissingParameter {
        framework: framework.to_string(),
        parameter,
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn require_version<'a>(
    framework: Framework,
    parameter: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, GenerateError> {
    let version = present(value).ok_or_else(|| missing(framework, parameter))?;
    if !IMAGE_TAG_RE.is_match(version) {
        return Err(GenerateError::invalid(
            parameter,
            format!("'{version}' is not a valid image tag"),
        ));
    }
    Ok(version)
}

fn require_command<'a>(
    framework: Framework,
    parameter: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, GenerateError> {
    optional_command(parameter, value)?.ok_or_else(|| missing(framework, parameter))
}

fn optional_command<'a>(
    parameter: &'static str,
    value: Option<&'a str>,
) -> Result<Option<&'a str>, GenerateError> {
    match present(value) {
        Some(cmd) if cmd.contains('\n') || cmd.contains('\r') => Err(GenerateError::invalid(
            parameter,
            "must be a single line",
        )),
        other => Ok(other),
    }
}

fn require_relative_path<'a>(
    framework: Framework,
    parameter: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, GenerateError> {
    let path = present(value).ok_or_else(|| missing(framework, parameter))?;
    let path = path.trim_start_matches("./").trim_end_matches('/');
    if path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|segment| segment == "..")
        || path.chars().any(char::is_whitespace)
    {
        return Err(GenerateError::invalid(
            parameter,
            format!("'{path}' must be a relative path inside the project"),
        ));
    }
    Ok(path)
}

fn require_port(framework: Framework, params: &DockerfileParams) -> Result<u16, GenerateError> {
    match params.port {
        None => Err(missing(framework, "port")),
        Some(0) => Err(GenerateError::invalid("port", "must be between 1 and 65535")),
        Some(port) => Ok(port),
    }
}

fn port_or_default(framework: Framework, params: &DockerfileParams) -> Result<u16, GenerateError> {
    match (params.port, framework.default_port()) {
        (Some(0), _) => Err(GenerateError::invalid("port", "must be between 1 and 65535")),
        (Some(port), _) | (None, Some(port)) => Ok(port),
        (None, None) => Err(missing(framework, "port")),
    }
}

fn validate_env(env: &[EnvVar]) -> Result<(), GenerateError> {
    for var in env {
        if !ENV_KEY_RE.is_match(&var.key) {
            return Err(GenerateError::invalid(
                "env",
                format!("'{}' is not a valid environment variable name", var.key),
            ));
        }
        if var.value.contains('\n') || var.value.contains('\r') {
            return Err(GenerateError::invalid(
                "env",
                format!("value of '{}' must be a single line", var.key),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_params(framework: Framework, port: u16) -> DockerfileParams {
        DockerfileParams {
            port: Some(port),
            ..DockerfileParams::default()
        }
        .with_defaults(framework.default_params())
    }

    fn final_stage(dockerfile: &str) -> &str {
        let idx = dockerfile.rfind("\nFROM ").map_or(0, |i| i + 1);
        &dockerfile[idx..]
    }

    fn all_technologies() -> Vec<Technology> {
        let mut out: Vec<Technology> = Framework::ALL
            .iter()
            .map(|f| Technology::from((*f, WebServer::Nginx)))
            .collect();
        out.push(Technology::Static(WebServer::Apache));
        out
    }

    #[test]
    fn final_stage_runs_as_non_root_and_exposes_requested_port() {
        for technology in all_technologies() {
            let params = complete_params(technology.framework(), 8123);
            let dockerfile = generate(technology, &params).unwrap();
            let stage = final_stage(&dockerfile);

            let users: Vec<&str> = stage
                .lines()
                .filter_map(|l| l.strip_prefix("USER "))
                .collect();
            assert_eq!(users.len(), 1, "{technology:?}");
            let user = users[0].split(':').next().unwrap();
            assert!(user != "root" && user != "0", "{technology:?} runs as {user}");

            let exposes: Vec<&str> = stage
                .lines()
                .filter_map(|l| l.strip_prefix("EXPOSE "))
                .collect();
            assert_eq!(exposes, vec!["8123"], "{technology:?}");
        }
    }

    #[test]
    fn static_servers_default_to_port_80() {
        for server in [WebServer::Nginx, WebServer::Apache] {
            let dockerfile =
                generate(Technology::Static(server), &DockerfileParams::default()).unwrap();
            assert!(dockerfile.contains("\nEXPOSE 80\n"));
            assert!(!dockerfile.contains("sed -i"), "no port rewrite needed");
        }
    }

    #[test]
    fn build_step_frameworks_are_multi_stage() {
        for technology in all_technologies() {
            let framework = technology.framework();
            let params = complete_params(framework, 3000);
            let dockerfile = generate(technology, &params).unwrap();
            let stages = dockerfile.lines().filter(|l| l.starts_with("FROM ")).count();
            let expected = if matches!(framework, Framework::StaticHtml | Framework::Php) {
                1
            } else {
                2
            };
            assert_eq!(stages, expected, "{technology:?}");
        }
    }

    #[test]
    fn frontend_copies_publish_dir_into_nginx() {
        let params = complete_params(Framework::React, 80);
        let dockerfile = generate(Technology::Frontend(Framework::React), &params).unwrap();
        assert!(dockerfile.contains("FROM node:20-alpine AS build"));
        assert!(dockerfile.contains("RUN npm run build"));
        assert!(dockerfile.contains("COPY --from=build /app/build /usr/share/nginx/html"));
        assert!(dockerfile.contains("listen 80;"));
        assert!(dockerfile.contains("try_files $uri $uri/ /index.html;"));
    }

    #[test]
    fn missing_required_parameters_are_validation_failures() {
        let cases = [
            (Technology::NodeJs, complete_params(Framework::NodeJs, 3000), "port"),
            (Technology::Go, complete_params(Framework::Go, 8080), "port"),
            (
                Technology::Python(Framework::Flask),
                complete_params(Framework::Flask, 5000),
                "port",
            ),
            (
                Technology::Frontend(Framework::Vue),
                complete_params(Framework::Vue, 80),
                "buildCommand",
            ),
            (
                Technology::Frontend(Framework::Angular),
                complete_params(Framework::Angular, 80),
                "publishDir",
            ),
            (Technology::Php, complete_params(Framework::Php, 80), "phpVersion"),
        ];

        for (technology, mut params, field) in cases {
            match field {
                "port" => params.port = None,
                "buildCommand" => params.build_command = None,
                "publishDir" => params.publish_dir = Some("   ".to_string()),
                "phpVersion" => params.php_version = None,
                _ => unreachable!(),
            }
            let err = generate(technology, &params).unwrap_err();
            assert!(err.is_validation(), "{technology:?}");
            assert!(
                matches!(err, GenerateError::MissingParameter { parameter, .. } if parameter == field),
                "{technology:?}: {err}"
            );
        }
    }

    #[test]
    fn rejects_unsafe_values() {
        let mut params = complete_params(Framework::React, 80);
        params.publish_dir = Some("../etc".to_string());
        assert!(generate(Technology::Frontend(Framework::React), &params).is_err());

        let mut params = complete_params(Framework::Go, 8080);
        params.go_version = Some("1.22; rm -rf /".to_string());
        assert!(generate(Technology::Go, &params).is_err());

        let mut params = complete_params(Framework::NodeJs, 0);
        params.port = Some(0);
        assert!(generate(Technology::NodeJs, &params).is_err());
    }

    #[test]
    fn env_vars_are_emitted_in_input_order() {
        let mut params = complete_params(Framework::NodeJs, 3000);
        params.env = vec![
            EnvVar::new("ZETA", "last-alpha"),
            EnvVar::new("ALPHA", "say \"hi\""),
            EnvVar::new("MIDDLE", "x"),
        ];
        let dockerfile = generate(Technology::NodeJs, &params).unwrap();
        let stage = final_stage(&dockerfile);

        let zeta = stage.find("ENV ZETA=\"last-alpha\"").unwrap();
        let alpha = stage.find("ENV ALPHA=\"say \\\"hi\\\"\"").unwrap();
        let middle = stage.find("ENV MIDDLE=\"x\"").unwrap();
        assert!(zeta < alpha && alpha < middle);
        assert!(middle < stage.find("USER node").unwrap());
    }

    #[test]
    fn invalid_env_key_produces_no_artifact() {
        let mut params = complete_params(Framework::Go, 8080);
        params.env = vec![EnvVar::new("1BAD", "x")];
        let err = generate(Technology::Go, &params).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidParameter { parameter: "env", .. }));
    }

    #[test]
    fn python_entrypoint_defaults_per_framework() {
        let django = generate(
            Technology::Python(Framework::Django),
            &complete_params(Framework::Django, 8000),
        )
        .unwrap();
        assert!(django.contains("\"config.wsgi:application\""));
        assert!(django.contains("\"0.0.0.0:8000\""));

        let mut params = complete_params(Framework::Flask, 5000);
        params.entrypoint = None;
        let flask = generate(Technology::Python(Framework::Flask), &params).unwrap();
        assert!(flask.contains("\"app:app\""));
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let params = DockerfileParams {
            node_version: Some("18".to_string()),
            ..DockerfileParams::default()
        }
        .with_defaults(Framework::React.default_params());
        assert_eq!(params.node_version.as_deref(), Some("18"));
        assert_eq!(params.publish_dir.as_deref(), Some("build"));
    }
}
