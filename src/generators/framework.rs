use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::GenerateError;
use super::dockerfile::DockerfileParams;

/// Supported application stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "HTML")]
    StaticHtml,
    #[serde(rename = "PHP")]
    Php,
    React,
    Angular,
    Vue,
    #[serde(rename = "Node.js")]
    NodeJs,
    Django,
    Flask,
    Go,
    Laravel,
}

impl Framework {
    pub const ALL: [Self; 10] = [
        Self::StaticHtml,
        Self::Php,
        Self::React,
        Self::Angular,
        Self::Vue,
        Self::NodeJs,
        Self::Django,
        Self::Flask,
        Self::Go,
        Self::Laravel,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StaticHtml => "HTML",
            Self::Php => "PHP",
            Self::React => "React",
            Self::Angular => "Angular",
            Self::Vue => "Vue",
            Self::NodeJs => "Node.js",
            Self::Django => "Django",
            Self::Flask => "Flask",
            Self::Go => "Go",
            Self::Laravel => "Laravel",
        }
    }

    /// Frameworks whose production image is a static bundle served by nginx.
    #[must_use]
    pub const fn is_frontend(&self) -> bool {
        matches!(self, Self::React | Self::Angular | Self::Vue)
    }

    /// Frameworks served by a web server that listens on 80 unless told otherwise.
    #[must_use]
    pub const fn has_default_port(&self) -> bool {
        matches!(
            self,
            Self::StaticHtml | Self::Php | Self::Laravel | Self::React | Self::Angular | Self::Vue
        )
    }

    /// Container port used when the request does not carry one.
    #[must_use]
    pub const fn default_port(&self) -> Option<u16> {
        if self.has_default_port() {
            Some(80)
        } else {
            None
        }
    }

    /// Dependency-install command run by CI, when the stack has one.
    #[must_use]
    pub const fn install_command(&self) -> Option<&'static str> {
        match self {
            Self::StaticHtml | Self::Php => None,
            Self::React | Self::Angular | Self::Vue | Self::NodeJs => Some("npm ci"),
            Self::Django | Self::Flask => Some("pip install -r requirements.txt"),
            Self::Go => Some("go mod download"),
            Self::Laravel => Some("composer install --no-dev --optimize-autoloader"),
        }
    }

    /// Build command run by CI, when the stack has one.
    #[must_use]
    pub const fn build_command(&self) -> Option<&'static str> {
        match self {
            Self::StaticHtml | Self::Php | Self::Flask => None,
            Self::React | Self::Angular | Self::Vue => Some("npm run build"),
            Self::NodeJs => Some("npm run build --if-present"),
            Self::Django => Some("python manage.py check --deploy"),
            Self::Go => Some("go build ./..."),
            Self::Laravel => Some("php artisan config:cache"),
        }
    }

    /// Defaults applied by the deploy flow before generation.
    ///
    /// Fills toolchain versions, build commands, publish directories and
    /// entrypoints. Never fills the port of a backend framework.
    #[must_use]
    pub fn default_params(&self) -> DockerfileParams {
        let mut params = DockerfileParams::default();
        match self {
            Self::StaticHtml => {}
            Self::React => {
                params.node_version = Some("20".to_string());
                params.build_command = Some("npm run build".to_string());
                params.publish_dir = Some("build".to_string());
            }
            Self::Vue | Self::Angular => {
                params.node_version = Some("20".to_string());
                params.build_command = Some("npm run build".to_string());
                params.publish_dir = Some("dist".to_string());
            }
            Self::NodeJs => {
                params.node_version = Some("20".to_string());
                params.start_command = Some("npm start".to_string());
            }
            Self::Django => {
                params.python_version = Some("3.12".to_string());
                params.entrypoint = Some("config.wsgi:application".to_string());
            }
            Self::Flask => {
                params.python_version = Some("3.12".to_string());
                params.entrypoint = Some("app:app".to_string());
            }
            Self::Go => params.go_version = Some("1.22".to_string()),
            Self::Php | Self::Laravel => params.php_version = Some("8.3".to_string()),
        }
        params
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let framework = match normalized.as_str() {
            "html" | "static" | "static-html" => Self::StaticHtml,
            "php" => Self::Php,
            "react" | "reactjs" | "react.js" => Self::React,
            "angular" => Self::Angular,
            "vue" | "vuejs" | "vue.js" => Self::Vue,
            "node" | "nodejs" | "node.js" => Self::NodeJs,
            "django" => Self::Django,
            "flask" => Self::Flask,
            "go" | "golang" => Self::Go,
            "laravel" => Self::Laravel,
            _ => return Err(GenerateError::UnsupportedFramework(s.trim().to_string())),
        };
        Ok(framework)
    }
}

/// Web server used to serve plain static sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebServer {
    #[default]
    Nginx,
    Apache,
}

impl WebServer {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nginx => "nginx",
            Self::Apache => "apache",
        }
    }
}

impl FromStr for WebServer {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nginx" => Ok(Self::Nginx),
            "apache" | "httpd" => Ok(Self::Apache),
            other => Err(GenerateError::invalid(
                "webServer",
                format!("'{other}' is not one of nginx, apache"),
            )),
        }
    }
}

/// A resolved generation strategy: the framework plus, for static sites,
/// the chosen web server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technology {
    Static(WebServer),
    Php,
    Frontend(Framework),
    NodeJs,
    Python(Framework),
    Go,
    Laravel,
}

impl Technology {
    #[must_use]
    pub const fn framework(&self) -> Framework {
        match self {
            Self::Static(_) => Framework::StaticHtml,
            Self::Php => Framework::Php,
            Self::Frontend(f) | Self::Python(f) => *f,
            Self::NodeJs => Framework::NodeJs,
            Self::Go => Framework::Go,
            Self::Laravel => Framework::Laravel,
        }
    }
}

impl From<(Framework, WebServer)> for Technology {
    fn from((framework, web_server): (Framework, WebServer)) -> Self {
        match framework {
            Framework::StaticHtml => Self::Static(web_server),
            Framework::Php => Self::Php,
            Framework::React | Framework::Angular | Framework::Vue => Self::Frontend(framework),
            Framework::NodeJs => Self::NodeJs,
            Framework::Django | Framework::Flask => Self::Python(framework),
            Framework::Go => Self::Go,
            Framework::Laravel => Self::Laravel,
        }
    }
}

/// Maps a framework name and optional web-server choice to a generator.
///
/// The web server is only consulted for static sites; an unrecognized
/// framework name is a configuration error for this request.
pub fn technology_path(
    framework: &str,
    web_server: Option<&str>,
) -> Result<Technology, GenerateError> {
    let framework: Framework = framework.parse()?;
    let web_server = match (framework, web_server) {
        (Framework::StaticHtml, Some(ws)) if !ws.trim().is_empty() => ws.parse()?,
        _ => WebServer::default(),
    };
    Ok(Technology::from((framework, web_server)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("React".parse::<Framework>().unwrap(), Framework::React);
        assert_eq!("node.js".parse::<Framework>().unwrap(), Framework::NodeJs);
        assert_eq!("golang".parse::<Framework>().unwrap(), Framework::Go);
        assert_eq!("HTML".parse::<Framework>().unwrap(), Framework::StaticHtml);
        for framework in Framework::ALL {
            assert_eq!(framework.as_str().parse::<Framework>().unwrap(), framework);
        }
    }

    #[test]
    fn unknown_framework_is_a_configuration_error() {
        let err = technology_path("Rails", None).unwrap_err();
        assert_eq!(err, GenerateError::UnsupportedFramework("Rails".to_string()));
    }

    #[test]
    fn web_server_only_matters_for_static_sites() {
        assert_eq!(
            technology_path("HTML", Some("apache")).unwrap(),
            Technology::Static(WebServer::Apache)
        );
        assert_eq!(
            technology_path("HTML", None).unwrap(),
            Technology::Static(WebServer::Nginx)
        );
        assert_eq!(
            technology_path("React", Some("apache")).unwrap(),
            Technology::Frontend(Framework::React)
        );
        assert!(technology_path("HTML", Some("iis")).is_err());
    }

    #[test]
    fn backend_defaults_never_include_a_port() {
        for framework in Framework::ALL {
            assert_eq!(framework.default_params().port, None, "{framework}");
        }
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&Framework::NodeJs).unwrap();
        assert_eq!(json, "\"Node.js\"");
        let parsed: Framework = serde_json::from_str("\"HTML\"").unwrap();
        assert_eq!(parsed, Framework::StaticHtml);
    }
}
