//! Pure artifact builders: Dockerfiles, Kubernetes manifests, Jenkins pipeline
//! scripts and Jenkins job documents.
//!
//! Nothing in this module performs I/O. Every generator validates its input
//! first and returns [`GenerateError`] without producing partial output.

pub mod dockerfile;
pub mod framework;
pub mod jenkins_job;
pub mod kubernetes;
pub mod pipeline_script;

pub use dockerfile::{DockerfileParams, EnvVar};
pub use framework::{Framework, Technology, WebServer, technology_path};
pub use kubernetes::{AutoscalingSpec, ManifestParams, ResourceSpec, VolumeSpec};
pub use pipeline_script::PipelineScriptParams;

use thiserror::Error;

/// Errors produced while generating an artifact.
///
/// `MissingParameter` and `InvalidParameter` are caller mistakes;
/// `UnsupportedFramework` means the request named a stack the platform
/// cannot build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("Missing required parameter '{parameter}' for {framework}")]
    MissingParameter {
        framework: String,
        parameter: &'static str,
    },

    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("Unsupported framework: {0}")]
    UnsupportedFramework(String),

    #[error("Failed to render artifact: {0}")]
    Render(String),
}

impl GenerateError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the request rather than by the generator.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Render(_))
    }
}
