//! Render command handler

use anyhow::Context;

use crate::cli::{Artifact, RenderArgs};
use crate::config::Config;
use crate::domain::naming::{artifact_branch, image_repository, repository_name};
use crate::generators::{
    DockerfileParams, ManifestParams, PipelineScriptParams, dockerfile, kubernetes,
    pipeline_script, technology_path,
};

pub fn cmd_render(config: &Config, artifact: Artifact, args: &RenderArgs) -> anyhow::Result<String> {
    let technology = technology_path(&args.framework, args.web_server.as_deref())?;
    let framework = technology.framework();

    let mut params = DockerfileParams {
        port: args.port,
        ..DockerfileParams::default()
    };
    if !args.raw {
        params = params.with_defaults(framework.default_params());
    }

    let rendered = match artifact {
        Artifact::Dockerfile => dockerfile::generate(technology, &params)?,
        Artifact::Manifest => {
            let port = params
                .port
                .or_else(|| framework.default_port())
                .context("--port is required for this framework")?;
            kubernetes::generate(&ManifestParams {
                username: args.username.clone(),
                project_name: args.project.clone(),
                image: format!(
                    "{}:latest",
                    image_repository(&config.jenkins.registry, &args.username, &args.project)
                ),
                container_port: port,
                ..ManifestParams::default()
            })?
        }
        Artifact::Pipeline => {
            let repository = repository_name(&args.username, &args.project);
            pipeline_script::generate(&PipelineScriptParams {
                framework: framework.as_str().to_string(),
                username: args.username.clone(),
                project_name: args.project.clone(),
                branch: artifact_branch(&args.project),
                repo_url: format!(
                    "https://github.com/{}/{repository}.git",
                    config.github.organization
                ),
                source_repo_url: args.source_repo.clone(),
                source_branch: String::new(),
                registry: config.jenkins.registry.clone(),
                registry_credentials_id: config.jenkins.registry_credentials_id.clone(),
                kubeconfig_credentials_id: config.jenkins.kubeconfig_credentials_id.clone(),
            })?
        }
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(framework: &str, port: Option<u16>) -> RenderArgs {
        RenderArgs {
            framework: framework.to_string(),
            port,
            web_server: None,
            username: "alice".to_string(),
            project: "blog".to_string(),
            source_repo: "https://github.com/alice/blog".to_string(),
            raw: false,
        }
    }

    #[test]
    fn renders_frontend_dockerfile_with_defaults() {
        let out = cmd_render(&Config::default(), Artifact::Dockerfile, &args("React", None)).unwrap();
        assert!(out.contains("EXPOSE 80"));
        assert!(out.contains("USER nginx"));
    }

    #[test]
    fn backend_manifest_needs_a_port() {
        assert!(cmd_render(&Config::default(), Artifact::Manifest, &args("Django", None)).is_err());
        let out =
            cmd_render(&Config::default(), Artifact::Manifest, &args("Django", Some(8000))).unwrap();
        assert!(out.contains("containerPort: 8000"));
    }

    #[test]
    fn raw_mode_skips_defaults() {
        let mut raw = args("React", None);
        raw.raw = true;
        assert!(cmd_render(&Config::default(), Artifact::Dockerfile, &raw).is_err());
    }

    #[test]
    fn pipeline_uses_artifact_branch() {
        let out = cmd_render(&Config::default(), Artifact::Pipeline, &args("React", None)).unwrap();
        assert!(out.contains("deploy/blog"));
    }
}
