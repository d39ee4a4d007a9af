//! Declarative Jenkins pipeline script generation.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::GenerateError;
use super::framework::Framework;
use crate::domain::naming::image_repository;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineScriptParams {
    /// Free-form framework name; unknown values still produce a script.
    pub framework: String,
    pub username: String,
    pub project_name: String,
    /// Branch of the artifact repository holding the Dockerfile and manifest.
    pub branch: String,
    /// Organization repository holding the generated artifacts.
    pub repo_url: String,
    /// The user's application source repository.
    pub source_repo_url: String,
    /// Branch of the source repository; `main` when empty.
    pub source_branch: String,
    pub registry: String,
    pub registry_credentials_id: String,
    pub kubeconfig_credentials_id: String,
}

const MANIFEST_PATH: &str = "deploy-artifacts/k8s-manifest.yaml";

/// Renders the Jenkinsfile.
///
/// Stage order: Checkout, Fetch Deployment Artifacts, Install Dependencies,
/// Build, Docker Build & Push, Deploy. An unrecognized framework swaps the
/// install and build stages for a single marker stage.
pub fn generate(params: &PipelineScriptParams) -> Result<String, GenerateError> {
    validate(params)?;

    let framework = params.framework.parse::<Framework>().ok();
    let image = image_repository(&params.registry, &params.username, &params.project_name);
    let registry = params.registry.trim().trim_end_matches('/');
    let registry_host = registry.split('/').next().unwrap_or_default();
    let source_branch = match params.source_branch.trim() {
        "" => "main",
        b => b,
    };

    let mut s = String::new();
    let _ = writeln!(s, "pipeline {{");
    let _ = writeln!(s, "    agent any\n");
    let _ = writeln!(s, "    environment {{");
    let _ = writeln!(s, "        IMAGE = '{image}'");
    let _ = writeln!(s, "        IMAGE_TAG = \"${{BUILD_NUMBER}}\"");
    let _ = writeln!(s, "    }}\n");
    let _ = writeln!(s, "    stages {{");

    stage(&mut s, "Checkout", &[format!(
        "git branch: '{source_branch}', url: '{}'",
        params.source_repo_url.trim()
    )]);

    stage(&mut s, "Fetch Deployment Artifacts", &[
        "dir('deploy-artifacts') {".to_string(),
        format!(
            "    git branch: '{}', url: '{}'",
            params.branch.trim(),
            params.repo_url.trim()
        ),
        "}".to_string(),
        "sh 'cp deploy-artifacts/Dockerfile Dockerfile'".to_string(),
    ]);

    match framework {
        Some(framework) => {
            let install = framework.install_command().map_or_else(
                || format!("echo 'No dependency installation needed for {framework}'"),
                |cmd| format!("sh '{cmd}'"),
            );
            stage(&mut s, "Install Dependencies", &[install]);

            let build = framework.build_command().map_or_else(
                || format!("echo 'No build step needed for {framework}'"),
                |cmd| format!("sh '{cmd}'"),
            );
            stage(&mut s, "Build", &[build]);
        }
        None => {
            let shown = sanitize_label(&params.framework);
            stage(&mut s, "Unsupported Framework", &[format!(
                "echo 'Framework \"{shown}\" is not supported: skipping dependency installation and build'"
            )]);
        }
    }

    let login = if registry_host.is_empty() {
        "sh 'echo \"$REGISTRY_PASSWORD\" | docker login -u \"$REGISTRY_USER\" --password-stdin'"
            .to_string()
    } else {
        format!(
            "sh 'echo \"$REGISTRY_PASSWORD\" | docker login {registry_host} -u \"$REGISTRY_USER\" --password-stdin'"
        )
    };
    stage(&mut s, "Docker Build & Push", &[
        format!(
            "withCredentials([usernamePassword(credentialsId: '{}', usernameVariable: 'REGISTRY_USER', passwordVariable: 'REGISTRY_PASSWORD')]) {{",
            params.registry_credentials_id.trim()
        ),
        format!("    {login}"),
        "    sh 'docker build -t $IMAGE:$IMAGE_TAG -t $IMAGE:latest .'".to_string(),
        "    sh 'docker push $IMAGE:$IMAGE_TAG'".to_string(),
        "    sh 'docker push $IMAGE:latest'".to_string(),
        "}".to_string(),
    ]);

    stage(&mut s, "Deploy", &[
        format!(
            "withKubeConfig([credentialsId: '{}']) {{",
            params.kubeconfig_credentials_id.trim()
        ),
        format!("    sh \"sed -i 's|image: .*|image: ${{IMAGE}}:${{IMAGE_TAG}}|' {MANIFEST_PATH}\""),
        format!("    sh 'kubectl apply -f {MANIFEST_PATH}'"),
        "}".to_string(),
    ]);

    let _ = writeln!(s, "    }}");
    let _ = writeln!(s, "}}");
    Ok(s)
}

fn stage(out: &mut String, name: &str, steps: &[String]) {
    let _ = writeln!(out, "        stage('{name}') {{");
    let _ = writeln!(out, "            steps {{");
    for step in steps {
        let _ = writeln!(out, "                {step}");
    }
    let _ = writeln!(out, "            }}");
    let _ = writeln!(out, "        }}");
}

/// Keeps only characters that cannot break out of a Groovy string literal.
fn sanitize_label(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_' | '+' | '#'))
        .take(64)
        .collect()
}

fn validate(params: &PipelineScriptParams) -> Result<(), GenerateError> {
    let required = [
        ("username", &params.username),
        ("projectName", &params.project_name),
        ("branch", &params.branch),
        ("repoUrl", &params.repo_url),
        ("sourceRepoUrl", &params.source_repo_url),
        ("registryCredentialsId", &params.registry_credentials_id),
        ("kubeconfigCredentialsId", &params.kubeconfig_credentials_id),
    ];
    for (parameter, value) in required {
        if value.trim().is_empty() {
            return Err(GenerateError::invalid(parameter, "must not be empty"));
        }
    }

    let literal = [
        ("username", &params.username),
        ("projectName", &params.project_name),
        ("branch", &params.branch),
        ("repoUrl", &params.repo_url),
        ("sourceRepoUrl", &params.source_repo_url),
        ("sourceBranch", &params.source_branch),
        ("registry", &params.registry),
        ("registryCredentialsId", &params.registry_credentials_id),
        ("kubeconfigCredentialsId", &params.kubeconfig_credentials_id),
    ];
    for (parameter, value) in literal {
        if value
            .chars()
            .any(|c| matches!(c, '\'' | '"' | '\\' | '$' | '\n' | '\r' | '`'))
        {
            return Err(GenerateError::invalid(
                parameter,
                "contains characters that are not allowed in a pipeline script",
            ));
        }
    }
    Ok(())
}
