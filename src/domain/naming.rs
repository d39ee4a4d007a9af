//! Deterministic names derived from `(username, project)` pairs.
//!
//! Every external object the platform creates is named from these helpers so
//! that a cluster object, CI job or repository can be traced back to its owner.

use sha2::{Digest, Sha256};

/// CI job / pipeline record name.
#[must_use]
pub fn pipeline_name(username: &str, project_name: &str) -> String {
    format!("{username}-{project_name}-pipeline")
}

/// Deployment history record name.
#[must_use]
pub fn deployment_name(username: &str, project_name: &str) -> String {
    format!("{username}-{project_name}-deployment")
}

/// Organization repository that hosts generated artifacts.
#[must_use]
pub fn repository_name(username: &str, repo_name: &str) -> String {
    format!("{username}-{repo_name}")
}

/// Branch that receives generated artifacts.
#[must_use]
pub fn artifact_branch(project_name: &str) -> String {
    format!("deploy/{project_name}")
}

/// Container image repository (without tag) built for a project.
#[must_use]
pub fn image_repository(registry: &str, username: &str, project_name: &str) -> String {
    let base = resource_base_name(username, project_name);
    let registry = registry.trim().trim_end_matches('/');
    if registry.is_empty() {
        base
    } else {
        format!("{registry}/{base}")
    }
}

/// Longest base name; object suffixes such as `-service` must still fit in 63.
const BASE_NAME_MAX: usize = 52;

/// Hex digits of the owner/project digest appended to rewritten names.
const DIGEST_LEN: usize = 10;

/// DNS-1123 label used as the base name of every Kubernetes object.
///
/// `{username}-{projectName}` is used as-is when it is already a valid label,
/// fits in [`BASE_NAME_MAX`] and the username has no dash. Otherwise the name
/// is lowercased, mapped to `[a-z0-9-]`, shortened and suffixed with a digest
/// of the exact `(username, projectName)` pair, so distinct pairs never share
/// a base name.
#[must_use]
pub fn resource_base_name(username: &str, project_name: &str) -> String {
    let raw = format!("{username}-{project_name}");
    let sanitized = sanitize_label(&raw);

    if sanitized == raw && raw.len() <= BASE_NAME_MAX && !username.contains('-') {
        return sanitized;
    }

    let digest = hex::encode(Sha256::digest(format!("{username}/{project_name}")));
    let mut prefix = sanitized;
    prefix.truncate(BASE_NAME_MAX - DIGEST_LEN - 1);
    while prefix.ends_with('-') {
        prefix.pop();
    }

    if prefix.is_empty() {
        format!("x-{}", &digest[..DIGEST_LEN])
    } else {
        format!("{prefix}-{}", &digest[..DIGEST_LEN])
    }
}

/// Lowercases, maps anything outside `[a-z0-9-]` to `-`, collapses runs of
/// dashes and trims leading/trailing dashes.
fn sanitize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = false;
    for c in raw.chars() {
        let mapped = match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9') => c,
            _ => '-',
        };
        if mapped == '-' {
            if last_dash || out.is_empty() {
                continue;
            }
            last_dash = true;
        } else {
            last_dash = false;
        }
        out.push(mapped);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_owner_project_convention() {
        assert_eq!(pipeline_name("alice", "blog"), "alice-blog-pipeline");
        assert_eq!(deployment_name("alice", "blog"), "alice-blog-deployment");
        assert_eq!(repository_name("alice", "blog-repo"), "alice-blog-repo");
        assert_eq!(artifact_branch("blog"), "deploy/blog");
    }

    #[test]
    fn image_repository_joins_registry_and_base_name() {
        assert_eq!(
            image_repository("registry.example.com/apps/", "alice", "blog"),
            "registry.example.com/apps/alice-blog"
        );
        assert_eq!(image_repository("", "alice", "blog"), "alice-blog");
    }

    #[test]
    fn plain_names_are_kept() {
        assert_eq!(resource_base_name("alice", "blog"), "alice-blog");
        assert_eq!(resource_base_name("alice", "my-blog-2"), "alice-my-blog-2");
    }

    #[test]
    fn rewritten_names_are_dns_safe() {
        for (user, project) in [("Alice_B", "My Blog!"), ("__x", "--y--"), ("bob", "app_v2")] {
            let name = resource_base_name(user, project);
            assert!(name.len() <= BASE_NAME_MAX, "{name}");
            assert!(
                name.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "{name}"
            );
            assert!(!name.starts_with('-') && !name.ends_with('-'), "{name}");
        }
        assert!(resource_base_name("Alice_B", "My Blog!").starts_with("alice-b-my-blog-"));
    }

    #[test]
    fn distinct_owners_and_projects_never_share_a_name() {
        let long_a = "p".repeat(47);
        let long_b = "p".repeat(60);
        let pairs = [
            ("alice_b", "shop"),
            ("alice-b", "shop"),
            ("alice", "b-shop"),
            ("Alice", "shop"),
            ("alice", "shop"),
            ("alice", long_a.as_str()),
            ("alice", long_b.as_str()),
        ];

        let names: Vec<String> = pairs
            .iter()
            .map(|(user, project)| resource_base_name(user, project))
            .collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn rewritten_names_are_stable() {
        assert_eq!(
            resource_base_name("alice_b", "shop"),
            resource_base_name("alice_b", "shop")
        );
    }
}
