//! Provisioning of organization repositories that host generated artifacts.
//!
//! One call walks four steps: ensure the repository exists, ensure its
//! default branch has a commit, create the artifact branch from that commit,
//! then commit every file onto the branch one at a time. A failure at any
//! step aborts the call; nothing already created remotely is rolled back.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::github::{PutFile, RepositoryInfo, ScmError, SourceControl};

use super::ServiceError;

const SEED_PATH: &str = "README.md";

/// A file to commit, path relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: String,
    pub content: String,
}

impl ArtifactFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Provisioned {
    pub repository: RepositoryInfo,
    pub branch: String,
    /// The branch existed before this call and was reused.
    pub branch_reused: bool,
}

pub struct SourceControlService {
    scm: Arc<dyn SourceControl>,
    default_branch: String,
}

impl SourceControlService {
    #[must_use]
    pub fn new(scm: Arc<dyn SourceControl>, default_branch: impl Into<String>) -> Self {
        Self {
            scm,
            default_branch: default_branch.into(),
        }
    }

    pub async fn provision(
        &self,
        repository: &str,
        branch: &str,
        files: &[ArtifactFile],
    ) -> Result<Provisioned, ServiceError> {
        let repo = self.ensure_repository(repository).await?;
        let base_branch = repo
            .default_branch
            .clone()
            .unwrap_or_else(|| self.default_branch.clone());

        let base_sha = self.ensure_base_commit(repository, &base_branch).await?;
        let branch_reused = self.create_branch(repository, branch, &base_sha).await?;

        for file in files {
            retry_transient(&file.path, || self.upsert_file(repository, branch, file)).await?;
        }

        info!(
            repository,
            branch,
            files = files.len(),
            branch_reused,
            "Artifacts pushed"
        );
        Ok(Provisioned {
            repository: repo,
            branch: branch.to_string(),
            branch_reused,
        })
    }

    /// Gives `username` push access to `repository`.
    pub async fn grant_access(&self, repository: &str, username: &str) -> Result<(), ServiceError> {
        self.scm.add_collaborator(repository, username).await?;
        debug!(repository, username, "Collaborator invited");
        Ok(())
    }

    async fn ensure_repository(&self, name: &str) -> Result<RepositoryInfo, ServiceError> {
        if let Some(repo) = self.scm.get_repository(name).await? {
            return Ok(repo);
        }

        match self.scm.create_repository(name).await {
            Ok(repo) => {
                info!(repository = name, "Repository created");
                Ok(repo)
            }
            Err(ScmError::AlreadyExists(_)) => self
                .scm
                .get_repository(name)
                .await?
                .ok_or_else(|| ServiceError::Upstream {
                    service: "GitHub",
                    message: format!("repository {name} reported as existing but cannot be read"),
                }),
            Err(e) => Err(e.into()),
        }
    }

    /// Head of the default branch, seeding an empty repository with a README first.
    async fn ensure_base_commit(&self, repository: &str, branch: &str) -> Result<String, ServiceError> {
        match self.scm.get_branch_sha(repository, branch).await {
            Ok(sha) => return Ok(sha),
            Err(ScmError::EmptyRepository(_)) => {}
            Err(e) => return Err(e.into()),
        }

        debug!(repository, "Seeding empty repository");
        let readme = format!("# {repository}\n\nDeployment artifacts managed by shipwright.\n");
        self.scm
            .put_file(PutFile {
                repo: repository,
                path: SEED_PATH,
                content: &readme,
                message: "Initial commit",
                branch: None,
                sha: None,
            })
            .await?;

        match self.scm.get_branch_sha(repository, branch).await {
            Ok(sha) => Ok(sha),
            Err(ScmError::EmptyRepository(_)) => Err(ServiceError::Upstream {
                service: "GitHub",
                message: format!("repository {repository} is still empty after seeding"),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns whether an existing branch was reused.
    async fn create_branch(&self, repository: &str, branch: &str, sha: &str) -> Result<bool, ServiceError> {
        match self.scm.create_branch(repository, branch, sha).await {
            Ok(()) => Ok(false),
            Err(ScmError::AlreadyExists(_)) => {
                warn!(repository, branch, "Branch already exists, reusing it");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_file(
        &self,
        repository: &str,
        branch: &str,
        file: &ArtifactFile,
    ) -> Result<(), ScmError> {
        let sha = self
            .scm
            .get_file_sha(repository, &file.path, Some(branch))
            .await?;
        let message = if sha.is_some() {
            format!("Update {}", file.path)
        } else {
            format!("Add {}", file.path)
        };

        self.scm
            .put_file(PutFile {
                repo: repository,
                path: &file.path,
                content: &file.content,
                message: &message,
                branch: Some(branch),
                sha: sha.as_deref(),
            })
            .await
    }
}

async fn retry_transient<F, Fut>(what: &str, mut op: F) -> Result<(), ScmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ScmError>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            warn!(file = what, error = %e, "Commit failed, retrying once");
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory repository host with scriptable failures.
    #[derive(Default)]
    struct FakeScm {
        repos: Mutex<HashMap<String, Vec<String>>>,
        files: Mutex<HashMap<(String, String, String), String>>,
        empty: Mutex<Vec<String>>,
        put_failures: Mutex<u32>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeScm {
        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn info(name: &str) -> RepositoryInfo {
            RepositoryInfo {
                name: name.to_string(),
                full_name: format!("org/{name}"),
                html_url: format!("https://github.com/org/{name}"),
                clone_url: format!("https://github.com/org/{name}.git"),
                default_branch: Some("main".to_string()),
                private: true,
            }
        }
    }

    #[async_trait::async_trait]
    impl SourceControl for FakeScm {
        async fn get_repository(&self, name: &str) -> Result<Option<RepositoryInfo>, ScmError> {
            self.log(format!("get_repository {name}"));
            Ok(self
                .repos
                .lock()
                .unwrap()
                .contains_key(name)
                .then(|| Self::info(name)))
        }

        async fn create_repository(&self, name: &str) -> Result<RepositoryInfo, ScmError> {
            self.log(format!("create_repository {name}"));
            self.repos.lock().unwrap().insert(name.to_string(), vec![]);
            self.empty.lock().unwrap().push(name.to_string());
            Ok(Self::info(name))
        }

        async fn get_branch_sha(&self, repo: &str, branch: &str) -> Result<String, ScmError> {
            self.log(format!("get_branch_sha {repo} {branch}"));
            if self.empty.lock().unwrap().iter().any(|r| r == repo) {
                return Err(ScmError::EmptyRepository(repo.to_string()));
            }
            Ok("base-sha".to_string())
        }

        async fn create_branch(&self, repo: &str, branch: &str, _sha: &str) -> Result<(), ScmError> {
            self.log(format!("create_branch {repo} {branch}"));
            let mut repos = self.repos.lock().unwrap();
            let branches = repos.entry(repo.to_string()).or_default();
            if branches.iter().any(|b| b == branch) {
                return Err(ScmError::AlreadyExists(branch.to_string()));
            }
            branches.push(branch.to_string());
            Ok(())
        }

        async fn get_file_sha(
            &self,
            repo: &str,
            path: &str,
            branch: Option<&str>,
        ) -> Result<Option<String>, ScmError> {
            let key = (
                repo.to_string(),
                branch.unwrap_or("main").to_string(),
                path.to_string(),
            );
            Ok(self
                .files
                .lock()
                .unwrap()
                .get(&key)
                .map(|c| format!("sha-{}", c.len())))
        }

        async fn put_file(&self, request: PutFile<'_>) -> Result<(), ScmError> {
            self.log(format!(
                "put_file {} {} sha={}",
                request.path,
                request.branch.unwrap_or("main"),
                request.sha.unwrap_or("-")
            ));
            {
                let mut failures = self.put_failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(ScmError::Http {
                        status: 502,
                        message: "bad gateway".to_string(),
                    });
                }
            }
            self.empty.lock().unwrap().retain(|r| r != request.repo);
            self.files.lock().unwrap().insert(
                (
                    request.repo.to_string(),
                    request.branch.unwrap_or("main").to_string(),
                    request.path.to_string(),
                ),
                request.content.to_string(),
            );
            Ok(())
        }

        async fn add_collaborator(&self, repo: &str, username: &str) -> Result<(), ScmError> {
            self.log(format!("add_collaborator {repo} {username}"));
            Ok(())
        }
    }

    fn files() -> Vec<ArtifactFile> {
        vec![
            ArtifactFile::new("Dockerfile", "FROM nginx:alpine\n"),
            ArtifactFile::new("k8s-manifest.yaml", "kind: Deployment\n"),
        ]
    }

    #[tokio::test]
    async fn provisions_new_repository_from_scratch() {
        let scm = Arc::new(FakeScm::default());
        let service = SourceControlService::new(scm.clone(), "main");

        let outcome = service
            .provision("alice-blog-repo", "deploy/blog", &files())
            .await
            .unwrap();

        assert!(!outcome.branch_reused);
        assert_eq!(outcome.repository.name, "alice-blog-repo");
        assert_eq!(
            scm.calls(),
            vec![
                "get_repository alice-blog-repo",
                "create_repository alice-blog-repo",
                "get_branch_sha alice-blog-repo main",
                "put_file README.md main sha=-",
                "get_branch_sha alice-blog-repo main",
                "create_branch alice-blog-repo deploy/blog",
                "put_file Dockerfile deploy/blog sha=-",
                "put_file k8s-manifest.yaml deploy/blog sha=-",
            ]
        );
    }

    #[tokio::test]
    async fn existing_branch_is_reused_and_files_updated_in_place() {
        let scm = Arc::new(FakeScm::default());
        let service = SourceControlService::new(scm.clone(), "main");
        service
            .provision("alice-blog-repo", "deploy/blog", &files())
            .await
            .unwrap();

        let outcome = service
            .provision("alice-blog-repo", "deploy/blog", &files())
            .await
            .unwrap();

        assert!(outcome.branch_reused);
        let calls = scm.calls();
        assert_eq!(
            calls.iter().filter(|c| c.starts_with("create_repository")).count(),
            1
        );
        assert!(calls.contains(&"put_file Dockerfile deploy/blog sha=sha-18".to_string()));
    }

    #[tokio::test]
    async fn transient_commit_failure_is_retried_once() {
        let scm = Arc::new(FakeScm::default());
        scm.repos
            .lock()
            .unwrap()
            .insert("alice-blog-repo".to_string(), vec![]);
        *scm.put_failures.lock().unwrap() = 1;
        let service = SourceControlService::new(scm.clone(), "main");

        service
            .provision("alice-blog-repo", "deploy/blog", &files())
            .await
            .unwrap();

        let puts = scm
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("put_file Dockerfile"))
            .count();
        assert_eq!(puts, 2);
    }

    #[tokio::test]
    async fn repeated_transient_failure_aborts() {
        let scm = Arc::new(FakeScm::default());
        scm.repos
            .lock()
            .unwrap()
            .insert("alice-blog-repo".to_string(), vec![]);
        *scm.put_failures.lock().unwrap() = 2;
        let service = SourceControlService::new(scm.clone(), "main");

        let err = service
            .provision("alice-blog-repo", "deploy/blog", &files())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Upstream { .. }));
        assert!(!scm.calls().iter().any(|c| c.starts_with("put_file k8s")));
    }
}
