//! In-process app with recording GitHub and Jenkins stand-ins.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use shipwright::clients::github::{PutFile, RepositoryInfo, ScmError, SourceControl};
use shipwright::clients::jenkins::{BuildInfo, CiError, CiServer};
use shipwright::config::Config;
use shipwright::db::Store;
use shipwright::services::OtpMailer;
use shipwright::state::SharedState;

pub const PASSWORD: &str = "correct-horse-battery";

/// Every outbound call, in order, shared by both fakes.
#[derive(Default, Clone)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.0.lock().unwrap().iter().any(|c| c == call)
    }
}

#[derive(Default)]
pub struct RecordingScm {
    log: CallLog,
    repos: Mutex<HashSet<String>>,
    branches: Mutex<HashSet<(String, String)>>,
    files: Mutex<HashMap<(String, String, String), String>>,
}

impl RecordingScm {
    fn info(name: &str) -> RepositoryInfo {
        RepositoryInfo {
            name: name.to_string(),
            full_name: format!("acme/{name}"),
            html_url: format!("https://github.com/acme/{name}"),
            clone_url: format!("https://github.com/acme/{name}.git"),
            default_branch: Some("main".to_string()),
            private: true,
        }
    }

    pub fn file(&self, repo: &str, branch: &str, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&(repo.to_string(), branch.to_string(), path.to_string()))
            .cloned()
    }
}

#[async_trait::async_trait]
impl SourceControl for RecordingScm {
    async fn get_repository(&self, name: &str) -> Result<Option<RepositoryInfo>, ScmError> {
        self.log.push(format!("scm get_repository {name}"));
        Ok(self
            .repos
            .lock()
            .unwrap()
            .contains(name)
            .then(|| Self::info(name)))
    }

    async fn create_repository(&self, name: &str) -> Result<RepositoryInfo, ScmError> {
        self.log.push(format!("scm create_repository {name}"));
        self.repos.lock().unwrap().insert(name.to_string());
        Ok(Self::info(name))
    }

    async fn get_branch_sha(&self, repo: &str, branch: &str) -> Result<String, ScmError> {
        self.log.push(format!("scm get_branch_sha {repo} {branch}"));
        let has_commits = self
            .files
            .lock()
            .unwrap()
            .keys()
            .any(|(r, _, _)| r == repo);
        if has_commits {
            Ok("head-sha".to_string())
        } else {
            Err(ScmError::EmptyRepository(repo.to_string()))
        }
    }

    async fn create_branch(&self, repo: &str, branch: &str, _sha: &str) -> Result<(), ScmError> {
        self.log.push(format!("scm create_branch {repo} {branch}"));
        if !self
            .branches
            .lock()
            .unwrap()
            .insert((repo.to_string(), branch.to_string()))
        {
            return Err(ScmError::AlreadyExists(branch.to_string()));
        }
        Ok(())
    }

    async fn get_file_sha(
        &self,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Option<String>, ScmError> {
        let branch = branch.unwrap_or("main");
        Ok(self.file(repo, branch, path).map(|c| format!("sha-{}", c.len())))
    }

    async fn put_file(&self, request: PutFile<'_>) -> Result<(), ScmError> {
        let branch = request.branch.unwrap_or("main");
        self.log.push(format!(
            "scm put_file {} {} {}",
            request.repo, branch, request.path
        ));
        self.files.lock().unwrap().insert(
            (
                request.repo.to_string(),
                branch.to_string(),
                request.path.to_string(),
            ),
            request.content.to_string(),
        );
        Ok(())
    }

    async fn add_collaborator(&self, repo: &str, username: &str) -> Result<(), ScmError> {
        self.log.push(format!("scm add_collaborator {repo} {username}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingCi {
    log: CallLog,
    views: Mutex<HashSet<String>>,
    jobs: Mutex<HashMap<String, u32>>,
}

#[async_trait::async_trait]
impl CiServer for RecordingCi {
    async fn view_exists(&self, view: &str) -> Result<bool, CiError> {
        Ok(self.views.lock().unwrap().contains(view))
    }

    async fn create_view(&self, view: &str, _config_xml: &str) -> Result<(), CiError> {
        self.log.push(format!("ci create_view {view}"));
        self.views.lock().unwrap().insert(view.to_string());
        Ok(())
    }

    async fn add_job_to_view(&self, view: &str, job: &str) -> Result<(), CiError> {
        self.log.push(format!("ci add_job_to_view {view} {job}"));
        Ok(())
    }

    async fn create_job(&self, job: &str, _config_xml: &str) -> Result<(), CiError> {
        self.log.push(format!("ci create_job {job}"));
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(job) {
            return Err(CiError::AlreadyExists(job.to_string()));
        }
        jobs.insert(job.to_string(), 0);
        Ok(())
    }

    async fn delete_job(&self, job: &str) -> Result<(), CiError> {
        self.log.push(format!("ci delete_job {job}"));
        self.jobs
            .lock()
            .unwrap()
            .remove(job)
            .map(|_| ())
            .ok_or_else(|| CiError::NotFound(job.to_string()))
    }

    async fn get_job_config(&self, job: &str) -> Result<String, CiError> {
        Err(CiError::NotFound(job.to_string()))
    }

    async fn update_job_config(&self, job: &str, _config_xml: &str) -> Result<(), CiError> {
        self.log.push(format!("ci update_job_config {job}"));
        Ok(())
    }

    async fn build_job(&self, job: &str) -> Result<(), CiError> {
        self.log.push(format!("ci build_job {job}"));
        let mut jobs = self.jobs.lock().unwrap();
        let builds = jobs
            .get_mut(job)
            .ok_or_else(|| CiError::NotFound(job.to_string()))?;
        *builds += 1;
        Ok(())
    }

    async fn get_build(&self, job: &str, number: u32) -> Result<BuildInfo, CiError> {
        self.log.push(format!("ci get_build {job} {number}"));
        Ok(BuildInfo {
            number,
            result: Some("SUCCESS".to_string()),
            building: false,
            duration_ms: 42_000,
            timestamp: 0,
            url: format!("http://jenkins.test/job/{job}/{number}/"),
        })
    }
}

#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingMailer {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait::async_trait]
impl OtpMailer for CapturingMailer {
    async fn send_otp(&self, email: &str, code: &str, _ttl_secs: u64) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub log: CallLog,
    pub scm: Arc<RecordingScm>,
    pub mailer: Arc<CapturingMailer>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.github.organization = "acme".to_string();
    config.jenkins.registry = "registry.test".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app() -> TestApp {
    let config = test_config();
    let store = Store::with_pool_options(&config.general.database_path, 1, 1)
        .await
        .expect("failed to open store");

    let log = CallLog::default();
    let scm = Arc::new(RecordingScm {
        log: log.clone(),
        ..RecordingScm::default()
    });
    let ci = Arc::new(RecordingCi {
        log: log.clone(),
        ..RecordingCi::default()
    });
    let mailer = Arc::new(CapturingMailer::default());

    let shared = SharedState::with_clients(config, store, scm.clone(), ci, mailer.clone());
    let state = shipwright::api::create_app_state(Arc::new(shared), None);

    TestApp {
        router: shipwright::api::router(state),
        log,
        scm,
        mailer,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Registers `username` and returns an access token.
    pub async fn sign_up(&self, username: &str) -> String {
        let email = format!("{username}@example.com");
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "username": username, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");

        let (status, body) = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "login": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {username}: {body}");
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn link_source_control(&self, token: &str, username: &str) {
        let (status, body) = self
            .request(
                "PUT",
                &format!("/api/users/{username}/source-control"),
                Some(token),
                Some(json!({ "username": format!("{username}-gh"), "accessToken": "ghp_test" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "link {username}: {body}");
    }
}
