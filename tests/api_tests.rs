mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{PASSWORD, spawn_app};

fn blog_request() -> Value {
    json!({
        "repoName": "blog-repo",
        "repositoryUrl": "https://github.com/alice/blog",
        "framework": "React",
        "description": "Personal blog",
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;

    let (status, body) = app.request("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = spawn_app().await;

    let (status, body) = app.request("GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .request("GET", "/api/users/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_account_is_admin() {
    let app = spawn_app().await;
    let admin = app.sign_up("root").await;
    let alice = app.sign_up("alice").await;

    let (_, me) = app.request("GET", "/api/users/me", Some(&admin), None).await;
    assert_eq!(me["data"]["role"], "admin");

    let (_, me) = app.request("GET", "/api/users/me", Some(&alice), None).await;
    assert_eq!(me["data"]["role"], "user");

    let (status, _) = app.request("GET", "/api/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app.request("GET", "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deploy_provisions_repository_pipeline_and_build() {
    let app = spawn_app().await;
    let _admin = app.sign_up("root").await;
    let alice = app.sign_up("alice").await;
    app.link_source_control(&alice, "alice").await;

    let (status, body) = app
        .request("POST", "/api/deploy/blog", Some(&alice), Some(blog_request()))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["message"].as_str().unwrap().contains("blog"));

    let data = &body["data"];
    assert_eq!(data["repositoryName"], "alice-blog-repo");
    assert_eq!(data["branch"], "deploy/blog");
    assert_eq!(data["pipelineName"], "alice-blog-pipeline");
    assert_eq!(data["deploymentName"], "alice-blog-deployment");
    assert_eq!(data["buildNumber"], 1);

    let dockerfile = app
        .scm
        .file("alice-blog-repo", "deploy/blog", "Dockerfile")
        .expect("Dockerfile pushed");
    assert!(dockerfile.contains("npm run build"));
    let manifest = app
        .scm
        .file("alice-blog-repo", "deploy/blog", "k8s-manifest.yaml")
        .expect("manifest pushed");
    assert!(manifest.contains("registry.test/alice-blog:latest"));

    assert!(app.log.contains("scm add_collaborator alice-blog-repo alice-gh"));
    assert!(app.log.contains("ci create_job alice-blog-pipeline"));
    assert!(app.log.contains("ci build_job alice-blog-pipeline"));

    let (status, project) = app
        .request("GET", "/api/projects/alice/blog", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        project["data"]["orgRepositoryUrl"],
        "https://github.com/acme/alice-blog-repo"
    );

    let (status, deployments) = app
        .request("GET", "/api/deployments/alice/blog", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deployments["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn repeated_deploy_is_rejected_before_any_remote_call() {
    let app = spawn_app().await;
    let _admin = app.sign_up("root").await;
    let alice = app.sign_up("alice").await;
    app.link_source_control(&alice, "alice").await;

    let (status, _) = app
        .request("POST", "/api/deploy/blog", Some(&alice), Some(blog_request()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let calls_after_first = app.log.len();

    let (status, body) = app
        .request("POST", "/api/deploy/blog", Some(&alice), Some(blog_request()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.log.len(), calls_after_first);
}

#[tokio::test]
async fn deploy_without_port_for_backend_fails_before_pushing() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;
    app.link_source_control(&alice, "alice").await;

    let (status, _) = app
        .request(
            "POST",
            "/api/deploy/api",
            Some(&alice),
            Some(json!({
                "repoName": "api",
                "repositoryUrl": "https://github.com/alice/api",
                "framework": "Node.js",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.log.calls().iter().all(|c| !c.starts_with("scm put_file")));
}

#[tokio::test]
async fn projects_are_scoped_to_their_owner() {
    let app = spawn_app().await;
    let admin = app.sign_up("root").await;
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;

    let (status, _) = app
        .request(
            "POST",
            "/api/projects/alice",
            Some(&alice),
            Some(json!({
                "projectName": "shop",
                "repositoryUrl": "https://github.com/alice/shop",
                "framework": "Vue",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request("GET", "/api/projects/alice/shop", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("GET", "/api/projects/alice/shop", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("GET", "/api/projects/alice/shop", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request("DELETE", "/api/projects/alice/shop", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pipeline_for_missing_project_never_reaches_ci() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;

    let (status, _) = app
        .request("POST", "/api/pipelines/ghost", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.log.calls().iter().all(|c| !c.starts_with("ci ")));
}

#[tokio::test]
async fn builds_are_counted_and_status_is_range_checked() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;
    app.link_source_control(&alice, "alice").await;

    let (status, _) = app
        .request("POST", "/api/deploy/blog", Some(&alice), Some(blog_request()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            "POST",
            "/api/pipelines/blog/alice-blog-pipeline",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lastBuildNumber"], 2);

    let (status, body) = app
        .request(
            "GET",
            "/api/pipelines/blog/alice-blog-pipeline/2/status",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], "SUCCESS");

    let calls = app.log.len();
    for build in ["3", "0", "latest"] {
        let (status, _) = app
            .request(
                "GET",
                &format!("/api/pipelines/blog/alice-blog-pipeline/{build}/status"),
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "build {build}");
    }
    assert_eq!(app.log.len(), calls);
}

#[tokio::test]
async fn otp_password_reset_flow() {
    let app = spawn_app().await;
    let _ = app.sign_up("alice").await;

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/sendOtp",
            None,
            Some(json!({ "email": "alice@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = app.mailer.last_code_for("alice@example.com").unwrap();

    let (status, _) = app
        .request(
            "PUT",
            "/api/auth/resetPassword",
            None,
            Some(json!({ "email": "alice@example.com", "newPassword": "brand-new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/verifyOtp",
            None,
            Some(json!({ "email": "alice@example.com", "otp": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            "PUT",
            "/api/auth/resetPassword",
            None,
            Some(json!({ "email": "alice@example.com", "newPassword": "brand-new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "login": "alice", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "login": "alice@example.com", "password": "brand-new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn generate_endpoints_render_without_side_effects() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;

    let (status, body) = app
        .request(
            "POST",
            "/api/generate/dockerfile",
            Some(&alice),
            Some(json!({ "framework": "html" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["content"].as_str().unwrap().contains("FROM"));
    assert_eq!(app.log.len(), 0);
}

#[tokio::test]
async fn deploy_accepts_the_longest_project_name() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;
    app.link_source_control(&alice, "alice").await;
    let project = "p".repeat(50);

    let (status, body) = app
        .request(
            "POST",
            &format!("/api/deploy/{project}"),
            Some(&alice),
            Some(blog_request()),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["data"]["deploymentName"],
        format!("alice-{project}-deployment")
    );
    assert!(app.log.contains(&format!("ci build_job alice-{project}-pipeline")));
}

#[tokio::test]
async fn deploy_with_oversized_repository_name_makes_no_remote_call() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;
    app.link_source_control(&alice, "alice").await;

    let mut request = blog_request();
    request["repoName"] = json!("r".repeat(65));
    let (status, _) = app
        .request("POST", "/api/deploy/blog", Some(&alice), Some(request))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.log.len(), 0);
}

#[tokio::test]
async fn malformed_bodies_get_the_json_error_envelope() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;

    let (status, body) = app
        .request(
            "POST",
            "/api/deploy/blog",
            Some(&alice),
            Some(json!({ "repoName": "blog-repo" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(
        body["message"].as_str().unwrap().contains("repositoryUrl"),
        "{body}"
    );

    let (status, body) = app
        .request("POST", "/api/auth/login", None, Some(json!({ "login": 7 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.log.len(), 0);
}

#[tokio::test]
async fn pipelines_and_deployments_are_scoped_to_their_owner() {
    let app = spawn_app().await;
    let _admin = app.sign_up("root").await;
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;
    app.link_source_control(&alice, "alice").await;

    let (status, _) = app
        .request("POST", "/api/deploy/blog", Some(&alice), Some(blog_request()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let calls = app.log.len();

    let pipeline = "/api/pipelines/blog/alice-blog-pipeline?username=alice";
    let attempts = [
        ("POST", "/api/pipelines/blog?username=alice".to_string(), None),
        ("POST", pipeline.to_string(), None),
        ("PUT", pipeline.to_string(), Some(json!({ "script": "echo hi" }))),
        ("DELETE", pipeline.to_string(), None),
        ("POST", "/api/deployments/alice/blog".to_string(), None),
        (
            "PUT",
            "/api/deployments/alice/blog/alice-blog-deployment".to_string(),
            Some(json!({ "status": "Failed" })),
        ),
        (
            "DELETE",
            "/api/deployments/alice/blog/alice-blog-deployment".to_string(),
            None,
        ),
        ("DELETE", "/api/deployments/alice/blog".to_string(), None),
    ];
    for (method, uri, body) in attempts {
        let (status, response) = app.request(method, &uri, Some(&bob), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}: {response}");
        assert_eq!(response["success"], false);
    }
    assert_eq!(app.log.len(), calls);

    let (status, deployment) = app
        .request(
            "GET",
            "/api/deployments/alice/blog/alice-blog-deployment",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deployment["data"]["status"], "Waiting");
}

#[tokio::test]
async fn deploy_without_linked_source_control_stops_after_the_push() {
    let app = spawn_app().await;
    let alice = app.sign_up("alice").await;

    let (status, body) = app
        .request("POST", "/api/deploy/blog", Some(&alice), Some(blog_request()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(body["success"], false);

    assert!(app.scm.file("alice-blog-repo", "deploy/blog", "Dockerfile").is_some());
    let calls = app.log.calls();
    assert!(calls.iter().all(|c| !c.starts_with("scm add_collaborator")));
    assert!(calls.iter().all(|c| !c.starts_with("ci ")));
}
