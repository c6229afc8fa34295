use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde_json::json;

use bookmark_gitlab::{exclude_validator, ClientOptions, FetchError, GitLabClient, GroupProject};
use bookmark_secrets::Credentials;

const PAT: &str = "pat-secret";
// deployer:deploy-secret
const DEPLOY_BASIC: &str = "Basic ZGVwbG95ZXI6ZGVwbG95LXNlY3JldA==";

#[derive(Default)]
struct Hits {
    locked_group: AtomicUsize,
    flaky: AtomicUsize,
    broken: AtomicUsize,
    forbidden: AtomicUsize,
}

type Shared = Arc<Hits>;

async fn group_projects(
    State(hits): State<Shared>,
    Path(group): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if group == "locked" {
        hits.locked_group.fetch_add(1, Ordering::SeqCst);
        return (StatusCode::UNAUTHORIZED, "401 Unauthorized").into_response();
    }
    let token = headers
        .get("PRIVATE-TOKEN")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if token != PAT || query.get("include_subgroups").map(String::as_str) != Some("true") {
        return (StatusCode::UNAUTHORIZED, "401 Unauthorized").into_response();
    }
    let page = query.get("page").map(String::as_str).unwrap_or("1");
    match page {
        "1" => {
            let body = json!([
                {"id": 1, "name": "team-a", "path_with_namespace": "bookmarks/team-a"},
                {"id": 2, "name": "team-b", "path_with_namespace": "bookmarks/sub/team-b"}
            ]);
            ([("x-next-page", "2")], Json(body)).into_response()
        }
        _ => {
            let body = json!([
                {
                    "id": 3,
                    "name": "bookmark-data-validator",
                    "path_with_namespace": "bookmarks/bookmark-data-validator",
                    "visibility": "internal"
                }
            ]);
            ([("x-next-page", "")], Json(body)).into_response()
        }
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
}

fn blob(path: &str) -> serde_json::Value {
    json!({ "id": "0", "name": path.rsplit('/').next(), "type": "blob", "path": path, "mode": "100644" })
}

async fn tree(
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let token = headers
        .get("PRIVATE-TOKEN")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if token != PAT {
        return (StatusCode::UNAUTHORIZED, "401 Unauthorized").into_response();
    }
    if query.get("recursive").map(String::as_str) != Some("true")
        || query.get("ref").map(String::as_str) != Some("main")
    {
        return (StatusCode::BAD_REQUEST, "unexpected request").into_response();
    }
    let page = query.get("page").map(String::as_str).unwrap_or("1");
    match (id, page) {
        (1, "1") => {
            let body = json!([
                { "id": "0", "name": "data", "type": "tree", "path": "data", "mode": "040000" },
                blob(".gitlab-ci.yml"),
                blob("bookmarks.yml")
            ]);
            ([("x-next-page", "2")], Json(body)).into_response()
        }
        (1, _) => {
            let body = json!([blob("data/extra.yaml"), blob("README.md")]);
            ([("x-next-page", "")], Json(body)).into_response()
        }
        (2, _) => not_found("404 Tree Not Found"),
        (5, _) => not_found("404 Project Not Found"),
        (8, _) => Json(json!([blob("bookmarks.yml"), blob("gone.yml")])).into_response(),
        _ => Json(json!([blob("bookmarks.yml")])).into_response(),
    }
}

async fn raw_file(
    State(hits): State<Shared>,
    Path((id, file)): Path<(u64, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != DEPLOY_BASIC {
        return (StatusCode::UNAUTHORIZED, "401 Unauthorized").into_response();
    }
    if query.get("ref").map(String::as_str) != Some("main") {
        return (StatusCode::BAD_REQUEST, "unexpected request").into_response();
    }
    match id {
        1 | 8 if file != "gone.yml" => (StatusCode::OK, format!("# {id}/{file}\n")).into_response(),
        3 => {
            if hits.flaky.fetch_add(1, Ordering::SeqCst) == 0 {
                (StatusCode::SERVICE_UNAVAILABLE, "try later").into_response()
            } else {
                (StatusCode::OK, "[]\n").into_response()
            }
        }
        4 => {
            hits.broken.fetch_add(1, Ordering::SeqCst);
            (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
        }
        6 => {
            hits.forbidden.fetch_add(1, Ordering::SeqCst);
            (StatusCode::FORBIDDEN, Json(json!({ "message": "403 Forbidden" }))).into_response()
        }
        7 => not_found("404 Project Not Found"),
        8 => not_found("404 File Not Found"),
        _ => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, "[]\n").into_response()
        }
    }
}

async fn spawn_server() -> (String, Shared) {
    let hits: Shared = Arc::new(Hits::default());
    let app = Router::new()
        .route("/api/v4/groups/:group/projects", get(group_projects))
        .route("/api/v4/projects/:id/repository/tree", get(tree))
        .route(
            "/api/v4/projects/:id/repository/files/:file/raw",
            get(raw_file),
        )
        .with_state(hits.clone());
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{bound}"), hits)
}

fn client(server: &str, timeout: Duration) -> GitLabClient {
    GitLabClient::new(
        server,
        Credentials::from_plaintext("deployer", "deploy-secret", PAT),
        ClientOptions {
            timeout,
            max_retries: 2,
            backoff_base: Duration::from_millis(1),
            concurrency: 3,
        },
    )
    .unwrap()
}

fn project(id: u64, path: &str) -> GroupProject {
    GroupProject {
        id,
        name: path.to_string(),
        path_with_namespace: path.to_string(),
    }
}

#[tokio::test]
async fn lists_every_page_and_skips_the_validator() {
    let (server, _) = spawn_server().await;
    let client = client(&server, Duration::from_secs(5));
    let projects = client.list_group_projects("42").await.unwrap();
    assert_eq!(projects.len(), 3);
    let kept = exclude_validator(projects, "data-validator");
    let paths: Vec<&str> = kept
        .iter()
        .map(|p| p.path_with_namespace.as_str())
        .collect();
    assert_eq!(paths, vec!["bookmarks/team-a", "bookmarks/sub/team-b"]);
}

#[tokio::test]
async fn authorization_failures_are_not_retried() {
    let (server, hits) = spawn_server().await;
    let client = client(&server, Duration::from_secs(5));
    let err = client.list_group_projects("locked").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(hits.locked_group.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tree_pages_are_followed_and_files_classified() {
    let (server, _) = spawn_server().await;
    let client = client(&server, Duration::from_secs(5));
    let files = client
        .fetch_project_files(&project(1, "g/present"), "main")
        .await
        .unwrap();
    let paths: Vec<&str> = files.yaml.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["bookmarks.yml", "data/extra.yaml"]);
    assert_eq!(files.yaml[1].content, b"# 1/data/extra.yaml\n".to_vec());
    assert_eq!(files.foreign, vec!["README.md".to_string()]);
}

#[tokio::test]
async fn per_project_outcomes_keep_listing_order() {
    let (server, hits) = spawn_server().await;
    let client = client(&server, Duration::from_secs(5));
    let projects = vec![
        project(1, "g/present"),
        project(2, "g/empty"),
        project(3, "g/flaky"),
        project(4, "g/broken"),
        project(5, "g/moved"),
        project(6, "g/forbidden"),
        project(7, "g/vanished"),
        project(8, "g/stale-tree"),
    ];
    let fetched = client.fetch_bookmark_files(projects, "main").await;
    let order: Vec<u64> = fetched.iter().map(|f| f.project.id).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5, 6, 7, 8]);

    match &fetched[0].outcome {
        Ok(files) => assert_eq!(files.yaml.len(), 2),
        other => panic!("unexpected outcome {other:?}"),
    }
    match &fetched[1].outcome {
        Ok(files) => assert!(files.is_empty()),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(&fetched[2].outcome, Ok(files) if files.yaml.len() == 1));
    assert_eq!(hits.flaky.load(Ordering::SeqCst), 2);
    match &fetched[3].outcome {
        Err(err) => assert_eq!(err.status(), Some(500)),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(hits.broken.load(Ordering::SeqCst), 3);
    match &fetched[7].outcome {
        Ok(files) => {
            let paths: Vec<&str> = files.yaml.iter().map(|f| f.path.as_str()).collect();
            assert_eq!(paths, vec!["bookmarks.yml"]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn project_not_found_is_an_error_not_an_absent_file() {
    let (server, _) = spawn_server().await;
    let client = client(&server, Duration::from_secs(5));
    let err = client
        .fetch_project_files(&project(5, "g/moved"), "main")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("404 Project Not Found"));

    let err = client
        .fetch_file(7, "bookmarks.yml", "main")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(client.fetch_file(8, "gone.yml", "main").await.unwrap().is_none());
}

#[tokio::test]
async fn forbidden_file_fetch_fails_the_project_without_retry() {
    let (server, hits) = spawn_server().await;
    let client = client(&server, Duration::from_secs(5));
    let err = client
        .fetch_project_files(&project(6, "g/forbidden"), "main")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(hits.forbidden.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slow_responses_surface_as_timeouts() {
    let (server, _) = spawn_server().await;
    let client = client(&server, Duration::from_millis(100));
    let err = client
        .fetch_file(9, "bookmarks.yml", "main")
        .await
        .unwrap_err();
    match err {
        FetchError::Transport(inner) => assert!(inner.is_timeout()),
        other => panic!("unexpected error {other}"),
    }
}
