//! Static files and compiled assets through the router.

use axum::http::StatusCode;
use std::fs;

use hive_sdk::AssetWatcher;

use super::test_utils::{get, TestProject, UppercaseCompiler};

#[tokio::test]
async fn test_static_file_from_disk() {
    let project = TestProject::new();
    project.write("static/img/logo.svg", "<svg/>");

    let response = get(project.router(), "/static/img/logo.svg").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), "image/svg+xml");
    assert_eq!(response.headers.get("cache-control").unwrap(), "no-cache");
    assert_eq!(response.body, "<svg/>");
}

#[tokio::test]
async fn test_favicon_and_robots() {
    let project = TestProject::new();
    project.write("static/robots.txt", "User-agent: *\n");

    let robots = get(project.router(), "/robots.txt").await;
    assert_eq!(robots.status, StatusCode::OK);
    assert_eq!(robots.body, "User-agent: *\n");

    let favicon = get(project.router(), "/favicon.ico").await;
    assert_eq!(favicon.status, StatusCode::NOT_FOUND);

    project.write("static/favicon.ico", "ico");
    let favicon = get(project.router(), "/favicon.ico").await;
    assert_eq!(favicon.status, StatusCode::OK);
    assert_eq!(favicon.content_type(), "image/x-icon");
}

#[tokio::test]
async fn test_traversal_is_not_found() {
    let project = TestProject::new();
    project.write_app("routes: []\n");
    project.write("static/site.txt", "ok");

    let response = get(project.router(), "/static/..%2Fapp.yaml").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(!response.body.contains("api_secret_key"));

    let response = get(project.router(), "/static/img").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_compiled_asset_served_from_cache() {
    let project = TestProject::new();
    project.write("static/css/site.scss", "body { color: red }");
    project.write("static/js/app.coffee", "alert 1");

    // before the first scan nothing is served
    let css = get(project.router(), "/static/css/site.css").await;
    assert_eq!(css.status, StatusCode::NOT_FOUND);

    let mut watcher =
        AssetWatcher::for_project(&project.layout(), project.cache().clone(), UppercaseCompiler);
    let report = watcher.scan();
    assert_eq!(report.compiled, 2);

    let css = get(project.router(), "/static/css/site.css").await;
    assert_eq!(css.status, StatusCode::OK);
    assert_eq!(css.content_type(), "text/css; charset=utf-8");
    assert_eq!(css.body, "BODY { COLOR: RED }");

    let js = get(project.router(), "/static/js/app.js").await;
    assert_eq!(js.status, StatusCode::OK);
    assert_eq!(js.content_type(), "application/javascript; charset=utf-8");
    assert_eq!(js.body, "ALERT 1");

    // raw sources are never exposed
    let raw = get(project.router(), "/static/css/site.scss").await;
    assert_eq!(raw.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleted_source_stops_being_served() {
    let project = TestProject::new();
    let source = project.write("static/css/theme.less", "a {}");

    let mut watcher =
        AssetWatcher::for_project(&project.layout(), project.cache().clone(), UppercaseCompiler);
    watcher.scan();
    assert_eq!(
        get(project.router(), "/static/css/theme.css").await.status,
        StatusCode::OK
    );

    fs::remove_file(source).unwrap();
    let report = watcher.scan();
    assert_eq!(report.removed, 1);
    assert_eq!(
        get(project.router(), "/static/css/theme.css").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_failed_compile_is_not_served() {
    let project = TestProject::new();
    project.write("static/css/broken.scss", "BROKEN {");

    let mut watcher =
        AssetWatcher::for_project(&project.layout(), project.cache().clone(), UppercaseCompiler);
    let report = watcher.scan();
    assert_eq!(report.failed, 1);

    let response = get(project.router(), "/static/css/broken.css").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
