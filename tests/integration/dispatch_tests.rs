//! Page dispatch through the full router.
//!
//! Tests verify:
//! - Welcome site when the project has no routes
//! - Route matching, converters and custom 404 pages
//! - Manifest edits applying without a restart
//! - Content merging and request helpers
//! - CMS helpers against a signed mock API
//! - Error responses

use axum::http::StatusCode;

use super::test_utils::{get, MockApi, TestProject};

// =============================================================================
// Welcome Site
// =============================================================================

#[tokio::test]
async fn test_welcome_site_without_project_file() {
    let project = TestProject::new();

    let home = get(project.router(), "/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.content_type().starts_with("text/html"));
    assert!(home.body.contains("Your site is running"));

    let other = get(project.router(), "/anything/else").await;
    assert_eq!(other.status, StatusCode::NOT_FOUND);
    assert!(other.body.contains("Your site is running"));
}

#[tokio::test]
async fn test_welcome_site_with_empty_routes() {
    let project = TestProject::new();
    project.write_app("routes: []\n");

    let home = get(project.router(), "/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("Your site is running"));
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_route_renders_its_own_template() {
    let project = TestProject::new();
    project.write_app(
        "routes:\n\
         \x20 - rule: /\n\
         \x20   template: index.html\n\
         \x20 - rule: /about\n\
         \x20   template: about.html\n",
    );
    project.write("templates/index.html", "home page");
    project.write("templates/about.html", "about page");

    let home = get(project.router(), "/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert_eq!(home.body, "home page");
    assert_eq!(home.headers.get("cache-control").unwrap(), "no-cache");

    let about = get(project.router(), "/about").await;
    assert_eq!(about.body, "about page");
}

#[tokio::test]
async fn test_converters_and_custom_not_found() {
    let project = TestProject::new();
    project.write_app(
        "routes:\n\
         \x20 - rule: /posts/<int:id>\n\
         \x20   template: post.txt\n\
         \x20 - rule: /docs/<path:rest>\n\
         \x20   template: doc.txt\n\
         \x20 - rule: 404\n\
         \x20   template: missing.html\n",
    );
    project.write("templates/post.txt", "post {{ path(name='id') }}");
    project.write("templates/doc.txt", "doc {{ path(name='rest') }}");
    project.write("templates/missing.html", "<h1>Nothing here</h1>");

    let post = get(project.router(), "/posts/42").await;
    assert_eq!(post.status, StatusCode::OK);
    assert_eq!(post.body, "post 42");
    assert!(post.content_type().starts_with("text/plain"));

    let doc = get(project.router(), "/docs/guide/install/linux").await;
    assert_eq!(doc.body, "doc guide/install/linux");

    let bad = get(project.router(), "/posts/forty-two").await;
    assert_eq!(bad.status, StatusCode::NOT_FOUND);
    assert_eq!(bad.body, "<h1>Nothing here</h1>");
}

#[tokio::test]
async fn test_plain_not_found_without_404_entry() {
    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /\n    template: index.html\n");
    project.write("templates/index.html", "home");

    let response = get(project.router(), "/missing").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, "Not Found");
}

#[tokio::test]
async fn test_trailing_slash_is_optional() {
    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /team/\n    template: team.html\n");
    project.write("templates/team.html", "team");

    assert_eq!(get(project.router(), "/team").await.body, "team");
    assert_eq!(get(project.router(), "/team/").await.body, "team");
}

#[tokio::test]
async fn test_manifest_edits_apply_without_restart() {
    let project = TestProject::new();
    project.write("templates/one.html", "one");
    project.write("templates/two.html", "two");
    project.write_app("routes:\n  - rule: /\n    template: one.html\n");

    let router = project.router();
    assert_eq!(get(router.clone(), "/").await.body, "one");

    project.write_app("routes:\n  - rule: /\n    template: two.html\n");
    assert_eq!(get(router.clone(), "/").await.body, "two");

    project.write("templates/two.html", "two, edited");
    assert_eq!(get(router, "/").await.body, "two, edited");
}

#[tokio::test]
async fn test_template_inheritance_across_directories() {
    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /\n    template: pages/index.html\n");
    project.write(
        "templates/layouts/base.html",
        "<main>{% block body %}{% endblock %}</main>",
    );
    project.write(
        "templates/pages/index.html",
        "{% extends \"layouts/base.html\" %}{% block body %}hi{% endblock %}",
    );

    let response = get(project.router(), "/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "<main>hi</main>");
}

// =============================================================================
// Content and Helpers
// =============================================================================

#[tokio::test]
async fn test_content_files_merge_in_order() {
    let project = TestProject::new();
    project.write_app(
        "routes:\n\
         \x20 - rule: /\n\
         \x20   template: index.html\n\
         \x20   content: [site.yaml, home.json, missing.yaml]\n",
    );
    project.write("content/site.yaml", "title: Site\ntagline: Old\n");
    project.write("content/home.json", r#"{"tagline": "New"}"#);
    project.write(
        "templates/index.html",
        "{{ content.title }}|{{ content.tagline }}|{{ deployment }}",
    );

    let response = get(project.router(), "/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "Site|New|sdk");
}

#[tokio::test]
async fn test_query_and_path_helpers() {
    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /search/<section>\n    template: search.txt\n");
    project.write(
        "templates/search.txt",
        "{{ get(name='q') }}|{{ get_list(name='tag') | join(sep=',') }}|\
         {{ get(name='sort', default='recent') }}|{{ path() }}|{{ path(index=0) }}|\
         {{ static_url(path='css/site.css') }}",
    );

    let response = get(
        project.router(),
        "/search/all%20posts?q=rust&tag=a&tag=b",
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        "rust|a,b|recent|/search/all posts|search|/static/css/site.css"
    );
}

#[tokio::test]
async fn test_markdown_route() {
    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /readme\n    template: readme.md\n");
    project.write("templates/readme.md", "# Readme\n\n- [x] done\n");

    let response = get(project.router(), "/readme").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type().starts_with("text/html"));
    assert!(response.body.contains("<h1>Readme</h1>"));
    assert!(response.body.contains("checkbox"));
}

#[tokio::test]
async fn test_markdown_filter_is_not_escaped() {
    let project = TestProject::new();
    project.write_app(
        "routes:\n  - rule: /\n    template: index.html\n    content: page.yaml\n",
    );
    project.write("content/page.yaml", "body: \"Some *emphasis*\"\n");
    project.write("templates/index.html", "{{ content.body | markdown }}");

    let response = get(project.router(), "/").await;
    assert!(response.body.contains("<em>emphasis</em>"));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_broken_template_is_500() {
    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /\n    template: index.html\n");
    project.write("templates/index.html", "{% if %}");

    let response = get(project.router(), "/").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, "Internal Server Error");
}

#[tokio::test]
async fn test_unparsable_project_file_is_500() {
    let project = TestProject::new();
    project.write("app.yaml", "routes: [unclosed");

    let response = get(project.router(), "/").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    // fixing the file fixes the site
    project.write_app("routes:\n  - rule: /\n    template: index.html\n");
    project.write("templates/index.html", "back");
    assert_eq!(get(project.router(), "/").await.body, "back");
}

// =============================================================================
// CMS Helpers
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_cms_helpers_query_signed_api() {
    let api = MockApi::start().await;
    api.respond(
        "/v1/cms/content-types/",
        StatusCode::OK,
        r#"{"result": [{"name": "blog"}, {"name": "news"}]}"#,
    );
    api.respond(
        "/v1/cms/content-types/blog/entries/",
        StatusCode::OK,
        r#"{"result": {"items": [{"title": "One"}, {"title": "Two"}]}}"#,
    );

    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /\n    template: index.html\n");
    project.write(
        "templates/index.html",
        "{% for t in cms_content_types() %}{{ t.name }};{% endfor %}|\
         {% set blog = cms_entries(type='blog', page=1, limit=5, tags=['a', 'b']) %}\
         {% for e in blog.items %}{{ e.title }};{% endfor %}",
    );

    let response = get(project.router_with_api(&api.endpoint()), "/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "blog;news;|One;Two;");

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.signature_valid));
    assert_eq!(requests[1].path, "/v1/cms/content-types/blog/entries/");
    assert_eq!(
        requests[1].query.as_deref(),
        Some("page=1&limit=5&tags=a&tags=b")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cms_failure_renders_null() {
    // no responses registered: every call is a 404
    let api = MockApi::start().await;

    let project = TestProject::new();
    project.write_app("routes:\n  - rule: /\n    template: index.html\n");
    project.write(
        "templates/index.html",
        "{% set types = cms_content_types() %}{% if types %}some{% else %}none{% endif %}",
    );

    let response = get(project.router_with_api(&api.endpoint()), "/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "none");
}

#[tokio::test]
async fn test_cms_without_credentials_renders_null() {
    let project = TestProject::new();
    project.write("app.yaml", "routes:\n  - rule: /\n    template: index.html\n");
    project.write(
        "templates/index.html",
        "{% set types = cms_content_types() %}{% if types %}some{% else %}none{% endif %}",
    );

    let response = get(project.router(), "/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "none");
}
