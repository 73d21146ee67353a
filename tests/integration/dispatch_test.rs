//! Integration tests for routing, command dispatch, and response headers.

mod helpers;

use http::{Method, StatusCode};

use helpers::TestApp;

#[tokio::test]
async fn test_root_redirects_to_login_form() {
    let app = TestApp::new();

    let response = app.get("/", None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/login/login.html"));

    let form = app.get("/login/login.html", None).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.text().contains("<login_page>"));
}

#[tokio::test]
async fn test_double_slash_url_is_rejected() {
    let app = TestApp::new();
    let response = app.get("//etc/passwd", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_utf8_parameter_is_rejected() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app.omp_get(&alice, "cmd=get_tasks&comment=%FF").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("parameter &apos;comment&apos;"));
    assert!(app.manager.commands().is_empty());
}

#[tokio::test]
async fn test_unknown_command_is_not_forwarded() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app.omp_get(&alice, "cmd=drop_everything").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("unknown command"));
    assert!(app.manager.commands().is_empty());
}

#[tokio::test]
async fn test_post_only_command_over_get() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app.omp_get(&alice, "cmd=delete_task&task_id=t1").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.manager.commands().is_empty());
}

#[tokio::test]
async fn test_missing_required_parameter() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app.omp_get(&alice, "cmd=get_task").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("parameter &apos;task_id&apos;"));
}

#[tokio::test]
async fn test_get_command_is_relayed_in_envelope() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .header("content-type")
            .unwrap()
            .starts_with("application/xml")
    );

    let text = response.text();
    assert!(text.starts_with("<envelope>"));
    assert!(text.contains("<login>alice</login>"));
    assert!(text.contains("<role>Admin</role>"));
    assert!(text.contains(&format!("<token>{}</token>", alice.token)));
    assert!(text.contains(r#"<task id="t1">"#));

    assert_eq!(app.manager.commands(), vec!["<get_tasks/>".to_string()]);
}

#[tokio::test]
async fn test_json_format() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app.omp_get(&alice, "cmd=get_tasks&format=json").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let json = response.json();
    assert_eq!(json["envelope"]["login"], "alice");
    assert_eq!(json["envelope"]["get_tasks_response"]["task"][1]["_id"], "t2");
}

#[tokio::test]
async fn test_security_headers_on_plain_http() {
    let app = TestApp::new();
    let response = app.get("/login/login.html", None).await;

    assert_eq!(response.header("x-frame-options"), Some("SAMEORIGIN"));
    assert!(response.header("content-security-policy").is_some());
    assert_eq!(response.header("cache-control"), Some("no-cache, no-store"));
    assert_eq!(response.header("pragma"), Some("no-cache"));
    assert_eq!(response.header("expires"), Some("-1"));
    assert!(response.header("strict-transport-security").is_none());
    assert!(response.header("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_security_headers_on_error_pages() {
    let app = TestApp::new();
    let response = app.get("/omp?cmd=get_tasks", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("x-frame-options"), Some("SAMEORIGIN"));
}

#[tokio::test]
async fn test_cors_headers_when_configured() {
    let app = TestApp::with_config(|c| {
        c.headers.allow_origin = Some("https://gsa.example".to_string());
        c.headers.hsts_max_age = Some(31_536_000);
    });
    let response = app.get("/login/login.html", None).await;

    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://gsa.example")
    );
    assert_eq!(
        response.header("access-control-allow-credentials"),
        Some("true")
    );
    assert!(response.header("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_unsupported_method() {
    let app = TestApp::new();
    let response = app
        .send(Method::PUT, "/omp", None, None, TestApp::default_addr())
        .await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, POST"));
}

#[tokio::test]
async fn test_post_to_unknown_path() {
    let app = TestApp::new();
    let response = app.post("/upload", "cmd=login", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_command_with_next() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app
        .omp_post(
            &alice,
            "cmd=create_task&name=Nightly&comment=a%26b&config_id=c1&target_id=t1&scanner_id=s1&next=get_tasks",
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let text = response.text();
    assert!(text.contains("<action_result><action>create_task</action><create_task_response"));
    assert!(text.contains("<get_tasks_response"));

    assert_eq!(
        app.manager.commands(),
        vec![
            "<create_task><name>Nightly</name><comment>a&amp;b</comment><config id=\"c1\"/><target id=\"t1\"/><scanner id=\"s1\"/></create_task>".to_string(),
            "<get_tasks/>".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_post_with_unknown_next_sends_nothing() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app
        .omp_post(&alice, "cmd=start_task&task_id=t1&next=delete_task")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.manager.commands().is_empty());
}

#[tokio::test]
async fn test_system_report_image() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app
        .get(
            &format!("/system_report/load/report.png?token={}", alice.token),
            Some(&alice.cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(&response.body[..4], &[0x89, b'P', b'N', b'G']);

    assert_eq!(
        app.manager.commands(),
        vec!["<get_system_reports name=\"load\" duration=\"86400\"/>".to_string()]
    );
}

#[tokio::test]
async fn test_help_page_needs_session() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let page = app
        .get(
            &format!("/help/contents.html?token={}", alice.token),
            Some(&alice.cookie),
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.text().contains("<page>contents</page>"));

    let anonymous = app.get("/help/contents.html", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_static_files() {
    let root = std::env::temp_dir().join(format!("gsad-static-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(root.join("img")).unwrap();
    std::fs::write(root.join("img/logo.svg"), "<svg/>").unwrap();

    let dir = root.to_string_lossy().into_owned();
    let app = TestApp::with_config(|c| c.server.static_dir = dir);

    let found = app.get("/img/logo.svg", None).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.header("content-type"), Some("image/svg+xml"));
    assert_eq!(found.header("cache-control"), Some("max-age=3600, public"));
    assert_eq!(found.text(), "<svg/>");

    let missing = app.get("/img/missing.svg", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let climbing = app.get("/img/%2e%2e/%2e%2e/etc/passwd", None).await;
    assert_eq!(climbing.status, StatusCode::NOT_FOUND);

    std::fs::remove_dir_all(&root).unwrap();
}
