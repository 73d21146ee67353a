//! Integration tests for login, logout, and manager re-authentication.

mod helpers;

use http::StatusCode;

use helpers::TestApp;

#[tokio::test]
async fn test_login_success_redirects_with_token() {
    let app = TestApp::new();

    let response = app
        .post(
            "/omp",
            "cmd=login&login=alice&password=pw1&text=%2Fomp%3Fcmd%3Dget_reports",
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.location().unwrap();
    assert!(location.starts_with("/omp?cmd=get_reports&token="), "{location}");

    let cookie = response.set_cookie().unwrap();
    assert!(cookie.contains("max-age=930"), "{cookie}");
    assert!(cookie.contains("path=/"));
    assert!(cookie.ends_with("HTTPonly"));
    assert!(!cookie.contains("secure"));

    assert_eq!(app.sessions.count_for_user("alice"), 1);
}

#[tokio::test]
async fn test_login_without_target_goes_to_tasks() {
    let app = TestApp::new();
    let response = app
        .post("/omp", "cmd=login&login=alice&password=pw1", None)
        .await;
    assert!(
        response
            .location()
            .unwrap()
            .starts_with("/omp?cmd=get_tasks&token=")
    );
}

#[tokio::test]
async fn test_login_ignores_offsite_target() {
    let app = TestApp::new();
    let response = app
        .post(
            "/omp",
            "cmd=login&login=alice&password=pw1&text=https%3A%2F%2Fevil.example%2F",
            None,
        )
        .await;
    assert!(
        response
            .location()
            .unwrap()
            .starts_with("/omp?cmd=get_tasks&token=")
    );
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    let response = app
        .post("/omp", "cmd=login&login=alice&password=nope", None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Login failed."));
    assert!(response.set_cookie().is_none());
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_login_missing_credentials() {
    let app = TestApp::new();
    let response = app.post("/omp", "cmd=login&login=alice", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_login_with_manager_down() {
    let app = TestApp::new();
    app.manager.set_down(true);

    let response = app
        .post("/omp", "cmd=login&login=alice&password=pw1", None)
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.text().contains("manager service is down"));
}

#[tokio::test]
async fn test_secure_cookie_flag() {
    let app = TestApp::with_config(|c| c.server.secure_cookie = true);
    let response = app
        .post("/omp", "cmd=login&login=alice&password=pw1", None)
        .await;
    assert!(response.set_cookie().unwrap().contains("; secure; HTTPonly"));
}

#[tokio::test]
async fn test_logout_removes_session_and_clears_cookie() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app
        .get(&format!("/logout?token={}", alice.token), Some(&alice.cookie))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("Successfully logged out."));
    let cleared = response.set_cookie().unwrap();
    assert!(cleared.starts_with("GSAD_SID=0;"));
    assert!(cleared.contains("max-age=0"));

    assert!(!app.sessions.contains(&alice.token));
    let after = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_by_post() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app
        .post("/logout", &format!("token={}", alice.token), Some(&alice.cookie))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_logout_with_expired_session_is_bad_request() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;
    app.clock.advance(chrono::Duration::minutes(16));

    let response = app
        .get(&format!("/logout?token={}", alice.token), Some(&alice.cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("Session has expired"));
}

#[tokio::test]
async fn test_manager_rejects_cached_password() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;
    app.manager.set_password("alice", "changed-elsewhere");

    let response = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Authentication with the manager failed"));
}

#[tokio::test]
async fn test_manager_down_after_login() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;
    app.manager.set_down(true);

    let response = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.sessions.contains(&alice.token));
}

#[tokio::test]
async fn test_guest_auto_login_reuses_session_per_cookie() {
    let app = TestApp::new();

    let first = app.get("/omp?cmd=get_tasks&token=guest", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(first.text().contains("<guest>1</guest>"));
    let cookie = first.session_cookie().unwrap();

    let second = app
        .get("/omp?cmd=get_tasks&token=guest", Some(&cookie))
        .await;
    assert_eq!(second.status, StatusCode::OK);

    assert_eq!(app.manager.auth_calls(), 1);
    assert_eq!(app.sessions.count_for_user("guest"), 1);
}

#[tokio::test]
async fn test_guest_login_with_manager_down() {
    let app = TestApp::new();
    app.manager.set_down(true);

    let response = app.get("/omp?cmd=get_tasks&token=guest", None).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_guest_login_with_bad_guest_password() {
    let app = TestApp::new();
    app.manager.set_password("guest", "rotated");

    let response = app.get("/omp?cmd=get_tasks&token=guest", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Invalid guest credentials"));
}

#[tokio::test]
async fn test_guest_token_without_guest_account() {
    let app = TestApp::with_config(|c| {
        c.session.guest_username = None;
        c.session.guest_password = None;
    });

    let response = app.get("/omp?cmd=get_tasks&token=guest", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.manager.auth_calls(), 0);
}
