//! Integration tests for session binding, expiry, and settings changes.

mod helpers;

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Duration;
use http::header::ACCEPT_LANGUAGE;
use http::{Method, StatusCode};

use helpers::TestApp;

#[tokio::test]
async fn test_session_expires_after_timeout() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let fresh = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(fresh.status, StatusCode::OK);
    assert!(fresh.text().contains("<login>alice</login>"));

    app.clock.advance(Duration::minutes(16));
    let expired = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert!(expired.text().contains("Session has expired"));
    assert!(!app.sessions.contains(&alice.token));

    let again = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
    assert!(again.text().contains("Session has expired"));
}

#[tokio::test]
async fn test_login_with_oversized_timeout() {
    let app = TestApp::with_config(|c| c.session.timeout_minutes = 1_000_000_000_000);
    let alice = app.login("alice", "pw1").await;

    app.clock.advance(Duration::days(3650));
    assert_eq!(app.omp_get(&alice, "cmd=get_tasks").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_activity_keeps_session_alive() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    for _ in 0..3 {
        app.clock.advance(Duration::minutes(10));
        assert_eq!(app.omp_get(&alice, "cmd=get_tasks").await.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_successful_lookup_refreshes_cookie() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app.omp_get(&alice, "cmd=get_tasks").await;
    assert_eq!(response.session_cookie().as_deref(), Some(alice.cookie.as_str()));
}

#[tokio::test]
async fn test_wrong_cookie_is_rejected_and_cleared() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;
    let bob = app.login("bob", "pw2").await;

    let response = app
        .get(
            &format!("/omp?cmd=get_tasks&token={}", alice.token),
            Some(&bob.cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Cookie missing or bad"));
    assert!(response.set_cookie().unwrap().starts_with("GSAD_SID=0;"));

    let missing = app
        .get(&format!("/omp?cmd=get_tasks&token={}", alice.token), None)
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.omp_get(&alice, "cmd=get_tasks").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cleared_cookie_is_secure_when_configured() {
    let app = TestApp::with_config(|c| c.server.secure_cookie = true);
    let alice = app.login("alice", "pw1").await;

    let response = app
        .get(
            &format!("/omp?cmd=get_tasks&token={}", alice.token),
            Some("not-the-cookie"),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let cleared = response.set_cookie().unwrap();
    assert!(cleared.starts_with("GSAD_SID=0;"));
    assert!(cleared.contains("secure"));
}

#[tokio::test]
async fn test_client_address_is_bound() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let elsewhere: IpAddr = "10.1.2.3".parse().unwrap();
    let response = app
        .send(
            Method::GET,
            &format!("/omp?cmd=get_tasks&token={}", alice.token),
            None,
            Some(&alice.cookie),
            elsewhere,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Session machine changed"));
    assert!(app.sessions.contains(&alice.token));
}

#[tokio::test]
async fn test_missing_and_malformed_tokens() {
    let app = TestApp::new();

    let missing = app.get("/omp?cmd=get_tasks", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert!(missing.text().contains("Token missing or bad"));

    let malformed = app.get("/omp?cmd=get_tasks&token=not-a-token", None).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert!(app.manager.commands().is_empty());
}

#[tokio::test]
async fn test_expired_login_is_pruned_on_next_login() {
    let app = TestApp::new();
    let old = app.login("alice", "pw1").await;
    app.clock.advance(Duration::minutes(20));

    let new = app.login("alice", "pw1").await;
    assert!(!app.sessions.contains(&old.token));
    assert!(app.sessions.contains(&new.token));
    assert_eq!(app.sessions.count_for_user("alice"), 1);
}

#[tokio::test]
async fn test_save_settings_updates_live_session() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app
        .omp_post(
            &alice,
            "cmd=save_my_settings&timezone=Europe%2FBerlin&severity_class=bsi&autorefresh=+30+&charts=0",
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("<timezone>Europe/Berlin</timezone>"));

    let commands = app.manager.commands();
    assert_eq!(
        commands
            .iter()
            .filter(|c| c.starts_with("<modify_setting"))
            .count(),
        3
    );

    let page = app.omp_get(&alice, "cmd=get_tasks").await;
    let text = page.text();
    assert!(text.contains("<timezone>Europe/Berlin</timezone>"));
    assert!(text.contains("<severity>bsi</severity>"));
    assert!(text.contains("<autorefresh>30</autorefresh>"));
    assert!(text.contains("<charts>0</charts>"));
}

#[tokio::test]
async fn test_refused_settings_leave_session_unchanged() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;
    app.manager.refuse_settings(true);

    let response = app
        .omp_post(&alice, "cmd=save_my_settings&timezone=Asia%2FTokyo")
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let page = app.omp_get(&alice, "cmd=get_tasks").await;
    assert!(page.text().contains("<timezone>UTC</timezone>"));
}

#[tokio::test]
async fn test_password_change_logs_out_other_sessions() {
    let app = TestApp::new();
    let laptop = app.login("alice", "pw1").await;
    let phone = app.login("alice", "pw1").await;
    let bob = app.login("bob", "pw2").await;

    let response = app
        .omp_post(
            &laptop,
            "cmd=save_my_settings&password=pw-new&old_password=pw1",
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let kept = app.omp_get(&laptop, "cmd=get_tasks").await;
    assert_eq!(kept.status, StatusCode::OK);

    let dropped = app.omp_get(&phone, "cmd=get_tasks").await;
    assert_eq!(dropped.status, StatusCode::UNAUTHORIZED);
    assert!(dropped.text().contains("Session has expired"));

    assert_eq!(app.omp_get(&bob, "cmd=get_tasks").await.status, StatusCode::OK);

    app.login("alice", "pw-new").await;
}

#[tokio::test]
async fn test_password_change_survives_failed_next_command() {
    let app = TestApp::new();
    let laptop = app.login("alice", "pw1").await;
    let phone = app.login("alice", "pw1").await;
    app.manager.fail_reads(true);

    let response = app
        .omp_post(
            &laptop,
            "cmd=save_my_settings&password=pwnew&old_password=pw1&next=get_tasks",
        )
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    app.manager.fail_reads(false);
    assert_eq!(app.omp_get(&laptop, "cmd=get_tasks").await.status, StatusCode::OK);
    assert_eq!(
        app.omp_get(&phone, "cmd=get_tasks").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_browser_language_follows_accept_language() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let fixed = app.omp_post(&alice, "cmd=save_my_settings&lang=fr").await;
    assert!(fixed.text().contains("<i18n>fr</i18n>"));

    let response = app
        .send_with_headers(
            Method::POST,
            "/omp",
            Some(&format!(
                "cmd=save_my_settings&lang=Browser%20Language&token={}",
                alice.token
            )),
            Some(&alice.cookie),
            TestApp::default_addr(),
            &[(ACCEPT_LANGUAGE, "de-DE,de;q=0.9")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("<i18n>de_DE</i18n>"));

    let session = app
        .sessions
        .find(Some(&alice.cookie), Some(&alice.token), TestApp::default_addr())
        .unwrap();
    assert_eq!(session.language, "");
}

#[tokio::test]
async fn test_password_change_needs_old_password() {
    let app = TestApp::new();
    let laptop = app.login("alice", "pw1").await;
    let phone = app.login("alice", "pw1").await;

    let response = app
        .omp_post(
            &laptop,
            "cmd=save_my_settings&password=pw-new&old_password=wrong",
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("old password is wrong"));

    assert!(app.manager.commands().is_empty());
    assert_eq!(app.omp_get(&phone, "cmd=get_tasks").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_save_chart_preference() {
    let app = TestApp::new();
    let alice = app.login("alice", "pw1").await;

    let response = app
        .omp_post(
            &alice,
            "cmd=save_chart_preference&chart_preference_id=dash-top&chart_preference_value=donut",
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let session = app
        .sessions
        .find(Some(&alice.cookie), Some(&alice.token), TestApp::default_addr())
        .unwrap();
    assert_eq!(
        session.chart_prefs.get("dash-top").map(String::as_str),
        Some("donut")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins() {
    let app = Arc::new(TestApp::new());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let (user, password) = if i % 2 == 0 { ("alice", "pw1") } else { ("bob", "pw2") };
                app.login(user, password).await
            })
        })
        .collect();

    let mut sessions = Vec::new();
    for task in tasks {
        sessions.push(task.await.unwrap());
    }

    assert_eq!(app.sessions.len(), 16);
    for who in &sessions {
        assert_eq!(app.omp_get(who, "cmd=get_tasks").await.status, StatusCode::OK);
    }
}
