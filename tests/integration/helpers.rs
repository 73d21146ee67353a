//! Shared test helpers for integration tests.
//!
//! [`TestApp`] builds the real dispatch chain over an in-memory manager and
//! a manual clock, and pushes requests through it without a socket.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE, HeaderName, LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use gsad_api::{AppState, Chain, GsadRequest, build_router};
use gsad_auth::{
    AuthError, Authenticator, Clock, LoginSummary, ManualClock, ReauthSource, SessionStore,
    default_validator,
};
use gsad_core::config::AppConfig;
use gsad_gmp::{BackendConnector, BackendSession, ConnectError, GmpError};

pub const GUEST_USER: &str = "guest";
pub const GUEST_PASSWORD: &str = "guestpw";

/// A 1x1 PNG header, base64-encoded the way the manager sends reports.
pub const REPORT_PNG_B64: &str = "iVBORw0KGgo=";

#[derive(Default)]
struct ManagerState {
    accounts: Mutex<HashMap<String, String>>,
    commands: Mutex<Vec<String>>,
    down: AtomicBool,
    refuse_settings: AtomicBool,
    fail_reads: AtomicBool,
    auth_calls: AtomicUsize,
}

/// In-memory stand-in for the manager daemon.
#[derive(Clone, Default)]
pub struct MockManager {
    state: Arc<ManagerState>,
}

impl MockManager {
    pub fn with_accounts(accounts: &[(&str, &str)]) -> Self {
        let manager = Self::default();
        for (user, password) in accounts {
            manager.set_password(user, password);
        }
        manager
    }

    pub fn set_password(&self, user: &str, password: &str) {
        self.state
            .accounts
            .lock()
            .insert(user.to_string(), password.to_string());
    }

    pub fn set_down(&self, down: bool) {
        self.state.down.store(down, Ordering::SeqCst);
    }

    pub fn refuse_settings(&self, refuse: bool) {
        self.state.refuse_settings.store(refuse, Ordering::SeqCst);
    }

    /// Drops the connection on every command except `<modify_setting>`.
    pub fn fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().clone()
    }

    pub fn auth_calls(&self) -> usize {
        self.state.auth_calls.load(Ordering::SeqCst)
    }

    fn check(&self, user: &str, password: &str) -> bool {
        self.state
            .accounts
            .lock()
            .get(user)
            .is_some_and(|p| p == password)
    }

    fn answer(&self, user: &str, command: &str) -> String {
        self.state.commands.lock().push(command.to_string());

        let element: String = command
            .trim_start_matches('<')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();

        match element.as_str() {
            "get_tasks" => r#"<get_tasks_response status="200" status_text="OK"><task id="t1"><name>Nightly</name></task><task id="t2"><name>Weekly</name></task></get_tasks_response>"#.to_string(),
            "create_task" => r#"<create_task_response status="201" status_text="OK, resource created" id="new-task"/>"#.to_string(),
            "get_system_reports" => format!(
                r#"<get_system_reports_response status="200" status_text="OK"><system_report><name>load</name><report format="png">{REPORT_PNG_B64}</report></system_report></get_system_reports_response>"#
            ),
            "modify_setting" => {
                if self.state.refuse_settings.load(Ordering::SeqCst) {
                    return r#"<modify_setting_response status="403" status_text="Permission denied"/>"#.to_string();
                }
                if command.contains("<name>Password</name>") {
                    if let Some(password) = setting_value(command) {
                        self.set_password(user, &password);
                    }
                }
                r#"<modify_setting_response status="200" status_text="OK"/>"#.to_string()
            }
            other => format!(r#"<{other}_response status="200" status_text="OK"/>"#),
        }
    }
}

fn setting_value(command: &str) -> Option<String> {
    let start = command.find("<value>")? + "<value>".len();
    let end = command[start..].find("</value>")? + start;
    let bytes = STANDARD.decode(&command[start..end]).ok()?;
    String::from_utf8(bytes).ok()
}

#[async_trait]
impl Authenticator for MockManager {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginSummary, AuthError> {
        self.state.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.down.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("connection refused".to_string()));
        }
        if !self.check(username, password) {
            return Err(AuthError::Rejected);
        }
        Ok(LoginSummary {
            role: if username == GUEST_USER { "Guest" } else { "Admin" }.to_string(),
            capabilities: "GET_TASKS\nCREATE_TASK".to_string(),
            ..LoginSummary::default()
        })
    }
}

struct MockConnection {
    manager: MockManager,
    user: String,
    closer: CancellationToken,
}

#[async_trait]
impl BackendSession for MockConnection {
    async fn execute(&mut self, command: &str) -> Result<String, GmpError> {
        if self.closer.is_cancelled() {
            return Err(GmpError::Cancelled);
        }
        if self.manager.state.fail_reads.load(Ordering::SeqCst)
            && !command.starts_with("<modify_setting")
        {
            return Err(GmpError::Closed);
        }
        Ok(self.manager.answer(&self.user, command))
    }

    fn closer(&self) -> CancellationToken {
        self.closer.clone()
    }
}

#[async_trait]
impl BackendConnector for MockManager {
    async fn connect(
        &self,
        who: &dyn ReauthSource,
    ) -> Result<Box<dyn BackendSession>, ConnectError> {
        if self.state.down.load(Ordering::SeqCst) {
            return Err(ConnectError::Down("connection refused".to_string()));
        }
        let password = self.state.accounts.lock().get(who.username()).cloned();
        match password {
            Some(p) if who.secret().matches(&p) => Ok(Box::new(MockConnection {
                manager: self.clone(),
                user: who.username().to_string(),
                closer: CancellationToken::new(),
            })),
            _ => Err(ConnectError::AuthFailed),
        }
    }
}

/// Test application context
pub struct TestApp {
    pub chain: Chain,
    pub state: AppState,
    pub sessions: Arc<SessionStore>,
    pub clock: Arc<ManualClock>,
    pub manager: MockManager,
}

impl TestApp {
    /// Default configuration with a guest account and no client watcher.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Like [`new`](Self::new), after `adjust` has edited the configuration.
    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        config.session.guest_username = Some(GUEST_USER.to_string());
        config.session.guest_password = Some(GUEST_PASSWORD.to_string());
        config.session.client_watch_interval_seconds = 0;
        adjust(&mut config);

        let clock = Arc::new(ManualClock::default());
        let sessions = Arc::new(SessionStore::new(&config.session, clock.clone()));
        let manager = MockManager::with_accounts(&[
            ("alice", "pw1"),
            ("bob", "pw2"),
            (GUEST_USER, GUEST_PASSWORD),
        ]);
        let validator = default_validator().expect("Failed to build validator");

        let state = AppState::new(
            config,
            Arc::clone(&sessions),
            validator,
            Arc::new(manager.clone()),
            Arc::new(manager.clone()),
        );
        let chain = build_router(&state).expect("Failed to build router");

        Self {
            chain,
            state,
            sessions,
            clock,
            manager,
        }
    }

    pub fn default_addr() -> IpAddr {
        IpAddr::from([127, 0, 0, 1])
    }

    /// Make a request to the test app
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        form: Option<&str>,
        cookie: Option<&str>,
        client: IpAddr,
    ) -> TestResponse {
        self.send_with_headers(method, uri, form, cookie, client, &[])
            .await
    }

    /// Like [`send`](Self::send), with extra request headers.
    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        form: Option<&str>,
        cookie: Option<&str>,
        client: IpAddr,
        headers: &[(HeaderName, &str)],
    ) -> TestResponse {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(COOKIE, format!("GSAD_SID={cookie}"));
        }
        for (name, value) in headers {
            req = req.header(name, *value);
        }
        let req = req
            .body(Bytes::from(form.unwrap_or_default().to_string()))
            .expect("Failed to build request");

        let mut req = GsadRequest::new(req, client, false, self.clock.now(), &self.state.validator);
        let response = self.chain.run(&mut req).await;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, None, cookie, Self::default_addr())
            .await
    }

    pub async fn post(&self, uri: &str, form: &str, cookie: Option<&str>) -> TestResponse {
        self.send(Method::POST, uri, Some(form), cookie, Self::default_addr())
            .await
    }

    /// Logs in through `POST /omp` and returns the new session's handles.
    pub async fn login(&self, username: &str, password: &str) -> LoggedIn {
        let response = self
            .post(
                "/omp",
                &format!("cmd=login&login={username}&password={password}"),
                None,
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::SEE_OTHER,
            "Login failed: {}",
            response.text()
        );

        let location = response.location().expect("No redirect location");
        let token = location
            .rsplit_once("token=")
            .map(|(_, t)| t.to_string())
            .expect("No token in redirect");
        let cookie = response.session_cookie().expect("No session cookie");

        LoggedIn { token, cookie }
    }

    /// `GET /omp?cmd=<cmd>` as the given session.
    pub async fn omp_get(&self, who: &LoggedIn, query: &str) -> TestResponse {
        self.get(
            &format!("/omp?{query}&token={}", who.token),
            Some(&who.cookie),
        )
        .await
    }

    /// `POST /omp` as the given session.
    pub async fn omp_post(&self, who: &LoggedIn, form: &str) -> TestResponse {
        self.post(
            "/omp",
            &format!("{form}&token={}", who.token),
            Some(&who.cookie),
        )
        .await
    }
}

/// Token and cookie of a logged-in browser.
#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub token: String,
    pub cookie: String,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Body is not JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Raw `Set-Cookie` value for the session cookie.
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("GSAD_SID="))
    }

    /// Value of the session cookie being set.
    pub fn session_cookie(&self) -> Option<String> {
        let raw = self.set_cookie()?;
        let value = raw.strip_prefix("GSAD_SID=")?.split(';').next()?;
        Some(value.to_string())
    }
}
