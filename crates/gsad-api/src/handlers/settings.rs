//! Commands that change the logged-in user's own settings.
//!
//! The manager is told first; the session table only changes for settings
//! the manager accepted.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;
use tracing::info;

use gsad_auth::{Credentials, ReauthSource, SessionStore};
use gsad_gmp::Element;

use crate::dispatch::session::negotiate_language;
use crate::error::DispatchError;
use crate::executor::CommandExecutor;
use crate::render;
use crate::request::GsadRequest;
use crate::response::HttpResponse;

use super::omp::next_command;

const SEVERITY_CLASS_SETTING: &str = "f16bb236-a32d-4cd5-a880-e0fcf2599f59";
const LANGUAGE_SETTING: &str = "6765549a-934e-11e3-b358-406186ea4fc5";
const AUTOREFRESH_SETTING: &str = "578a1c14-e2dc-45ef-a591-89d31391d007";

const BROWSER_LANGUAGE: &str = "Browser Language";

#[derive(Clone, PartialEq, Eq)]
enum Change {
    Timezone(String),
    SeverityClass(String),
    Language(String),
    Autorefresh(String),
    Password(String),
}

impl Change {
    fn label(&self) -> &'static str {
        match self {
            Self::Timezone(_) => "timezone",
            Self::SeverityClass(_) => "severity_class",
            Self::Language(_) => "lang",
            Self::Autorefresh(_) => "autorefresh",
            Self::Password(_) => "password",
        }
    }

    fn command(&self) -> String {
        match self {
            Self::Timezone(tz) => by_name("Timezone", tz),
            Self::Password(pw) => by_name("Password", pw),
            Self::SeverityClass(class) => by_id(SEVERITY_CLASS_SETTING, class),
            Self::Language(lang) => by_id(LANGUAGE_SETTING, lang),
            Self::Autorefresh(seconds) => by_id(AUTOREFRESH_SETTING, seconds),
        }
    }

    fn apply(
        &self,
        sessions: &SessionStore,
        req: &GsadRequest,
        view: &mut Credentials,
    ) -> Result<(), DispatchError> {
        let token = view.token.clone();
        match self {
            Self::Timezone(tz) => {
                sessions.set_timezone(&token, tz)?;
                view.timezone = tz.clone();
            }
            Self::SeverityClass(class) => {
                sessions.set_severity(&token, class)?;
                view.severity = class.clone();
            }
            Self::Language(lang) => {
                if lang == BROWSER_LANGUAGE {
                    sessions.set_language(&token, "")?;
                    view.language = negotiate_language(req);
                } else {
                    sessions.set_language(&token, lang)?;
                    view.language = lang.clone();
                }
            }
            Self::Autorefresh(seconds) => {
                sessions.set_autorefresh(&token, seconds)?;
                view.autorefresh = seconds.clone();
            }
            Self::Password(password) => {
                sessions.set_password(&token, password)?;
                view.pw_warning = None;
                let removed = sessions.logout_all_other_sessions(&view.username, &token);
                info!(username = %view.username, removed, "Password changed, other sessions logged out");
            }
        }
        Ok(())
    }
}

fn by_name(name: &str, value: &str) -> String {
    format!(
        "<modify_setting><name>{name}</name><value>{}</value></modify_setting>",
        STANDARD.encode(value)
    )
}

fn by_id(id: &str, value: &str) -> String {
    format!(
        "<modify_setting setting_id=\"{id}\"><value>{}</value></modify_setting>",
        STANDARD.encode(value)
    )
}

fn accepted(response: &str) -> bool {
    Element::parse(response).is_ok_and(|e| e.is_ok_status())
}

fn own_response(status: &str, text: &str) -> String {
    format!(
        "<save_my_settings_response status=\"{status}\" status_text=\"{}\"/>",
        gsad_gmp::xml::escape(text)
    )
}

fn collect_changes(
    req: &GsadRequest,
    credentials: &Credentials,
) -> Result<Vec<Change>, String> {
    let params = &req.params;
    let mut changes = Vec::new();

    if let Some(tz) = params.non_empty("timezone") {
        if tz != credentials.timezone {
            changes.push(Change::Timezone(tz.to_string()));
        }
    }
    if let Some(class) = params.non_empty("severity_class") {
        if class != credentials.severity {
            changes.push(Change::SeverityClass(class.to_string()));
        }
    }
    if let Some(lang) = params.non_empty("lang") {
        changes.push(Change::Language(lang.to_string()));
    }
    if let Some(seconds) = params.non_empty("autorefresh") {
        if seconds != credentials.autorefresh {
            changes.push(Change::Autorefresh(seconds.to_string()));
        }
    }
    if let Some(password) = params.non_empty("password") {
        let old = params.value("old_password").unwrap_or_default();
        if !credentials.secret().matches(old) {
            return Err("Changing password failed: old password is wrong".to_string());
        }
        changes.push(Change::Password(password.to_string()));
    }
    Ok(changes)
}

/// `save_my_settings`.
pub async fn save_my_settings(
    sessions: &SessionStore,
    executor: &CommandExecutor,
    req: &GsadRequest,
    credentials: &Credentials,
) -> Result<HttpResponse, DispatchError> {
    let mut view = credentials.clone();

    if let Some(charts) = req.params.value("charts") {
        let visible = charts == "1";
        sessions.set_charts_visible(&view.token, visible)?;
        view.charts_visible = visible;
    }

    let changes = match collect_changes(req, credentials) {
        Ok(changes) => changes,
        Err(message) => {
            tracing::warn!(username = %credentials.username, "Password change with wrong old password");
            let body = own_response("400", &message);
            return Ok(render::respond(
                req,
                StatusCode::OK,
                &render::session_envelope(&view, &body),
            ));
        }
    };

    let mut batch: Vec<String> = changes.iter().map(Change::command).collect();
    let next = next_command(req)?;
    if let Some(next) = &next {
        batch.push(next.clone());
    }

    if batch.is_empty() {
        let body = own_response("200", "OK");
        return Ok(render::respond(
            req,
            StatusCode::OK,
            &render::session_envelope(&view, &body),
        ));
    }

    // Settings the manager accepted are applied even when a later command
    // in the batch fails.
    let outcome = executor.run_partial(credentials, None, &batch).await?;

    let mut body = String::from("<save_my_settings_response status=\"200\" status_text=\"OK\">");
    for (change, response) in changes.iter().zip(&outcome.responses) {
        if accepted(response) {
            change.apply(sessions, req, &mut view)?;
        } else {
            tracing::warn!(username = %credentials.username, setting = change.label(), "Manager refused setting change");
        }
        body.push_str(response);
    }
    body.push_str("</save_my_settings_response>");

    if let Some(failure) = outcome.failure {
        return Err(failure);
    }
    if next.is_some() {
        if let Some(last) = outcome.responses.get(changes.len()) {
            body.push_str(last);
        }
    }

    Ok(render::respond(
        req,
        StatusCode::OK,
        &render::session_envelope(&view, &body),
    ))
}

/// `save_chart_preference`.
pub async fn save_chart_preference(
    sessions: &SessionStore,
    executor: &CommandExecutor,
    req: &GsadRequest,
    credentials: &Credentials,
) -> Result<HttpResponse, DispatchError> {
    let id = req
        .params
        .non_empty("chart_preference_id")
        .ok_or_else(|| DispatchError::InvalidParameter("chart_preference_id".to_string()))?;
    let value = req
        .params
        .value("chart_preference_value")
        .ok_or_else(|| DispatchError::InvalidParameter("chart_preference_value".to_string()))?;

    let response = executor
        .run_one(credentials, None, by_id(id, value))
        .await?;
    if accepted(&response) {
        sessions.set_chart_pref(&credentials.token, id, value)?;
    }

    Ok(render::respond(
        req,
        StatusCode::OK,
        &render::session_envelope(credentials, &response),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_commands_encode_values() {
        assert_eq!(
            Change::Timezone("Europe/Berlin".to_string()).command(),
            "<modify_setting><name>Timezone</name><value>RXVyb3BlL0Jlcmxpbg==</value></modify_setting>"
        );
        assert_eq!(
            Change::Autorefresh("30".to_string()).command(),
            format!(
                "<modify_setting setting_id=\"{AUTOREFRESH_SETTING}\"><value>MzA=</value></modify_setting>"
            )
        );
    }

    #[test]
    fn test_accepted() {
        assert!(accepted(r#"<modify_setting_response status="200" status_text="OK"/>"#));
        assert!(!accepted(r#"<modify_setting_response status="403" status_text="Permission denied"/>"#));
        assert!(!accepted("garbage"));
    }
}
