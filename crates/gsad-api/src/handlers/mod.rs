//! Terminal handlers.

pub mod help;
pub mod login;
pub mod logout;
pub mod omp;
pub mod settings;
pub mod static_files;
pub mod system_report;

pub use help::Help;
pub use login::{Login, LoginPage, RootRedirect};
pub use logout::Logout;
pub use omp::{OmpGet, OmpPost};
pub use static_files::StaticFiles;
pub use system_report::SystemReport;

use gsad_auth::Credentials;

use crate::error::DispatchError;
use crate::request::GsadRequest;
use crate::response::HttpResponse;

/// Credentials attached by [`BuildCredentials`](crate::dispatch::BuildCredentials).
pub(crate) fn credentials(req: &GsadRequest) -> Result<Credentials, DispatchError> {
    req.extensions
        .get::<Credentials>()
        .cloned()
        .ok_or_else(|| DispatchError::Internal("handler reached without credentials".to_string()))
}

/// Turns a handler result into a response.
pub(crate) fn respond(req: &GsadRequest, result: Result<HttpResponse, DispatchError>) -> HttpResponse {
    result.unwrap_or_else(|e| e.into_response(req))
}
