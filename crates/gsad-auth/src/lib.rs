//! # gsad-auth
//!
//! Everything the daemon knows about who is calling.
//!
//! ## Modules
//!
//! - `validator` — named regex rules and aliases for request parameters
//! - `session` — the in-memory session table, its clock, and guest auto-login
//! - `credentials` — the immutable per-request view of a session
//! - `login` — the authentication seam implemented by the backend client

pub mod credentials;
pub mod error;
pub mod login;
pub mod session;
pub mod validator;

pub use credentials::{Credentials, LoginAttempt, ReauthSource, SessionSecret};
pub use error::{LookupError, SessionError, ValidationError};
pub use login::{AuthError, Authenticator, LoginSummary};
pub use session::{
    Clock, GUEST_TOKEN, ManualClock, NewSession, Session, SessionStore, SystemClock,
};
pub use validator::{Validator, default_validator};
