//! In-memory session table.
//!
//! Sessions are created on successful manager authentication, touched on
//! every authenticated request, and removed on logout, on
//! password-change fan-out, or lazily once they idle past the timeout.

pub mod clock;
pub mod model;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use model::{NewSession, Session};
pub use store::{GUEST_TOKEN, SessionStore};
