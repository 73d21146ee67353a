//! # gsad-gmp
//!
//! Client side of the manager protocol: open a TCP or Unix-domain stream,
//! authenticate, send one XML command at a time and read back one complete
//! XML response. Every connection carries a cancellation token so another
//! task can tear it down while a command is in flight.

pub mod address;
pub mod connection;
pub mod connector;
pub mod error;
pub mod stream;
pub mod xml;

pub use address::BackendAddress;
pub use connection::GmpConnection;
pub use connector::{BackendConnector, BackendSession, GmpConnector};
pub use error::{ConnectError, GmpError};
pub use xml::Element;
