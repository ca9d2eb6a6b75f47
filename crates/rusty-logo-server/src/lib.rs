//! TCP server for Rusty Logo.
//!
//! Accepts connections, gives each one its own [`Session`] on a separate
//! task, and shuttles CRLF-terminated lines between the socket and the
//! session until the client quits or the connection drops.
//!
//! [`Session`]: rusty_logo_core::session::Session

pub mod conn_limit;
pub mod connection;
pub mod server;

pub use conn_limit::{ConnectionLimiter, ConnectionPermit};
pub use connection::{CloseReason, ConnectionSettings, handle_connection};
pub use server::{serve, start_server};
