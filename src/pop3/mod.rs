//! POP3 retrieval server
//!
//! Exposes the contents of the shared [`crate::MailStore`] over a
//! POP3 subset sufficient for mail clients and test drivers:
//! USER/PASS (any credentials), STAT, LIST, RETR, DELE, RSET, NOOP,
//! CAPA, QUIT.
//!
//! ## Module layout
//!
//! - `command` -- line parsing into a closed command enum
//! - `session` -- the per-connection state machine and its
//!   transactional deletion semantics
//! - `server` -- TCP accept loop and CRLF line transport

mod command;
mod server;
mod session;

pub use server::Pop3Server;
