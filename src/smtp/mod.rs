//! SMTP ingestion server
//!
//! Receives mail over a minimal SMTP subset (HELO/EHLO, AUTH, MAIL,
//! RCPT, DATA, RSET, NOOP, QUIT) and deposits each accepted message
//! into the shared [`crate::MailStore`].
//!
//! ## Module layout
//!
//! - `session` -- envelope state machine and message normalization
//! - `server` -- TCP accept loop and CRLF line transport

mod server;
mod session;

pub use server::SmtpServer;
