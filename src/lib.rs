//! In-memory mail-testing harness
//!
//! Accepts mail over a minimal SMTP listener and exposes it over a
//! POP3 listener, backed by a bounded in-memory [`MailStore`]. Nothing
//! survives the process; when it exits the mail is gone. Intended for
//! exercising email code in integration tests without a real MTA.
//!
//! Start both servers against a shared store:
//!
//! ```no_run
//! use mailsink::{MailStore, Pop3Server, SmtpServer};
//! use std::sync::Arc;
//!
//! # async fn run() -> mailsink::Result<()> {
//! let store = Arc::new(MailStore::new());
//! let smtp = SmtpServer::start("127.0.0.1:2525", store.clone()).await?;
//! let pop3 = Pop3Server::start("127.0.0.1:1110", store.clone()).await?;
//! println!("SMTP on {}, POP3 on {}", smtp.local_addr(), pop3.local_addr());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod framing;
mod pop3;
mod smtp;
mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use pop3::Pop3Server;
pub use smtp::SmtpServer;
pub use store::{IncomingMail, MailRecord, MailStore};
