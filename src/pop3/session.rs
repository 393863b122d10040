//! POP3 session state machine
//!
//! One [`Pop3Session`] exists per accepted connection. It moves through
//! the three POP3 states:
//!
//! ```text
//!   Authorization --PASS--> Transaction --QUIT--> Update
//! ```
//!
//! Credentials are accepted unconditionally; the interesting part is
//! the transaction. At PASS the session captures a snapshot of the
//! shared store and answers every later command against that snapshot,
//! never against live store contents. Message numbers are 1-based
//! positions into the original snapshot and are never renumbered as
//! deletion marks accumulate. DELE only marks; the marks are applied to
//! the shared store exactly once, when QUIT is processed in the
//! Transaction state. A connection dropped without QUIT deletes
//! nothing.

use super::command::{Command, MessageArg};
use crate::store::{MailRecord, MailStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// POP3 protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Initial state; only authentication commands do real work.
    Authorization,
    /// Authenticated; mailbox commands run against the snapshot.
    Transaction,
    /// Terminal; pending deletions have been committed.
    Update,
}

/// A response ready to be written back to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    body: Vec<u8>,
    close: bool,
}

impl Reply {
    fn ok(msg: &str) -> Self {
        let body = if msg.is_empty() {
            b"+OK\r\n".to_vec()
        } else {
            format!("+OK {msg}\r\n").into_bytes()
        };
        Self { body, close: false }
    }

    fn err(msg: &str) -> Self {
        Self {
            body: format!("-ERR {msg}\r\n").into_bytes(),
            close: false,
        }
    }

    /// A `+OK` status line, zero or more payload lines, and the
    /// terminating `.` line.
    fn multi(status: &str, lines: &[String]) -> Self {
        let mut body = format!("+OK {status}\r\n").into_bytes();
        for line in lines {
            body.extend_from_slice(line.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b".\r\n");
        Self { body, close: false }
    }

    /// The raw bytes to write, exactly as they should hit the wire.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Whether the connection should be closed after this reply.
    #[must_use]
    pub const fn close(&self) -> bool {
        self.close
    }
}

/// Per-connection POP3 state machine.
pub struct Pop3Session {
    store: Arc<MailStore>,
    state: State,
    user: Option<String>,
    snapshot: Vec<MailRecord>,
    deleted: HashSet<u64>,
}

impl Pop3Session {
    #[must_use]
    pub fn new(store: Arc<MailStore>) -> Self {
        Self {
            store,
            state: State::Authorization,
            user: None,
            snapshot: Vec::new(),
            deleted: HashSet::new(),
        }
    }

    /// The greeting sent when the connection is accepted.
    #[must_use]
    pub fn greeting() -> Reply {
        Reply::ok("POP3 server ready")
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Process one command line and produce the reply for it.
    pub fn handle(&mut self, line: &str) -> Reply {
        let command = Command::parse(line);
        debug!(state = ?self.state, ?command, "POP3 command");

        match command {
            Command::User(name) => self.user_cmd(name),
            Command::Pass => self.pass(),
            Command::Stat => self.stat(),
            Command::List(number) => self.list(number),
            Command::Retr(number) => self.retr(number),
            Command::Dele(number) => self.dele(number),
            Command::Rset => self.rset(),
            Command::Noop => Reply::ok(""),
            Command::Quit => self.quit(),
            Command::Capa => Self::capa(),
            Command::Unknown(_) => Reply::err("Unknown command"),
        }
    }

    fn user_cmd(&mut self, name: Option<String>) -> Reply {
        if self.state != State::Authorization {
            return Reply::err("Already authenticated");
        }
        self.user = name;
        Reply::ok("User accepted")
    }

    /// Any password is accepted. The store snapshot is captured here,
    /// exactly once, and never refreshed for the life of the session.
    fn pass(&mut self) -> Reply {
        if self.state != State::Authorization {
            return Reply::err("Already authenticated");
        }
        self.state = State::Transaction;
        self.snapshot = self.store.list();
        debug!(
            user = self.user.as_deref().unwrap_or("<none>"),
            messages = self.snapshot.len(),
            "POP3 session authenticated"
        );
        Reply::ok("Welcome")
    }

    fn stat(&self) -> Reply {
        if self.state != State::Transaction {
            return Reply::err("Must login first");
        }
        let (count, size) = self
            .live_entries()
            .fold((0_usize, 0_usize), |(count, size), (_, record)| {
                (count + 1, size + record.raw_size())
            });
        Reply::ok(&format!("{count} {size}"))
    }

    fn list(&self, arg: Option<MessageArg>) -> Reply {
        if self.state != State::Transaction {
            return Reply::err("Must login first");
        }
        if let Some(arg) = arg {
            return match (arg, self.entry(arg)) {
                (MessageArg::Number(number), Some(record)) => {
                    Reply::ok(&format!("{number} {}", record.raw_size()))
                }
                _ => Reply::err("No such message"),
            };
        }

        let lines: Vec<String> = self
            .live_entries()
            .map(|(position, record)| format!("{position} {}", record.raw_size()))
            .collect();
        Reply::multi(&format!("{} messages", lines.len()), &lines)
    }

    fn retr(&self, arg: MessageArg) -> Reply {
        if self.state != State::Transaction {
            return Reply::err("Must login first");
        }
        let Some(record) = self.entry(arg) else {
            return Reply::err("No such message");
        };

        let mut body = format!("+OK {} octets\r\n", record.raw_size()).into_bytes();
        body.extend_from_slice(&record.raw);
        body.extend_from_slice(b"\r\n.\r\n");
        Reply { body, close: false }
    }

    fn dele(&mut self, arg: MessageArg) -> Reply {
        if self.state != State::Transaction {
            return Reply::err("Must login first");
        }
        let (MessageArg::Number(number), Some(record)) = (arg, self.entry(arg)) else {
            return Reply::err("No such message");
        };
        let id = record.id;
        self.deleted.insert(id);
        debug!(id, "marked for deletion");
        Reply::ok(&format!("Message {number} deleted"))
    }

    fn rset(&mut self) -> Reply {
        if self.state != State::Transaction {
            return Reply::err("Must login first");
        }
        self.deleted.clear();
        Reply::ok("Reset")
    }

    /// QUIT in the Transaction state commits every pending deletion to
    /// the shared store. Each delete is independent; an id that is
    /// already gone (evicted since the snapshot, or deleted by another
    /// session) is skipped silently.
    fn quit(&mut self) -> Reply {
        if self.state == State::Transaction {
            self.state = State::Update;
            for id in self.deleted.drain() {
                self.store.delete_by_id(id);
            }
        }
        let mut reply = Reply::ok("Goodbye");
        reply.close = true;
        reply
    }

    fn capa() -> Reply {
        Reply::multi(
            "Capability list follows",
            &["USER".to_string(), "IMPLEMENTATION mailsink".to_string()],
        )
    }

    /// Resolve a 1-based snapshot position to a live entry.
    ///
    /// `None` covers, indistinguishably: missing or unparsable number,
    /// position out of range, and entry already marked for deletion.
    fn entry(&self, arg: MessageArg) -> Option<&MailRecord> {
        let MessageArg::Number(number) = arg else {
            return None;
        };
        let record = self.snapshot.get(number.checked_sub(1)?)?;
        if self.deleted.contains(&record.id) {
            return None;
        }
        Some(record)
    }

    /// Snapshot entries not yet marked for deletion, with their
    /// original 1-based positions.
    fn live_entries(&self) -> impl Iterator<Item = (usize, &MailRecord)> + '_ {
        self.snapshot
            .iter()
            .enumerate()
            .filter(|(_, record)| !self.deleted.contains(&record.id))
            .map(|(index, record)| (index + 1, record))
    }
}
