//! SMTP session state machine
//!
//! A deliberately small RFC 5321 subset: enough for mail libraries and
//! test drivers to hand us a message. The envelope state machine is:
//!
//! ```text
//!   (HELO/EHLO)* -> MAIL FROM -> RCPT TO+ -> DATA -> <dot> -> back to idle
//! ```
//!
//! Authentication is accepted unconditionally, matching the harness
//! contract that credentials are never verified. When the data
//! terminator arrives, the collected bytes are normalized (headers
//! parsed with `mail-parser`, envelope used as fallback) and deposited
//! into the shared [`MailStore`]. Normalization is best-effort: a
//! message whose headers cannot be parsed is still stored with its
//! envelope fields.

use crate::store::{IncomingMail, MailStore};
use mail_parser::{Address, MessageParser};
use std::sync::Arc;
use tracing::{debug, info};

const SERVER_NAME: &str = "mailsink";

/// A response ready to be written back to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    body: Vec<u8>,
    close: bool,
}

impl Reply {
    fn line(text: &str) -> Self {
        Self {
            body: format!("{text}\r\n").into_bytes(),
            close: false,
        }
    }

    fn lines(texts: &[String]) -> Self {
        let mut body = Vec::new();
        for text in texts {
            body.extend_from_slice(text.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        Self { body, close: false }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub const fn close(&self) -> bool {
        self.close
    }
}

/// Per-connection SMTP state machine.
pub struct SmtpSession {
    store: Arc<MailStore>,
    helo: Option<String>,
    sender: Option<String>,
    recipients: Vec<String>,
    /// `Some` while between DATA and its terminating `.` line.
    data: Option<Vec<u8>>,
}

impl SmtpSession {
    #[must_use]
    pub fn new(store: Arc<MailStore>) -> Self {
        Self {
            store,
            helo: None,
            sender: None,
            recipients: Vec::new(),
            data: None,
        }
    }

    /// The greeting sent when the connection is accepted.
    #[must_use]
    pub fn greeting() -> Reply {
        Reply::line(&format!("220 {SERVER_NAME} ESMTP service ready"))
    }

    /// Process one inbound line.
    ///
    /// Returns `None` for message-body lines, which are consumed
    /// without a reply.
    pub fn handle(&mut self, line: &[u8]) -> Option<Reply> {
        if self.data.is_some() {
            return self.data_line(line);
        }

        let line = String::from_utf8_lossy(line);
        let verb = line
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        debug!(%verb, "SMTP command");

        let reply = match verb.as_str() {
            "HELO" => self.helo(&line, false),
            "EHLO" => self.helo(&line, true),
            "AUTH" => Reply::line("235 Authentication successful"),
            "MAIL" => self.mail(&line),
            "RCPT" => self.rcpt(&line),
            "DATA" => self.data_cmd(),
            "RSET" => {
                self.reset_transaction();
                Reply::line("250 OK")
            }
            "NOOP" => Reply::line("250 OK"),
            "QUIT" => {
                let mut reply = Reply::line(&format!("221 {SERVER_NAME} closing connection"));
                reply.close = true;
                reply
            }
            _ => Reply::line("500 Unrecognized command"),
        };
        Some(reply)
    }

    fn helo(&mut self, line: &str, extended: bool) -> Reply {
        let name = line
            .split_whitespace()
            .nth(1)
            .unwrap_or("anonymous")
            .to_string();
        self.reset_transaction();

        let reply = if extended {
            Reply::lines(&[
                format!("250-{SERVER_NAME} greets {name}"),
                "250 AUTH PLAIN LOGIN".to_string(),
            ])
        } else {
            Reply::line(&format!("250 {SERVER_NAME} greets {name}"))
        };
        self.helo = Some(name);
        reply
    }

    fn mail(&mut self, line: &str) -> Reply {
        if self.sender.is_some() {
            return Reply::line("503 Nested MAIL command");
        }
        let Some(address) = parse_path(line, "FROM") else {
            return Reply::line("501 Syntax error in MAIL command");
        };
        self.sender = Some(address);
        Reply::line("250 OK")
    }

    fn rcpt(&mut self, line: &str) -> Reply {
        if self.sender.is_none() {
            return Reply::line("503 Need MAIL command first");
        }
        let Some(address) = parse_path(line, "TO") else {
            return Reply::line("501 Syntax error in RCPT command");
        };
        self.recipients.push(address);
        Reply::line("250 OK")
    }

    fn data_cmd(&mut self) -> Reply {
        if self.recipients.is_empty() {
            return Reply::line("503 Need RCPT command first");
        }
        self.data = Some(Vec::new());
        Reply::line("354 End data with <CR><LF>.<CR><LF>")
    }

    /// One line of the message body. A lone `.` terminates the message;
    /// a leading `.` on any other line is transparency padding and is
    /// stripped (RFC 5321 section 4.5.2).
    fn data_line(&mut self, line: &[u8]) -> Option<Reply> {
        if line == b"." {
            let raw = self.data.take().unwrap_or_default();
            self.accept_message(raw);
            self.reset_transaction();
            return Some(Reply::line("250 OK message accepted"));
        }

        let buffer = self.data.as_mut()?;
        let unstuffed = if line.first() == Some(&b'.') {
            &line[1..]
        } else {
            line
        };
        buffer.extend_from_slice(unstuffed);
        buffer.extend_from_slice(b"\r\n");
        None
    }

    fn accept_message(&mut self, raw: Vec<u8>) {
        let sender = self.sender.take().unwrap_or_default();
        let recipients = std::mem::take(&mut self.recipients);
        let mail = normalize(raw, sender, recipients);
        let record = self.store.insert(mail);
        info!(
            id = record.id,
            client = self.helo.as_deref().unwrap_or("unknown"),
            from = %record.sender,
            to = ?record.recipients,
            "mail received"
        );
    }

    fn reset_transaction(&mut self) {
        self.sender = None;
        self.recipients.clear();
        self.data = None;
    }
}

/// Extract the address from `MAIL FROM:<addr>` / `RCPT TO:<addr>`.
///
/// Angle brackets are optional and trailing ESMTP parameters are
/// ignored.
fn parse_path(line: &str, keyword: &str) -> Option<String> {
    let rest = line.split_once(':').and_then(|(left, right)| {
        left.trim()
            .to_ascii_uppercase()
            .ends_with(&keyword.to_ascii_uppercase())
            .then_some(right)
    })?;
    let address = rest
        .split_whitespace()
        .next()?
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string();
    if address.is_empty() {
        return None;
    }
    Some(address)
}

/// Build the normalized record for the store: parsed header fields
/// where available, envelope fields as fallback.
fn normalize(raw: Vec<u8>, envelope_from: String, envelope_to: Vec<String>) -> IncomingMail {
    let parsed = MessageParser::default().parse(&raw);

    let (sender, recipients, subject, body_text, body_html) = parsed.map_or_else(
        || (None, None, None, None, None),
        |message| {
            let sender = message
                .from()
                .and_then(Address::first)
                .and_then(|addr| addr.address())
                .map(ToString::to_string);
            let recipients: Option<Vec<String>> = message.to().map(|to| {
                to.iter()
                    .filter_map(|addr| addr.address())
                    .map(ToString::to_string)
                    .collect()
            });
            let subject = message.subject().map(ToString::to_string);
            let body_text = message.body_text(0).map(|text| text.into_owned());
            let body_html = message.body_html(0).map(|html| html.into_owned());
            (sender, recipients, subject, body_text, body_html)
        },
    );

    IncomingMail {
        sender: sender.unwrap_or(envelope_from),
        recipients: recipients.filter(|r| !r.is_empty()).unwrap_or(envelope_to),
        subject: subject.unwrap_or_default(),
        body_text: body_text.unwrap_or_default(),
        body_html,
        raw,
    }
}
