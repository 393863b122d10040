//! CRLF line framing
//!
//! Both protocol servers consume an unbounded inbound byte stream and
//! need it cut into discrete command lines. [`LineBuffer`] accumulates
//! raw reads and yields each complete line as soon as its two-byte
//! `\r\n` terminator has arrived; partial lines stay buffered across
//! reads. A bare `\n` does not terminate a line.
//!
//! No maximum line length is enforced, so a peer that never sends the
//! terminator can grow the buffer without bound. That is an accepted
//! limitation for a test harness, not something this type guards
//! against.

/// Accumulates inbound bytes and splits them into CRLF-terminated lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes to the buffer.
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line, with its terminator stripped.
    ///
    /// Returns `None` until a full `\r\n`-terminated line is buffered.
    pub(crate) fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let line = self.buf[..pos].to_vec();
        self.buf.drain(..pos + 2);
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines() {
        let mut lines = LineBuffer::new();
        lines.extend(b"STAT\r\nLIST\r\n");
        assert_eq!(lines.next_line().unwrap(), b"STAT");
        assert_eq!(lines.next_line().unwrap(), b"LIST");
        assert!(lines.next_line().is_none());
    }

    #[test]
    fn buffers_partial_lines_across_reads() {
        let mut lines = LineBuffer::new();
        lines.extend(b"RE");
        assert!(lines.next_line().is_none());
        lines.extend(b"TR 1\r");
        assert!(lines.next_line().is_none());
        lines.extend(b"\nNOOP\r\n");
        assert_eq!(lines.next_line().unwrap(), b"RETR 1");
        assert_eq!(lines.next_line().unwrap(), b"NOOP");
    }

    #[test]
    fn bare_newline_is_not_a_terminator() {
        let mut lines = LineBuffer::new();
        lines.extend(b"QUIT\n");
        assert!(lines.next_line().is_none());
        lines.extend(b"\r\n");
        assert_eq!(lines.next_line().unwrap(), b"QUIT\n");
    }

    #[test]
    fn empty_line_is_yielded() {
        let mut lines = LineBuffer::new();
        lines.extend(b"\r\n");
        assert_eq!(lines.next_line().unwrap(), b"");
    }
}
