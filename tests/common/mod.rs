//! Shared helpers for driving the servers over real TCP.

// Each integration-test binary compiles this module separately and
// uses a different subset of it.
#![allow(dead_code)]

use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// A minimal line-oriented protocol client.
pub struct LineClient {
    stream: BufReader<TcpStream>,
}

impl LineClient {
    /// Connect and return the client without reading the greeting.
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Send one CRLF-terminated command line.
    pub async fn send(&mut self, line: &str) {
        self.stream
            .get_mut()
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write");
        self.stream.get_mut().flush().await.expect("flush");
    }

    /// Write raw bytes without any terminator (for framing tests).
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.get_mut().write_all(bytes).await.expect("write");
        self.stream.get_mut().flush().await.expect("flush");
    }

    /// Read a single response line, terminator stripped.
    pub async fn read_line(&mut self) -> String {
        let mut line = String::new();
        let n = self.stream.read_line(&mut line).await.expect("read");
        assert!(n > 0, "connection closed while expecting a line");
        line.trim_end_matches("\r\n").to_string()
    }

    /// Read lines until the lone `.` terminator of a multi-line
    /// response; the `.` itself is not returned.
    pub async fn read_until_dot(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await;
            if line == "." {
                return lines;
            }
            lines.push(line);
        }
    }

    /// Send a command and read a single-line reply.
    pub async fn roundtrip(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_line().await
    }
}

/// Build a minimal RFC 5322 message.
pub fn make_raw_email(from: &str, to: &str, subject: &str, body: &str) -> Vec<u8> {
    format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {subject}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {body}"
    )
    .into_bytes()
}
