//! SMTP TCP server
//!
//! Same shape as the POP3 side: bind, accept, one session per
//! connection on its own task, lines framed by the shared CRLF
//! transport. Message-body lines produce no reply; everything else is
//! answered before the next buffered line is processed.

use super::session::SmtpSession;
use crate::error::Result;
use crate::framing::LineBuffer;
use crate::store::MailStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// A running SMTP server.
pub struct SmtpServer {
    local_addr: SocketAddr,
    /// Keeps the accept loop alive for the lifetime of the handle.
    _handle: tokio::task::JoinHandle<()>,
}

impl SmtpServer {
    /// Bind `addr` and start accepting SMTP connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(addr: &str, store: Arc<MailStore>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "SMTP server listening");

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    break;
                };
                debug!(%peer, "SMTP client connected");
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, store).await {
                        warn!(%peer, error = %e, "SMTP connection error");
                    }
                    debug!(%peer, "SMTP client disconnected");
                });
            }
        });

        Ok(Self {
            local_addr,
            _handle: handle,
        })
    }

    /// The address the server is listening on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

async fn handle_connection(mut stream: TcpStream, store: Arc<MailStore>) -> std::io::Result<()> {
    let mut session = SmtpSession::new(store);
    stream.write_all(SmtpSession::greeting().bytes()).await?;

    let mut lines = LineBuffer::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        lines.extend(&chunk[..n]);

        while let Some(line) = lines.next_line() {
            let Some(reply) = session.handle(&line) else {
                continue;
            };
            stream.write_all(reply.bytes()).await?;
            stream.flush().await?;
            if reply.close() {
                return stream.shutdown().await;
            }
        }
    }
}
