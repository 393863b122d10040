//! POP3 TCP server
//!
//! Binds a listener and runs one [`Pop3Session`] per accepted
//! connection on its own tokio task. Connections never share anything
//! except the [`MailStore`]. Within a connection, commands are handled
//! strictly in arrival order: each reply is fully written before the
//! next buffered line is taken.

use super::session::Pop3Session;
use crate::error::Result;
use crate::framing::LineBuffer;
use crate::store::MailStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// A running POP3 server.
///
/// The accept loop runs on a background task for as long as this
/// handle is alive. Bind to port 0 to let the OS pick a free port,
/// then read it back with [`Pop3Server::local_addr`].
pub struct Pop3Server {
    local_addr: SocketAddr,
    /// Keeps the accept loop alive for the lifetime of the handle.
    _handle: tokio::task::JoinHandle<()>,
}

impl Pop3Server {
    /// Bind `addr` and start accepting POP3 connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(addr: &str, store: Arc<MailStore>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "POP3 server listening");

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    break;
                };
                debug!(%peer, "POP3 client connected");
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, store).await {
                        warn!(%peer, error = %e, "POP3 connection error");
                    }
                    debug!(%peer, "POP3 client disconnected");
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

/// Drive one connection: greeting, then the command/reply loop.
///
/// An error or EOF here simply discards the session; deletion marks
/// that were not committed via QUIT are lost with it.
async fn handle_connection(mut stream: TcpStream, store: Arc<MailStore>) -> std::io::Result<()> {
    let mut session = Pop3Session::new(store);
    stream.write_all(Pop3Session::greeting().bytes()).await?;

    let mut lines = LineBuffer::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        lines.extend(&chunk[..n]);

        while let Some(line) = lines.next_line() {
            let line = String::from_utf8_lossy(&line);
            let reply = session.handle(&line);
            stream.write_all(reply.bytes()).await?;
            stream.flush().await?;
            if reply.close() {
                return stream.shutdown().await;
            }
        }
    }
}
