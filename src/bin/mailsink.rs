#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! mailsink: in-memory SMTP/POP3 mail-testing server

use clap::Parser;
use mailsink::{Config, MailStore, Pop3Server, SmtpServer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailsink")]
#[command(about = "In-memory SMTP/POP3 mail-testing server")]
struct Args {
    /// Address to bind listeners on
    #[arg(long)]
    host: Option<String>,

    /// SMTP listener port
    #[arg(long)]
    smtp_port: Option<u16>,

    /// POP3 listener port
    #[arg(long)]
    pop3_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.smtp_port {
        config.smtp_port = port;
    }
    if let Some(port) = args.pop3_port {
        config.pop3_port = port;
    }

    let store = Arc::new(MailStore::new());
    let smtp = SmtpServer::start(&config.smtp_addr(), store.clone()).await?;
    let pop3 = Pop3Server::start(&config.pop3_addr(), store).await?;

    tracing::info!(
        smtp = %smtp.local_addr(),
        pop3 = %pop3.local_addr(),
        "mailsink ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
