//! Connection lifecycle: greeting, read/dispatch/write loop, close.

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rusty_logo_core::config::Config;
use rusty_logo_core::error::Result;
use rusty_logo_core::protocol::LINE_ENDING;
use rusty_logo_core::session::{Reply, Session};

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent `quit`.
    Quit,
    /// Client closed its side.
    Eof,
    /// Server shutting down.
    Cancelled,
    /// Client sent a line longer than `max_line_bytes`.
    LineTooLong,
    /// Read or write failed.
    Transport,
}

/// Everything a connection needs to start a session.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub max_line_bytes: usize,
    template: Session,
}

impl ConnectionSettings {
    /// Build settings from config. Fails if the configured canvas is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            max_line_bytes: config.server().max_line_bytes,
            template: Session::new(&config.canvas())?,
        })
    }

    /// A fresh session: empty canvas, centered cursor.
    pub fn new_session(&self) -> Session {
        self.template.clone()
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            max_line_bytes: rusty_logo_core::config::ServerConfig::default().max_line_bytes,
            template: Session::default(),
        }
    }
}

/// Run one session over `stream` until the client quits, the stream closes
/// or fails, or `cancel` fires.
///
/// Lines are split on `\n`; a trailing `\r` and invalid UTF-8 are tolerated
/// (the latter simply never parses as a command). Each reply is written and
/// flushed before the next line is read.
pub async fn handle_connection<S>(
    stream: S,
    settings: &ConnectionSettings,
    cancel: CancellationToken,
) -> CloseReason
where
    S: AsyncRead + AsyncWrite,
{
    let mut session = settings.new_session();
    let (reader, mut writer) = tokio::io::split(stream);
    let codec = AnyDelimiterCodec::new_with_max_length(
        b"\n".to_vec(),
        b"\n".to_vec(),
        settings.max_line_bytes,
    );
    let mut lines = FramedRead::new(reader, codec);

    let greeting = session.greet();
    if let Err(e) = write_lines(&mut writer, &[greeting]).await {
        debug!(%e, "Failed to send greeting");
        session.abort();
        return finish(&session, CloseReason::Transport);
    }

    let reason = loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break CloseReason::Cancelled,
            next = lines.next() => next,
        };

        let raw = match next {
            Some(Ok(raw)) => raw,
            Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                warn!(limit = settings.max_line_bytes, "Line too long, closing connection");
                break CloseReason::LineTooLong;
            }
            Some(Err(AnyDelimiterCodecError::Io(e))) => {
                debug!(%e, "Read failed");
                break CloseReason::Transport;
            }
            None => break CloseReason::Eof,
        };

        let line = String::from_utf8_lossy(&raw);
        debug!(line = line.trim_end(), "> received");

        let reply = session.handle_line(&line);
        if !reply.is_none() {
            if let Err(e) = write_reply(&mut writer, reply).await {
                debug!(%e, "Write failed");
                break CloseReason::Transport;
            }
        }

        if session.is_closed() {
            if let Err(e) = writer.shutdown().await {
                debug!(%e, "Shutdown after quit failed");
            }
            break CloseReason::Quit;
        }
    };

    session.abort();
    finish(&session, reason)
}

fn finish(session: &Session, reason: CloseReason) -> CloseReason {
    info!(reason = ?reason, commands = session.commands_handled(), "Connection closed");
    reason
}

async fn write_reply<W>(writer: &mut W, reply: Reply) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let lines = reply.into_lines();
    write_lines(writer, &lines).await
}

/// Write every line with a CRLF terminator in one buffer, then flush.
async fn write_lines<W, L>(writer: &mut W, lines: &[L]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    L: AsRef<str>,
{
    let mut buf = String::new();
    for line in lines {
        buf.push_str(line.as_ref());
        buf.push_str(LINE_ENDING);
    }
    writer.write_all(buf.as_bytes()).await?;
    writer.flush().await
}
