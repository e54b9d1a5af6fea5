//! # IRC Listener
//!
//! Owns the connection to the feed server: registers a nickname (retrying with `_` appended while
//! it is taken), joins the feed channel once welcomed, answers keepalive pings and hands channel
//! messages to the `FeedDispatcher`. A dropped session is re-established after a fixed delay.

use futures::{SinkExt, StreamExt};
use irc_proto::{ChannelExt, Command, Message, Response};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead, FramedWrite};

use crate::application::dispatcher::FeedDispatcher;
use crate::domain::config::IrcConfig;
use crate::strings::logs;

/// Longest line accepted from the server before the session is dropped.
pub const MAX_LINE_LENGTH: usize = 16 * 1024;

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection.
    Closed,
    /// The server sent `ERROR`.
    ServerError(String),
}

pub struct IrcListener {
    config: IrcConfig,
    dispatcher: Arc<FeedDispatcher>,
}

impl IrcListener {
    pub fn new(config: IrcConfig, dispatcher: Arc<FeedDispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Connects and listens forever, reconnecting after `reconnect_delay_secs` whenever the
    /// session ends. Cancel by dropping the future.
    pub async fn run(&self) {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);
        loop {
            match self.connect_once().await {
                Ok(SessionEnd::Closed) => tracing::warn!("{}", logs::session_ended("connection closed")),
                Ok(SessionEnd::ServerError(msg)) => {
                    tracing::warn!("{}", logs::session_ended(&logs::server_error(&msg)))
                }
                Err(e) => tracing::error!("{}", e),
            }

            tracing::info!("{}", logs::reconnecting(self.config.reconnect_delay_secs));
            tokio::time::sleep(delay).await;
        }
    }

    async fn connect_once(&self) -> Result<SessionEnd, String> {
        let IrcConfig {
            server,
            port,
            channel,
            nickname,
            listen_nickname,
            ..
        } = &self.config;
        tracing::info!(
            "{}",
            logs::connecting(server, *port, channel, nickname, listen_nickname)
        );

        let stream = TcpStream::connect((server.as_str(), *port))
            .await
            .map_err(|e| logs::connect_fail(server, *port, &e.to_string()))?;
        let (reader, writer) = stream.into_split();

        self.session(reader, writer)
            .await
            .map_err(|e| logs::session_ended(&e.to_string()))
    }

    /// Runs one session over an established connection until the server closes it. A line longer
    /// than [`MAX_LINE_LENGTH`] ends the session with an `InvalidData` error.
    pub async fn session<R, W>(&self, reader: R, writer: W) -> io::Result<SessionEnd>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, line_codec());
        let mut writer = FramedWrite::new(writer, line_codec());

        let mut nickname = self.config.nickname.clone();
        send(&mut writer, Command::NICK(nickname.clone())).await?;
        send(&mut writer, Command::USER(nickname.clone(), "0".to_string(), nickname.clone())).await?;

        while let Some(chunk) = lines.next().await {
            let chunk = chunk.map_err(codec_error)?;
            // The feed is not guaranteed to be valid UTF-8.
            let line = String::from_utf8_lossy(&chunk);
            let line = line.trim_end_matches(['\r', '\n']);

            let msg = match line.parse::<Message>() {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("{}", logs::malformed_line(line, &e.to_string()));
                    continue;
                }
            };

            match &msg.command {
                Command::PING(server, _) => {
                    send(&mut writer, Command::PONG(server.clone(), None)).await?;
                }
                Command::Response(Response::RPL_WELCOME, _) => {
                    self.dispatcher.log(&logs::welcome(&self.config.channel));
                    send(&mut writer, Command::JOIN(self.config.channel.clone(), None, None)).await?;
                }
                Command::Response(Response::ERR_NICKNAMEINUSE, _) => {
                    self.dispatcher.log(&logs::nick_in_use(&nickname));
                    nickname.push('_');
                    send(&mut writer, Command::NICK(nickname.clone())).await?;
                }
                Command::PRIVMSG(target, text) if target.is_channel_name() => {
                    if let Some(sender) = msg.source_nickname() {
                        self.dispatcher.handle_message(sender, text).await;
                    }
                }
                Command::ERROR(reason) => return Ok(SessionEnd::ServerError(reason.clone())),
                _ => tracing::trace!("<- {}", line),
            }
        }

        Ok(SessionEnd::Closed)
    }
}

/// Splits on `\n` and terminates outgoing lines with `\r\n`.
fn line_codec() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\r\n".to_vec(), MAX_LINE_LENGTH)
}

fn codec_error(error: AnyDelimiterCodecError) -> io::Error {
    match error {
        AnyDelimiterCodecError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

async fn send<W: AsyncWrite + Unpin>(
    writer: &mut FramedWrite<W, AnyDelimiterCodec>,
    command: Command,
) -> io::Result<()> {
    let line = Message::from(command).to_string();
    let line = line.trim_end_matches(['\r', '\n']);
    tracing::trace!("-> {}", line);
    writer.send(line).await.map_err(codec_error)
}
