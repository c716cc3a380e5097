//! External video requests delivered over TCP.
//!
//! The accept loop runs on its own thread and spawns one handler thread per
//! connection. Handlers push tokens into an unbounded queue; the frame loop pops
//! at most one token per firing tick.

use super::{Rule, RuleKind, RuleSettings};
use crate::log_debug;
use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Bytes read per receive call on a command connection.
pub const COMMAND_BUFFER_BYTES: usize = 1024;

const ACCEPT_RETRY_MIN: Duration = Duration::from_millis(10);
const ACCEPT_RETRY_MAX: Duration = Duration::from_secs(1);

/// Thread-safe FIFO of command tokens. Clones share the same queue.
#[derive(Clone, Debug)]
pub struct CommandQueue {
    sender: Sender<String>,
    receiver: Receiver<String>,
}

impl CommandQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, token: impl Into<String>) {
        // Both ends live in `self`, so the channel cannot be disconnected here.
        let _ = self.sender.send(token.into());
    }

    /// Non-blocking pop; an empty queue is just "nothing this tick".
    pub fn try_pop(&self) -> Option<String> {
        match self.receiver.try_recv() {
            Ok(token) => Some(token),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the token from one received chunk: everything before the first
/// comma, trimmed. Invalid UTF-8 is replaced rather than rejected.
pub fn parse_command(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let token = text.split(',').next().unwrap_or_default().trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Bound listener whose accept loop runs for the rest of the process.
pub struct CommandListener {
    local_addr: SocketAddr,
    _accept_thread: JoinHandle<()>,
}

impl CommandListener {
    pub fn bind(addr: &str, queue: CommandQueue) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .with_context(|| format!("failed to bind command listener on {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("command listener has no local address")?;
        let accept_thread = thread::Builder::new()
            .name("command-accept".to_string())
            .spawn(move || accept_loop(listener, queue))
            .context("failed to spawn command accept thread")?;
        log_debug(&format!("Command listener on {local_addr}"));
        tracing::info!(addr = %local_addr, "command listener bound");
        Ok(Self {
            local_addr,
            _accept_thread: accept_thread,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Pause after the `failures`-th accept error in a row, doubling up to a cap.
pub(crate) fn accept_retry_delay(failures: u32) -> Duration {
    let doublings = failures.saturating_sub(1).min(16);
    ACCEPT_RETRY_MIN
        .saturating_mul(1 << doublings)
        .min(ACCEPT_RETRY_MAX)
}

fn accept_loop(listener: TcpListener, queue: CommandQueue) {
    let mut failures = 0u32;
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                failures = 0;
                let peer = stream
                    .peer_addr()
                    .map(|addr| addr.to_string())
                    .unwrap_or_else(|_| "unknown peer".to_string());
                let queue = queue.clone();
                let spawned = thread::Builder::new()
                    .name("command-conn".to_string())
                    .spawn(move || handle_connection(stream, &peer, &queue));
                if let Err(err) = spawned {
                    log_debug(&format!("failed to spawn command handler: {err}"));
                }
            }
            Err(err) => {
                failures = failures.saturating_add(1);
                let delay = accept_retry_delay(failures);
                if failures == 1 || delay == ACCEPT_RETRY_MAX {
                    log_debug(&format!("command accept failed ({failures} in a row): {err}"));
                }
                thread::sleep(delay);
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream, peer: &str, queue: &CommandQueue) {
    log_debug(&format!("New command connection from {peer}"));
    tracing::info!(peer, "command connection opened");
    let mut buf = [0u8; COMMAND_BUFFER_BYTES];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => match parse_command(&buf[..n]) {
                Some(token) => {
                    log_debug(&format!("[{peer}] queued video request: {token}"));
                    queue.push(token);
                }
                None => log_debug(&format!("[{peer}] dropped empty command")),
            },
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                log_debug(&format!("[{peer}] connection error: {err}"));
                break;
            }
        }
    }
    log_debug(&format!("Command connection closed: {peer}"));
    tracing::info!(peer, "command connection closed");
}

/// Fires while tokens are queued, handing out one token per firing.
pub struct CommandRule {
    queue: CommandQueue,
    listener: Option<CommandListener>,
}

impl CommandRule {
    pub fn new(queue: CommandQueue) -> Self {
        Self {
            queue,
            listener: None,
        }
    }

    pub fn check(&self) -> Option<String> {
        self.queue.try_pop()
    }

    pub fn listener(&self) -> Option<&CommandListener> {
        self.listener.as_ref()
    }
}

impl Rule for CommandRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Command
    }

    fn init(&mut self, settings: &RuleSettings) -> Result<()> {
        if self.listener.is_none() {
            self.listener = Some(CommandListener::bind(
                &settings.listen_addr,
                self.queue.clone(),
            )?);
        }
        Ok(())
    }
}
