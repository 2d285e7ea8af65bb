//! Serialized command execution.
//!
//! The device cannot process overlapping writes, so one tokio task owns the
//! transport and runs submitted commands strictly one at a time, in the order
//! they were submitted. A failing command only fails its own submitter; the
//! queue keeps draining.
//!
//! ```text
//!  drive()/stop()/...   keepalive tick
//!          │                  │
//!          └──── submit() ────┘
//!                   │  (unbounded FIFO)
//!                   ▼
//!           scheduler task ── write [+ read] ──▶ Transport
//!                   │
//!                   ▼
//!         oneshot reply per command
//! ```

use crate::error::{Result, SBrickError};
use crate::protocol::format_frame;
use crate::transport::{Characteristic, Transport};
use log::trace;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// A single transport operation: write a frame, optionally read the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub characteristic: Characteristic,
    pub payload: Vec<u8>,
    /// Read the characteristic back after writing, expecting at least this many bytes
    pub response_len: Option<usize>,
}

impl Command {
    /// Fire-and-forget write
    pub fn write(characteristic: Characteristic, payload: Vec<u8>) -> Self {
        Command {
            characteristic,
            payload,
            response_len: None,
        }
    }

    /// Write then read back a reply of at least `response_len` bytes
    pub fn query(characteristic: Characteristic, payload: Vec<u8>, response_len: usize) -> Self {
        Command {
            characteristic,
            payload,
            response_len: Some(response_len),
        }
    }

    pub fn opcode(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

struct Job {
    command: Command,
    reply: oneshot::Sender<Result<Vec<u8>>>,
}

/// Handle resolving to the outcome of a submitted command.
///
/// The command runs whether or not the handle is awaited; dropping it only
/// discards the reply.
pub struct PendingCommand {
    rx: oneshot::Receiver<Result<Vec<u8>>>,
}

impl Future for PendingCommand {
    type Output = Result<Vec<u8>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(SBrickError::NotConnected)))
    }
}

/// FIFO command queue with exactly one operation in flight.
///
/// Cloning yields another handle onto the same queue. The worker task stops
/// once every handle is dropped.
#[derive(Clone)]
pub struct CommandScheduler {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
}

impl CommandScheduler {
    /// Spawn the worker task on the current tokio runtime.
    pub fn spawn(transport: Arc<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_queue(transport, rx, depth.clone()));
        CommandScheduler { tx, depth }
    }

    /// Enqueue a command. Its position in the queue is fixed when this returns.
    pub fn submit(&self, command: Command) -> PendingCommand {
        let (reply, rx) = oneshot::channel();
        self.depth.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(job)) = self.tx.send(Job { command, reply }) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            let _ = job.reply.send(Err(SBrickError::NotConnected));
        }
        PendingCommand { rx }
    }

    /// Submit a command and wait for its outcome.
    pub async fn execute(&self, command: Command) -> Result<Vec<u8>> {
        self.submit(command).await
    }

    /// Commands submitted but not yet completed
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.depth() == 0
    }
}

async fn run_queue(
    transport: Arc<dyn Transport>,
    mut rx: mpsc::UnboundedReceiver<Job>,
    depth: Arc<AtomicUsize>,
) {
    while let Some(Job { command, reply }) = rx.recv().await {
        let result = run_command(&*transport, &command).await;
        depth.fetch_sub(1, Ordering::SeqCst);
        let _ = reply.send(result);
    }
    trace!("Command queue closed");
}

async fn run_command(transport: &dyn Transport, command: &Command) -> Result<Vec<u8>> {
    if !transport.is_connected() {
        return Err(SBrickError::NotConnected);
    }

    trace!("Sending:  {} -> {:?}", format_frame(&command.payload), command.characteristic);
    transport.write(command.characteristic, &command.payload).await?;

    let Some(expected) = command.response_len else {
        return Ok(Vec::new());
    };

    let response = transport.read(command.characteristic).await?;
    trace!("Received: {} <- {:?}", format_frame(&response), command.characteristic);

    if response.len() < expected {
        return Err(SBrickError::InvalidResponse {
            expected: format!("{} bytes", expected),
            actual: format_frame(&response),
        });
    }
    Ok(response)
}
