//! Spawning and signalling capture processes.
//!
//! A spawned process is split in two: a [`ProcessControl`] that the manager
//! keeps in the registry for signalling, and an exit future that the watcher
//! task owns and awaits. Signalling never waits for the process to exit.
//!
//! Real children are owned by a supervisor task. Signals are sent to it as
//! messages and only delivered while the child has not been reaped, so a
//! recycled pid is never signalled.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ask the process to finish (SIGTERM). Lets the capture tool close the file.
    Graceful,
    /// SIGKILL.
    Forceful,
}

/// How a capture process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit. `code` is `None` when the process was killed by a signal.
    Failed { code: Option<i32> },
    WaitFailed { message: String },
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }
}

impl From<io::Result<ExitStatus>> for ExitOutcome {
    fn from(result: io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) if status.success() => ExitOutcome::Success,
            Ok(status) => ExitOutcome::Failed {
                code: status.code(),
            },
            Err(e) => ExitOutcome::WaitFailed {
                message: e.to_string(),
            },
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Success => write!(f, "exited successfully"),
            ExitOutcome::Failed { code: Some(code) } => write!(f, "exited with code {code}"),
            ExitOutcome::Failed { code: None } => write!(f, "terminated by signal"),
            ExitOutcome::WaitFailed { message } => write!(f, "could not be waited on: {message}"),
        }
    }
}

pub type ExitFuture = Pin<Box<dyn Future<Output = ExitOutcome> + Send + 'static>>;

/// Resolves once the signal has been delivered, or the process turned out to
/// have exited already.
pub type SignalFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'static>>;

pub trait ProcessControl: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn signal(&self, signal: Signal) -> SignalFuture;
}

pub struct SpawnedProcess {
    pub control: Box<dyn ProcessControl>,
    pub exit: ExitFuture,
}

/// Starts capture processes. Must return as soon as the process is running.
pub trait ProcessLauncher: Send + Sync {
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<SpawnedProcess>;
}

/// Launches real child processes through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<SpawnedProcess> {
        debug!("Spawning {} {:?}", program, args);

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child.id();
        let (requests, inbox) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(supervise(child, inbox, exit_tx));

        let exit: ExitFuture = Box::pin(async move {
            exit_rx.await.unwrap_or_else(|_| ExitOutcome::WaitFailed {
                message: "process supervisor stopped".to_string(),
            })
        });

        Ok(SpawnedProcess {
            control: Box::new(ChildControl { pid, requests }),
            exit,
        })
    }
}

type SignalRequest = (Signal, oneshot::Sender<io::Result<()>>);

/// Waits for the child and delivers signal requests until it has been reaped.
async fn supervise(
    mut child: Child,
    mut inbox: mpsc::UnboundedReceiver<SignalRequest>,
    exit_tx: oneshot::Sender<ExitOutcome>,
) {
    let outcome = loop {
        tokio::select! {
            biased;
            status = child.wait() => break ExitOutcome::from(status),
            Some((signal, reply)) = inbox.recv() => {
                let _ = reply.send(deliver(&mut child, signal));
            }
        }
    };
    // Requests still queued are dropped unanswered, which reads as "already exited".
    drop(inbox);
    let _ = exit_tx.send(outcome);
}

fn deliver(child: &mut Child, signal: Signal) -> io::Result<()> {
    match signal {
        Signal::Graceful => terminate(child),
        Signal::Forceful => child.start_kill(),
    }
}

#[cfg(unix)]
fn terminate(child: &Child) -> io::Result<()> {
    // `id()` is `None` once the child has been reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn terminate(_child: &Child) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination is only supported on unix",
    ))
}

/// Handle to a supervised child.
#[derive(Debug)]
pub struct ChildControl {
    pid: Option<u32>,
    requests: mpsc::UnboundedSender<SignalRequest>,
}

impl ProcessControl for ChildControl {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn signal(&self, signal: Signal) -> SignalFuture {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.requests.send((signal, reply_tx)).is_err() {
            // Supervisor is gone, so the child has been reaped.
            return Box::pin(async { Ok(()) });
        }
        Box::pin(async move { reply_rx.await.unwrap_or(Ok(())) })
    }
}
