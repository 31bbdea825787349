//! In-memory process launcher for tests. Processes never exit until the test
//! says so via [`FakeLauncher::exit`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use super::process::{
    ExitOutcome, ProcessControl, ProcessLauncher, Signal, SignalFuture, SpawnedProcess,
};

struct FakeProcess {
    program: String,
    args: Vec<String>,
    exit_tx: Option<oneshot::Sender<ExitOutcome>>,
    exited: Arc<AtomicBool>,
    signals: Arc<Mutex<Vec<Signal>>>,
}

#[derive(Default)]
pub struct FakeLauncher {
    pub fail_spawn: bool,
    pub fail_graceful: bool,
    pub fail_forceful: bool,
    pub(crate) processes: Mutex<Vec<FakeProcess>>,
}

impl FakeLauncher {
    pub fn spawn_count(&self) -> usize {
        self.processes.lock().unwrap().len()
    }

    /// Make the `index`-th spawned process exit with `outcome`.
    pub fn exit(&self, index: usize, outcome: ExitOutcome) {
        let tx = self.processes.lock().unwrap()[index].exit_tx.take();
        tx.expect("process already exited").send(outcome).unwrap();
    }

    /// Like [`FakeLauncher::exit`], but the process takes `delay` to wind down.
    pub fn exit_later(&self, index: usize, delay: Duration) {
        let tx = self.processes.lock().unwrap()[index].exit_tx.take();
        let tx = tx.expect("process already exited");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ExitOutcome::Failed { code: None });
        });
    }

    /// Whether the exit of the `index`-th process has been observed.
    pub fn has_exited(&self, index: usize) -> bool {
        self.processes.lock().unwrap()[index]
            .exited
            .load(Ordering::SeqCst)
    }

    pub fn signals(&self, index: usize) -> Vec<Signal> {
        self.processes.lock().unwrap()[index]
            .signals
            .lock()
            .unwrap()
            .clone()
    }

    pub fn invocation(&self, index: usize) -> (String, Vec<String>) {
        let processes = self.processes.lock().unwrap();
        (processes[index].program.clone(), processes[index].args.clone())
    }
}

struct FakeControl {
    pid: u32,
    fail_graceful: bool,
    fail_forceful: bool,
    signals: Arc<Mutex<Vec<Signal>>>,
}

impl ProcessControl for FakeControl {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn signal(&self, signal: Signal) -> SignalFuture {
        self.signals.lock().unwrap().push(signal);
        let fail = match signal {
            Signal::Graceful => self.fail_graceful,
            Signal::Forceful => self.fail_forceful,
        };
        Box::pin(async move {
            if fail {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                Ok(())
            }
        })
    }
}

impl ProcessLauncher for FakeLauncher {
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<SpawnedProcess> {
        if self.fail_spawn {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }

        let mut processes = self.processes.lock().unwrap();
        let (exit_tx, exit_rx) = oneshot::channel();
        let signals = Arc::new(Mutex::new(Vec::new()));
        let exited = Arc::new(AtomicBool::new(false));
        let control = FakeControl {
            pid: 1000 + processes.len() as u32,
            fail_graceful: self.fail_graceful,
            fail_forceful: self.fail_forceful,
            signals: Arc::clone(&signals),
        };
        processes.push(FakeProcess {
            program: program.to_string(),
            args: args.to_vec(),
            exit_tx: Some(exit_tx),
            exited: Arc::clone(&exited),
            signals,
        });

        Ok(SpawnedProcess {
            control: Box::new(control),
            exit: Box::pin(async move {
                match exit_rx.await {
                    Ok(outcome) => {
                        exited.store(true, Ordering::SeqCst);
                        outcome
                    }
                    Err(_) => ExitOutcome::WaitFailed {
                        message: "test dropped the process".to_string(),
                    },
                }
            }),
        })
    }
}
