//! Recording lifecycle manager.
//!
//! Owns the registry of active recordings. Every read and write of the
//! registry happens under one lock. Start checks, spawns and inserts without
//! releasing it, so two concurrent starts for the same key cannot both win.
//!
//! Each recording gets a watcher task that awaits process exit and then
//! reconciles the registry. Stop removes the entry itself, so whichever of the
//! two gets the lock first performs the removal and the other sees the entry
//! gone (or owned by a newer recording) and does nothing.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::error::{RecorderError, RecorderResult};
use super::key::RecordingKey;
use super::process::{
    ExitFuture, ExitOutcome, ProcessControl, ProcessLauncher, Signal, SpawnedProcess,
    TokioLauncher,
};
use super::strategy::{self, CaptureRequest};

const EVENT_CAPACITY: usize = 64;

pub type RecordingId = Uuid;

/// Snapshot of one active recording, safe to hand out to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub id: RecordingId,
    pub platform: String,
    pub channel: String,
    pub strategy: String,
    pub output_path: PathBuf,
    pub started_at: DateTime<Local>,
    pub pid: Option<u32>,
}

/// Lifecycle notifications published by the manager.
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    Started(RecordingInfo),
    /// Removed by a caller (or by shutdown) and signalled successfully.
    Stopped(RecordingInfo),
    /// The process exited while still registered.
    Ended {
        info: RecordingInfo,
        outcome: ExitOutcome,
    },
    /// Removed from the registry, but neither signal could be delivered.
    /// The process may still be running.
    Orphaned { info: RecordingInfo, error: String },
}

#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub recording_dir: PathBuf,
    pub program: String,
    /// Passed to the program ahead of the strategy's arguments.
    pub extra_args: Vec<String>,
    pub quality: String,
}

struct RecordingHandle {
    info: RecordingInfo,
    control: Box<dyn ProcessControl>,
    /// Finishes once the process has exited and the registry is reconciled.
    watcher: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    active: HashMap<RecordingKey, RecordingHandle>,
    /// Watchers of stopped recordings whose process may still be exiting.
    stopping: Vec<JoinHandle<()>>,
}

impl Registry {
    fn retire(&mut self, watcher: JoinHandle<()>) {
        self.stopping.retain(|handle| !handle.is_finished());
        self.stopping.push(watcher);
    }
}

pub struct RecordingManager {
    registry: Arc<Mutex<Registry>>,
    settings: RecorderSettings,
    launcher: Arc<dyn ProcessLauncher>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<RecordingEvent>,
}

impl RecordingManager {
    pub fn new(settings: RecorderSettings) -> Self {
        Self::with_parts(settings, Arc::new(TokioLauncher), Arc::new(SystemClock))
    }

    pub fn with_parts(
        settings: RecorderSettings,
        launcher: Arc<dyn ProcessLauncher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            settings,
            launcher,
            clock,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.events.subscribe()
    }

    /// Start recording `channel` on `platform`.
    ///
    /// Returns once the capture process is running; it does not wait for it
    /// to finish. A spawn failure leaves the registry untouched.
    pub async fn start(&self, platform: &str, channel: &str) -> RecorderResult<RecordingInfo> {
        let key = RecordingKey::new(platform, channel)?;
        let mut registry = self.registry.lock().await;

        if registry.active.contains_key(&key) {
            return Err(RecorderError::AlreadyRecording {
                platform: key.platform().to_string(),
                channel: key.channel().to_string(),
            });
        }

        let strategy = strategy::resolve(key.platform())?;

        let recording_dir = &self.settings.recording_dir;
        tokio::fs::create_dir_all(recording_dir)
            .await
            .map_err(|source| RecorderError::Directory {
                path: recording_dir.clone(),
                source,
            })?;

        let started_at = self.clock.now();
        let invocation = strategy.build_invocation(&CaptureRequest {
            channel: key.channel(),
            output_dir: recording_dir,
            quality: &self.settings.quality,
            started_at,
        });

        let mut args = self.settings.extra_args.clone();
        args.extend(invocation.args);

        let SpawnedProcess { control, exit } = self
            .launcher
            .spawn(&self.settings.program, &args)
            .map_err(|source| RecorderError::Spawn {
                program: self.settings.program.clone(),
                source,
            })?;

        let info = RecordingInfo {
            id: Uuid::new_v4(),
            platform: key.platform().to_string(),
            channel: key.channel().to_string(),
            strategy: strategy.name().to_string(),
            output_path: invocation.output_path,
            started_at,
            pid: control.pid(),
        };

        // Armed while the lock is held; the watcher blocks on the lock until
        // registration is complete.
        let watcher = self.spawn_watcher(key.clone(), info.id, exit);
        registry.active.insert(
            key,
            RecordingHandle {
                info: info.clone(),
                control,
                watcher,
            },
        );
        let _ = self.events.send(RecordingEvent::Started(info.clone()));
        drop(registry);

        info!(
            "Recording {}/{} started: {:?} (pid {:?})",
            info.platform, info.channel, info.output_path, info.pid
        );
        Ok(info)
    }

    /// Stop the recording for `channel` on `platform`.
    ///
    /// The entry is removed from the registry before this returns, even when
    /// neither signal could be delivered. In that case the process may be left
    /// running, an [`RecordingEvent::Orphaned`] event is published and
    /// [`RecorderError::Signal`] is returned.
    pub async fn stop(&self, platform: &str, channel: &str) -> RecorderResult<RecordingInfo> {
        let key = RecordingKey::new(platform, channel)?;
        let mut registry = self.registry.lock().await;

        let handle = registry
            .active
            .remove(&key)
            .ok_or_else(|| RecorderError::NotFound {
                platform: key.platform().to_string(),
                channel: key.channel().to_string(),
            })?;

        let result = terminate(&handle).await;
        self.publish_stop(&handle, &result);
        let RecordingHandle { info, watcher, .. } = handle;
        registry.retire(watcher);
        drop(registry);

        result.map(|()| {
            info!(
                "Recording {}/{} stopped: {:?}",
                info.platform, info.channel, info.output_path
            );
            info
        })
    }

    /// Gracefully stop every active recording, then wait up to `grace` for
    /// the stopped processes to exit. Returns how many recordings were active.
    ///
    /// Processes still running when `grace` runs out are left to the caller.
    /// On service shutdown they are killed when the runtime is dropped.
    pub async fn stop_all(&self, grace: Duration) -> usize {
        let mut registry = self.registry.lock().await;
        let handles: Vec<RecordingHandle> =
            registry.active.drain().map(|(_, handle)| handle).collect();
        let count = handles.len();

        for handle in &handles {
            let result = terminate(handle).await;
            self.publish_stop(handle, &result);
            if result.is_ok() {
                info!(
                    "Recording {}/{} stopped on shutdown",
                    handle.info.platform, handle.info.channel
                );
            }
        }

        let mut watchers: Vec<JoinHandle<()>> = registry.stopping.drain(..).collect();
        watchers.extend(handles.into_iter().map(|handle| handle.watcher));
        // Watchers need the lock to finish.
        drop(registry);

        let pending = watchers.len();
        let waited = tokio::time::timeout(grace, async {
            for watcher in watchers {
                let _ = watcher.await;
            }
        })
        .await;
        match waited {
            Ok(()) => debug!("{} stopped process(es) exited", pending),
            Err(_) => warn!(
                "Stopped processes still running after {:?}; they will be killed",
                grace
            ),
        }

        count
    }

    pub async fn list(&self) -> Vec<RecordingInfo> {
        let registry = self.registry.lock().await;
        let mut recordings: Vec<RecordingInfo> = registry
            .active
            .values()
            .map(|handle| handle.info.clone())
            .collect();
        recordings.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.platform.cmp(&b.platform))
                .then_with(|| a.channel.cmp(&b.channel))
        });
        recordings
    }

    pub async fn get(&self, platform: &str, channel: &str) -> Option<RecordingInfo> {
        let key = RecordingKey::new(platform, channel).ok()?;
        let registry = self.registry.lock().await;
        registry.active.get(&key).map(|handle| handle.info.clone())
    }

    pub async fn active_count(&self) -> usize {
        self.registry.lock().await.active.len()
    }

    fn publish_stop(&self, handle: &RecordingHandle, result: &RecorderResult<()>) {
        let event = match result {
            Ok(()) => RecordingEvent::Stopped(handle.info.clone()),
            Err(e) => {
                error!(
                    "Recording {}/{} removed but its process may be orphaned (pid {:?}): {}",
                    handle.info.platform, handle.info.channel, handle.info.pid, e
                );
                RecordingEvent::Orphaned {
                    info: handle.info.clone(),
                    error: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event);
    }

    fn spawn_watcher(
        &self,
        key: RecordingKey,
        id: RecordingId,
        exit: ExitFuture,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let events = self.events.clone();

        tokio::spawn(async move {
            let outcome = exit.await;
            let mut registry = registry.lock().await;

            match registry.active.entry(key.clone()) {
                Entry::Occupied(entry) if entry.get().info.id == id => {
                    let handle = entry.remove();
                    if outcome.is_success() {
                        info!("Recording {} ended on its own: {}", key, outcome);
                    } else {
                        warn!("Recording {} ended on its own: {}", key, outcome);
                    }
                    let _ = events.send(RecordingEvent::Ended {
                        info: handle.info,
                        outcome,
                    });
                }
                _ => debug!("Recording {} ({}) {} after stop", key, id, outcome),
            }
        })
    }
}

/// Graceful first, forceful if that fails. Never waits for the exit.
async fn terminate(handle: &RecordingHandle) -> RecorderResult<()> {
    let graceful = match handle.control.signal(Signal::Graceful).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    warn!(
        "Graceful stop of {}/{} failed ({}), killing",
        handle.info.platform, handle.info.channel, graceful
    );

    handle
        .control
        .signal(Signal::Forceful)
        .await
        .map_err(|forceful| RecorderError::Signal { graceful, forceful })
}
