//! Stream recording core.
//!
//! Maps (platform, channel) keys to running capture processes and keeps that
//! mapping in step with process exits.

pub mod clock;
pub mod error;
pub mod key;
pub mod manager;
pub mod process;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RecorderError, RecorderResult};
pub use key::RecordingKey;
pub use manager::{RecorderSettings, RecordingEvent, RecordingId, RecordingInfo, RecordingManager};
pub use process::{
    ChildControl, ExitOutcome, ProcessControl, ProcessLauncher, Signal, SignalFuture,
    SpawnedProcess, TokioLauncher,
};
pub use strategy::{resolve, CaptureStrategy, SUPPORTED_PLATFORMS};
