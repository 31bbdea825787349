use std::fmt;

use super::error::{RecorderError, RecorderResult};

/// Identity of a recording slot. At most one recording runs per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordingKey {
    platform: String,
    channel: String,
}

impl RecordingKey {
    pub fn new(platform: &str, channel: &str) -> RecorderResult<Self> {
        let platform = platform.trim();
        let channel = channel.trim();

        if platform.is_empty() {
            return Err(invalid("platform must not be empty"));
        }
        if channel.is_empty() {
            return Err(invalid("channel must not be empty"));
        }
        if platform.contains(char::is_control) || channel.contains(char::is_control) {
            return Err(invalid("platform and channel must not contain control characters"));
        }
        // The channel ends up in the output filename.
        if channel.contains(['/', '\\']) || channel == "." || channel == ".." {
            return Err(invalid(format!(
                "channel '{channel}' contains path separators"
            )));
        }

        Ok(Self {
            platform: platform.to_string(),
            channel: channel.to_string(),
        })
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl fmt::Display for RecordingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.channel)
    }
}

fn invalid(reason: impl Into<String>) -> RecorderError {
    RecorderError::InvalidKey {
        reason: reason.into(),
    }
}
