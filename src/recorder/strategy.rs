//! Per-platform capture strategies.
//!
//! A strategy turns a channel name into the arguments handed to the capture
//! program (streamlink by default). Strategies hold no state; the only input
//! besides the request is the timestamp used for the output filename.
//!
//! Adding a platform means one strategy type and one arm in [`resolve`].

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use super::error::{RecorderError, RecorderResult};

pub const SUPPORTED_PLATFORMS: &[&str] = &["twitch", "kick", "youtube"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Everything a strategy needs to build one invocation.
#[derive(Debug, Clone)]
pub struct CaptureRequest<'a> {
    pub channel: &'a str,
    pub output_dir: &'a Path,
    pub quality: &'a str,
    pub started_at: DateTime<Local>,
}

/// Arguments for the capture program plus the file it will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureInvocation {
    pub args: Vec<String>,
    pub output_path: PathBuf,
}

pub trait CaptureStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn stream_url(&self, channel: &str) -> String;

    fn extension(&self) -> &'static str {
        "mp4"
    }

    fn build_invocation(&self, request: &CaptureRequest<'_>) -> CaptureInvocation {
        let filename = format!(
            "{}-{}.{}",
            request.channel,
            request.started_at.format(TIMESTAMP_FORMAT),
            self.extension()
        );
        let output_path = request.output_dir.join(filename);

        let args = vec![
            self.stream_url(request.channel),
            request.quality.to_string(),
            "-o".to_string(),
            output_path.to_string_lossy().into_owned(),
        ];

        CaptureInvocation { args, output_path }
    }
}

pub struct TwitchStrategy;

impl CaptureStrategy for TwitchStrategy {
    fn name(&self) -> &'static str {
        "twitch"
    }

    fn stream_url(&self, channel: &str) -> String {
        format!("twitch.tv/{channel}")
    }
}

pub struct KickStrategy;

impl CaptureStrategy for KickStrategy {
    fn name(&self) -> &'static str {
        "kick"
    }

    fn stream_url(&self, channel: &str) -> String {
        format!("kick.com/{channel}")
    }
}

pub struct YouTubeStrategy;

impl CaptureStrategy for YouTubeStrategy {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn stream_url(&self, channel: &str) -> String {
        format!("youtube.com/@{channel}/live")
    }
}

/// Look up the strategy for a platform. Unknown platforms are an error.
pub fn resolve(platform: &str) -> RecorderResult<Box<dyn CaptureStrategy>> {
    let strategy: Box<dyn CaptureStrategy> = match platform {
        "twitch" => Box::new(TwitchStrategy),
        "kick" => Box::new(KickStrategy),
        "youtube" => Box::new(YouTubeStrategy),
        _ => {
            return Err(RecorderError::UnsupportedPlatform {
                platform: platform.to_string(),
                supported: SUPPORTED_PLATFORMS.join(", "),
            })
        }
    };

    Ok(strategy)
}
