pub mod args;
pub mod client;

pub use args::{Cli, CliCommand, RecordCliArgs, RecordCommand, ServeCliArgs};
pub use client::RecorderClient;

use crate::recorder::{RecordingInfo, SUPPORTED_PLATFORMS};
use anyhow::Result;

pub fn handle_platforms_command() {
    println!("Supported platforms:");
    for platform in SUPPORTED_PLATFORMS {
        println!("  {}", platform);
    }
}

pub async fn handle_record_command(args: RecordCliArgs) -> Result<()> {
    let client = RecorderClient::new(&args.server);

    match args.command {
        RecordCommand::Start(channel) => {
            let response = client.start(&channel.platform, &channel.channel).await?;
            println!("{}", response.message);
            println!("Output: {}", response.recording.output_path.display());
        }
        RecordCommand::Stop(channel) => {
            let response = client.stop(&channel.platform, &channel.channel).await?;
            println!("{}", response.message);
        }
        RecordCommand::List => {
            let recordings = client.list().await?;
            if recordings.is_empty() {
                println!("No active recordings.");
                return Ok(());
            }

            println!("Active recordings ({}):\n", recordings.len());
            for recording in &recordings {
                print_recording(recording);
            }
        }
    }

    Ok(())
}

fn print_recording(recording: &RecordingInfo) {
    println!("{}/{}", recording.platform, recording.channel);
    println!(
        "  Started: {}",
        recording.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Output:  {}", recording.output_path.display());
    if let Some(pid) = recording.pid {
        println!("  PID:     {}", pid);
    }
    println!("---");
}
