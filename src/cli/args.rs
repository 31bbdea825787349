use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

#[derive(Parser, Debug)]
#[command(name = "stream-recorder")]
#[command(about = "Record live streams on demand", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: ~/.config/stream-recorder/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the recording service (default)
    Serve(ServeCliArgs),
    /// Print version information
    Version,
    /// List supported streaming platforms
    Platforms,
    /// Control recordings on a running service
    Record(RecordCliArgs),
}

#[derive(ClapArgs, Debug, Default)]
pub struct ServeCliArgs {
    /// Override the port from the config file
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(ClapArgs, Debug)]
pub struct RecordCliArgs {
    /// Base URL of the running service
    #[arg(long, global = true, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    #[command(subcommand)]
    pub command: RecordCommand,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// Start recording a channel
    Start(ChannelArgs),
    /// Stop recording a channel
    Stop(ChannelArgs),
    /// List active recordings
    List,
}

#[derive(ClapArgs, Debug)]
pub struct ChannelArgs {
    /// Streaming platform (e.g. twitch)
    #[arg(short, long)]
    pub platform: String,
    /// Channel name on that platform
    #[arg(short = 'n', long)]
    pub channel: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::parse_from(["stream-recorder"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::parse_from(["stream-recorder", "-v", "serve", "--port", "9090"]);
        assert!(cli.verbose);
        match cli.command {
            Some(CliCommand::Serve(args)) => assert_eq!(args.port, Some(9090)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_record_start_args() {
        let cli = Cli::parse_from([
            "stream-recorder",
            "record",
            "start",
            "--platform",
            "twitch",
            "--channel",
            "alice",
        ]);
        match cli.command {
            Some(CliCommand::Record(args)) => {
                assert_eq!(args.server, DEFAULT_SERVER_URL);
                match args.command {
                    RecordCommand::Start(channel) => {
                        assert_eq!(channel.platform, "twitch");
                        assert_eq!(channel.channel, "alice");
                    }
                    other => panic!("unexpected record command: {other:?}"),
                }
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
