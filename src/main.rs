use anyhow::Result;
use clap::Parser;
use stream_recorder::{
    app::{self, ServiceOptions},
    cli::{handle_platforms_command, handle_record_command, Cli, CliCommand},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut options = ServiceOptions {
        config_path: cli.config,
        port: None,
    };

    match cli.command {
        Some(CliCommand::Version) => {
            println!("stream-recorder {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Platforms) => {
            handle_platforms_command();
            return Ok(());
        }
        Some(CliCommand::Record(args)) => {
            handle_record_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Serve(args)) => options.port = args.port,
        None => {}
    }

    app::run_service(options).await
}
