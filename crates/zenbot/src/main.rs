//! zenbot - zen sessions for chat
//!
//! Usage:
//!   zenbot run [--config PATH] [--debug] [--cooldown DUR] ...
//!   zenbot config [--config PATH] [--save] ...
//!   zenbot parse DURATION
//!
//! `run` reads chat events as JSON lines on stdin and writes outgoing
//! messages as JSON lines on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zenbot_core::{Config, Paths};

use zenbot::clock::SystemClock;
use zenbot::console::{JsonLinesSink, StaticDirectory};
use zenbot::{duration, Bot, Collaborators, DurationError};

/// zenbot - stay undisturbed, get nudged when you are not
#[derive(Parser)]
#[command(name = "zenbot")]
#[command(about = "Zen sessions for chat: stay undisturbed, get nudged when you are not")]
#[command(version)]
#[command(after_help = r#"CHAT COMMANDS:
    ./zen 1h30m [reason]      Start a zen (t prefix allowed: ./zen t45m)
    ./zen cancel [reason]     Cancel your zens, or only those with that reason

DURATIONS:
    Any of <N>h, <N>m, <N>s in that order: 1h, 45m, 1h30m, 90s

EXAMPLES:
    zenbot run --cooldown 30s --allow-channel general
    zenbot config --initial-grace 0s --save
    zenbot parse 1h30m
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot over stdio
    Run(RunArgs),

    /// Print the effective configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Check a duration against the ./zen grammar
    Parse {
        /// Duration text, e.g. 1h30m
        duration: String,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Configuration file (default: ~/.config/zenbot/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Time between two violation notices for the same zen
    #[arg(long, value_name = "DURATION", value_parser = parse_flag_duration)]
    cooldown: Option<Duration>,

    /// Time between expiration sweeps
    #[arg(long, value_name = "DURATION", value_parser = parse_flag_duration)]
    sweep_interval: Option<Duration>,

    /// Cooldown a new zen starts with (0s enforces immediately)
    #[arg(long, value_name = "DURATION", value_parser = parse_flag_duration)]
    initial_grace: Option<Duration>,

    /// Only accept commands in this channel (repeatable)
    #[arg(long = "allow-channel", value_name = "NAME")]
    allow_channel: Vec<String>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save: bool,
}

/// Flags accept the chat grammar plus an explicit zero
fn parse_flag_duration(text: &str) -> Result<Duration, DurationError> {
    match duration::parse(text) {
        Err(DurationError::Zero) => Ok(Duration::ZERO),
        _ if text.trim() == "0" => Ok(Duration::ZERO),
        other => other,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => run_bot(args),
        Some(Commands::Config(args)) => cmd_config(&args),
        Some(Commands::Parse { duration }) => cmd_parse(&duration),
        None => run_bot(RunArgs::default()),
    }
}

/// Drive `cmd_run` on its own runtime.
///
/// Tokio reads stdin on a blocking thread that cannot be interrupted, so
/// the runtime is shut down without waiting for it. Otherwise the process
/// would hang until upstream closes stdin.
fn run_bot(args: RunArgs) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(cmd_run(args));
    runtime.shutdown_background();
    result
}

fn config_path(args: &RunArgs) -> PathBuf {
    args.config
        .clone()
        .unwrap_or_else(|| Paths::new().config_file())
}

/// Config file with command-line overrides applied
fn load_config(args: &RunArgs) -> Result<Config> {
    let mut config = Config::load(&config_path(args))?;

    if args.debug {
        config.debug = true;
    }
    if let Some(cooldown) = args.cooldown {
        config.cooldown_secs = cooldown.as_secs();
    }
    if let Some(interval) = args.sweep_interval {
        config.sweep_interval_secs = interval.as_secs();
    }
    if let Some(grace) = args.initial_grace {
        config.initial_grace_secs = grace.as_secs();
    }
    config
        .channel_allowlist
        .extend(args.allow_channel.iter().cloned());

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_logging(debug: bool) {
    // stdout carries outgoing messages, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    init_logging(config.debug);

    info!("Starting zenbot {}", env!("CARGO_PKG_VERSION"));

    let directory = Arc::new(StaticDirectory::new(
        config.users.clone(),
        config.channels.clone(),
    ));
    let bot = Arc::new(Bot::new(
        &config,
        Collaborators {
            sink: Arc::new(JsonLinesSink::new(tokio::io::stdout())),
            users: directory.clone(),
            channels: directory,
            clock: Arc::new(SystemClock),
        },
    ));

    let result = tokio::select! {
        result = bot.serve(BufReader::new(tokio::io::stdin())) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    result.context("zenbot stopped")
}

fn cmd_config(args: &ConfigArgs) -> Result<()> {
    let config = load_config(&args.run)?;

    if args.save {
        let path = config_path(&args.run);
        config.save(&path)?;
        eprintln!("Saved configuration to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_parse(text: &str) -> Result<()> {
    let parsed = duration::parse(text).with_context(|| format!("'{}' is not a zen duration", text))?;
    println!(
        "{} ({} seconds)",
        zenbot_core::format::duration(parsed),
        parsed.as_secs()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("zenbot_main_test_{}_{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_config_save_writes_overrides() {
        let path = temp_config("save");
        let args = ConfigArgs {
            run: RunArgs {
                config: Some(path.clone()),
                cooldown: Some(Duration::from_secs(30)),
                allow_channel: vec!["general".to_string()],
                ..RunArgs::default()
            },
            save: true,
        };

        cmd_config(&args).unwrap();

        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.cooldown_secs, 30);
        assert!(saved.channel_allowlist.contains("general"));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_config_without_save_leaves_file_alone() {
        let path = temp_config("nosave");
        let args = ConfigArgs {
            run: RunArgs {
                config: Some(path.clone()),
                ..RunArgs::default()
            },
            save: false,
        };

        cmd_config(&args).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_flag_durations_allow_zero() {
        assert_eq!(parse_flag_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_flag_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_flag_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert!(parse_flag_duration("soon").is_err());
    }
}
