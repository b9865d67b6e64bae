use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use typechat::cli;
use typechat::config::Config;
use typechat::render::RenderOptions;

#[derive(Parser)]
#[command(name = "typechat")]
#[command(about = "Typewriter-style renderer for chat messages", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Type out a bot message (reads stdin without FILE)
    Reveal {
        /// File holding the raw message text
        file: Option<PathBuf>,

        /// Show the whole message at once
        #[arg(short, long)]
        instant: bool,
    },

    /// Show how a message splits into think, text and code blocks
    Extract {
        /// File holding the raw message text
        file: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Replay a conversation file
    Replay {
        /// Conversation JSON file
        conversation: PathBuf,

        /// Write revealed flags back to the file
        #[arg(long)]
        save: bool,
    },

    /// Export a conversation as a Markdown transcript
    Export {
        /// Conversation JSON file
        conversation: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Transcript title
        #[arg(short, long)]
        title: Option<String>,

        /// Leave thinking out of the transcript
        #[arg(long)]
        no_thinking: bool,
    },

    /// Show the generating-status cycler
    Progress {
        /// Status prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Number of interval ticks before replacing
        #[arg(short, long, default_value = "6")]
        ticks: u64,

        /// Text that replaces the status line
        #[arg(short, long, default_value = "Done.")]
        result: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Initialize configuration file with defaults
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().await?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(config.log_level.as_deref().unwrap_or("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let render = RenderOptions::detect(cli.no_color, config.theme_name());

    match cli.command {
        Some(Commands::Reveal { file, instant }) => {
            cli::reveal::execute(file.as_deref(), instant, &config, &render).await?;
        }
        Some(Commands::Extract { file, format }) => {
            cli::extract::execute(file.as_deref(), &format, &config).await?;
        }
        Some(Commands::Replay { conversation, save }) => {
            cli::replay::execute(&conversation, save, &config, &render).await?;
        }
        Some(Commands::Export {
            conversation,
            output,
            title,
            no_thinking,
        }) => {
            cli::export::execute(
                &conversation,
                output.as_deref(),
                title.as_deref(),
                !no_thinking,
                &config,
            )
            .await?;
        }
        Some(Commands::Progress {
            prefix,
            ticks,
            result,
        }) => {
            cli::progress::execute(prefix.as_deref(), ticks, &result, &config).await?;
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                cli::config::show().await?;
            }
            ConfigCommands::Path => {
                cli::config::path().await?;
            }
            ConfigCommands::Init => {
                cli::config::init().await?;
            }
        },
        Some(Commands::Version) => {
            println!("typechat {}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            // Default: type out stdin
            cli::reveal::execute(None, false, &config, &render).await?;
        }
    }

    Ok(())
}
