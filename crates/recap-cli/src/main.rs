use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod dates;
mod ui;

use commands::{Context, WindowArgs};

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Summarize what happened in a Discord channel over a time window.")]
#[command(version)]
struct Cli {
    /// Emit RECAP_PROGRESS / RECAP_RESULT lines instead of spinners
    #[arg(long, global = true)]
    progress_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the Discord token and the OpenRouter API key
    Login,

    /// Print the messages of a channel in a time window
    Fetch {
        #[command(flatten)]
        window: WindowArgs,

        /// Output messages as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch a window and summarize it
    Summarize {
        #[command(flatten)]
        window: WindowArgs,

        /// Give up if the whole run takes longer than this
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
    },

    /// Browse past summaries
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// List the servers the stored token can see
    Guilds,

    /// List the text channels of a server
    Channels {
        #[arg(value_name = "GUILD_ID")]
        guild_id: String,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List saved summaries, newest first
    List,
    /// Print one saved summary
    Show {
        /// Position in `history list`
        #[arg(value_name = "N")]
        number: usize,
    },
    /// Forget one saved summary
    Remove {
        /// Position in `history list`
        #[arg(value_name = "N")]
        number: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Debug logs stay hidden unless RUST_LOG asks for them
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.progress_json)?;

    match cli.command {
        Commands::Login => commands::login::run(&ctx).await,
        Commands::Fetch { window, json } => commands::fetch::run(&ctx, window, json).await,
        Commands::Summarize {
            window,
            timeout_secs,
        } => commands::summarize::run(&ctx, window, timeout_secs).await,
        Commands::History { command } => match command {
            HistoryCommand::List => commands::history::list(&ctx),
            HistoryCommand::Show { number } => commands::history::show(&ctx, number),
            HistoryCommand::Remove { number } => commands::history::remove(&ctx, number),
        },
        Commands::Guilds => commands::guilds::guilds(&ctx).await,
        Commands::Channels { guild_id } => commands::guilds::channels(&ctx, &guild_id).await,
    }
}
