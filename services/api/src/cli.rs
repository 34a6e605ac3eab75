use crate::commands::{run_show, run_sync, ShowArgs, SyncArgs};
use crate::server;
use app_square::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "AI App Square",
    about = "Serve the AI App Square portal API and manage its leaderboards",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Synchronize or inspect leaderboards without going through HTTP
    Rankings {
        #[command(subcommand)]
        command: RankingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RankingsCommand {
    /// Recompute dimension scores and leaderboards
    Sync(SyncArgs),
    /// Print the live leaderboard or a historical snapshot
    Show(ShowArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rankings {
            command: RankingsCommand::Sync(args),
        } => run_sync(args),
        Command::Rankings {
            command: RankingsCommand::Show(args),
        } => run_show(args),
    }
}
