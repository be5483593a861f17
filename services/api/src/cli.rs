use crate::commands::{create_admin, export_entity, import_entity};
use crate::server;
use clap::{Args, Parser, Subcommand};
use estate_hub::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Estate Hub",
    about = "Run the Estate Hub marketplace API and its maintenance commands",
    version
)]
struct Cli {
    /// Document snapshot file; overrides APP_DATA_PATH
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Load listings or catalog entries from a CSV file
    Import(ImportArgs),
    /// Write every document of an entity as CSV
    Export(ExportArgs),
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
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

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// properties, categories, amenities, facilities, states, locations or developers
    pub(crate) entity: String,
    /// CSV file with a header row
    pub(crate) file: PathBuf,
    /// Validate every row without storing anything
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    pub(crate) entity: String,
    /// Output file; stdout when omitted
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct CreateAdminArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args, cli.data).await,
        Command::Import(args) => import_entity(args, cli.data),
        Command::Export(args) => export_entity(args, cli.data),
        Command::CreateAdmin(args) => create_admin(args, cli.data).await,
    }
}
