// Entrypoint for the CLI application.
// - `bgerase remove <INPUT>` runs one background removal and exits.
// - `bgerase` or `bgerase menu` opens the interactive menu.

use anyhow::{Context, Result};
use bgerase::config::{ClientConfig, API_KEY_ENV, ENDPOINT_ENV};
use bgerase::{default_destination, logging, ui, UploadClient};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Remove image backgrounds through the backgrounderase.net API
#[derive(Parser)]
#[command(name = "bgerase", author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Upload one image and save the cut-out
    Remove(RemoveArgs),
    /// Interactive menu (default when no command is given)
    Menu,
}

#[derive(Args)]
struct RemoveArgs {
    /// Path to the input image
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to save the result [default: <INPUT stem>-nobg.png]
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// API key
    #[arg(short, long, env = API_KEY_ENV, hide_env_values = true)]
    key: Option<String>,

    /// API endpoint URL
    #[arg(long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// Seconds to wait for the connection to be established
    #[arg(long, value_name = "SECS", default_value_t = 20)]
    connect_timeout: u64,

    /// Seconds to wait for the whole request to complete
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    timeout: u64,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Some(Command::Remove(args)) => remove(args),
        Some(Command::Menu) | None => {
            ui::main_menu()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn remove(args: RemoveArgs) -> Result<ExitCode> {
    let config = ClientConfig::resolve(args.key, args.endpoint)
        .context("Failed to resolve API configuration")?
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_request_timeout(Duration::from_secs(args.timeout));
    let client = UploadClient::new(config)?;

    let destination = args
        .output
        .unwrap_or_else(|| default_destination(&args.input));
    let result = ui::with_spinner("Removing background...", || {
        client.remove_background(&args.input, &destination)
    })?;
    ui::report(&result);

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
