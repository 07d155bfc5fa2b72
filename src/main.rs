mod common;
mod reel;
mod ui;

use clap::Parser;

use crate::reel::{ReelCommands, handle_reel_command};
use crate::ui::prelude::{Level, OutputFormat, emit};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show debug events
    #[arg(short, long, global = true)]
    debug: bool,

    /// Event output format
    #[arg(long = "output", value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: ReelCommands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = handle_reel_command(cli.command).await {
        emit(Level::Error, "reel.error", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}
