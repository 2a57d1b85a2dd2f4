use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use tracing::{debug, info};

use quiz_builder::backend::HttpStore;
use quiz_builder::commands::{categorize, cloze, comprehension, saved};
use quiz_builder::config::Settings;
use quiz_builder::logging;

#[derive(Parser, Debug)]
#[command(
    name = "quiz-builder",
    version,
    about = "Build categorization, cloze and comprehension questions in the terminal.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    /// Base URL of the question service. Overrides QUIZ_BUILDER_API_URL.
    #[arg(long, global = true, value_name = "URL", value_hint = ValueHint::Url)]
    api_url: Option<String>,
    /// Request timeout in seconds, 0 for none. Overrides QUIZ_BUILDER_TIMEOUT_SECS.
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
    /// Log debug events as well
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sort options into categories
    Categorize,
    /// Write a sentence, blank out words and fill them in
    Cloze,
    /// Write a passage with multiple-choice questions and answer them
    Comprehension,
    /// Print saved comprehensions
    Saved,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(cli.api_url, cli.timeout)?;
    let log_path = logging::init(cli.verbose)?;
    debug!(log = %log_path.display(), "logging initialised");
    info!(api = %settings.api_base_url, command = ?cli.command, "starting");

    let store = Arc::new(HttpStore::new(&settings).context("Failed to build HTTP client")?);

    match cli.command {
        Command::Categorize => categorize::run(store)?,
        Command::Cloze => cloze::run(store)?,
        Command::Comprehension => comprehension::run(store)?,
        Command::Saved => {
            let count = saved::run(store.as_ref()).await?;
            debug!(count, "listed saved comprehensions");
        }
    }

    Ok(())
}
