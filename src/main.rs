//! querycsv - run SQL batches from stdin and stream the results as CSV.

use querycsv::app::{self, RunStats};
use querycsv::batch::BatchReader;
use querycsv::cli::Cli;
use querycsv::config::{Config, Settings};
use querycsv::connection::ConnectionManager;
use querycsv::error::Result;
use querycsv::logging;
use querycsv::output::CsvSink;
use tokio::io::BufReader;
use tracing::{debug, error, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // A .env file is optional; it only adds variables --csenv may refer to.
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;
    let settings = Settings::resolve(&cli, &config)?;

    let mut connection = ConnectionManager::open(&settings.connection_string).await?;

    let input = BatchReader::new(BufReader::new(tokio::io::stdin()));
    let mut sink = CsvSink::new(std::io::stdout());
    let outcome = app::run_batches(
        input,
        connection.db(),
        &settings.execute_options(),
        &mut sink,
    )
    .await;

    if let Err(e) = connection.shutdown().await {
        warn!("Failed to close connection: {}", e);
    }

    let RunStats { succeeded, failed } = outcome?;
    debug!(succeeded, failed, "Input exhausted");
    Ok(())
}
