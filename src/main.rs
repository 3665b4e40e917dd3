use clap::Parser;
use tracing::info;

use deal_scout::Result;
use deal_scout::cli::Cli;
use deal_scout::config::AppConfig;
use deal_scout::fetcher::{ChromeFetcher, FileSource, PageSource};
use deal_scout::parser::AdParser;
use deal_scout::report;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn init_tracing() {
    // Diagnostics go to stderr; stdout carries only the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("deal_scout=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli)?;
    info!(store = %config.store, terms = ?config.search_terms, "searching weekly ad");

    let source: Box<dyn PageSource> = match &cli.html_file {
        Some(path) => Box::new(FileSource::new(path.clone())),
        None => Box::new(ChromeFetcher::new()),
    };
    let page = source.fetch(&config).await?;

    let matches = AdParser::new().search(&page, &config.search_terms)?;
    report::log_summary(&matches);

    let stdout = std::io::stdout();
    report::write_report(&mut stdout.lock(), &matches, cli.json)?;
    Ok(())
}
