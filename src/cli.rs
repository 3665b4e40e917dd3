use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "deal-scout",
    version,
    about = "Search a Publix weekly ad for discounted items"
)]
pub struct Cli {
    /// Items to search for, e.g. "bread" or "frito lay"
    #[arg(value_name = "TERM")]
    pub terms: Vec<String>,

    /// Store number the ad is scoped to, e.g. 0865
    #[arg(short, long, value_name = "NUMBER")]
    pub store: Option<String>,

    /// Configuration file (defaults to config/default.toml when present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seconds to wait for the ad content to render
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Parse a saved copy of the ad page instead of launching a browser
    #[arg(long, value_name = "PATH")]
    pub html_file: Option<PathBuf>,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}
