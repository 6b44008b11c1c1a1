use clap::Parser;
use std::path::PathBuf;

use epub_thumb_core::config::{extract_options_from_config, load_config, load_config_from};
use epub_thumb_core::extract::{extract_thumbnail, ThumbnailReport};

#[derive(Parser)]
#[command(name = "epub-thumb")]
#[command(about = "Write a PNG thumbnail of an EPUB's cover to a sibling thumb/ directory")]
#[command(version)]
struct Cli {
    /// EPUB file
    input: PathBuf,

    /// Overwrite an existing thumbnail
    #[arg(long)]
    force: bool,

    /// Config file (default: ~/.config/epub-thumb/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => match load_config_from(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => load_config(),
    };

    let mut opts = extract_options_from_config(&config);
    opts.overwrite |= cli.force;

    match extract_thumbnail(&cli.input, &opts) {
        Ok(report) => print_report(&report, cli.json),
        Err(e) => {
            tracing::debug!(error = ?e, "Extraction failed");
            eprintln!("Error ({}): {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}

fn print_report(report: &ThumbnailReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        if report.skipped {
            eprintln!("Thumbnail already exists, skipping");
        }
        println!("{}", report.output.display());
    }
}
