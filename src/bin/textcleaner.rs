//! textcleaner: strip URLs, boilerplate and short content from raw corpora

use clap::Parser;
use colored::Colorize;
use log::{error, info};
use media_topics::cli::CleanCli;
use media_topics::pipeline::CleaningPipeline;
use media_topics::Config;
use std::process;

fn main() {
    let cli = CleanCli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    info!("Starting {} cleaning", cli.data_type);
    let pipeline = CleaningPipeline::new(config);
    match pipeline.run(cli.data_type, &cli.input, &cli.output, cli.metadata.as_deref()) {
        Ok(report) => {
            println!("\n{}", "Cleaning finished".green().bold());
            println!("  {:<18} {}", "Documents read:", report.total);
            println!("  {:<18} {}", "Kept:", report.kept.to_string().green());
            println!("  {:<18} {}", "Dropped:", report.dropped().to_string().yellow());
            if report.skipped_unreadable > 0 {
                println!("  {:<18} {}", "Unreadable files:", report.skipped_unreadable.to_string().red());
            }
            println!("  {:<18} {}", "Output:", report.output.display());
            if let Some(metadata) = report.metadata_output {
                println!("  {:<18} {}", "Metadata:", metadata.display());
            }
        }
        Err(e) => {
            error!("Cleaning failed: {}", e);
            process::exit(1);
        }
    }
}
