//! topicmodel: fit (or reuse) a topic model and export its results

use clap::Parser;
use colored::Colorize;
use log::{error, info};
use media_topics::cli::TopicCli;
use media_topics::pipeline::{TopicPipeline, TopicRequest};
use media_topics::Config;
use std::process;

fn main() {
    let cli = TopicCli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    if let Some(stopwords) = cli.stopwords {
        config.vectorizer.stopwords_path = stopwords;
    }

    let request = TopicRequest {
        input: cli.input,
        source: cli.data_type,
        output_folder: cli.output_folder,
        k_cluster: cli.k_cluster,
        do_inference: cli.do_inference,
        accelerated: cli.gpu_info,
    };
    info!("Starting topic modeling on {} data (k_cluster = {})", request.source, request.k_cluster);

    let mut pipeline = TopicPipeline::new(config);
    match pipeline.run(&request) {
        Ok(summary) => {
            println!("\n{}", "Topic modeling finished".green().bold());
            if summary.reused_model {
                println!("  {}", "Reused the existing model, training skipped".yellow());
            }
            println!("  {:<18} {}", "Documents:", summary.n_documents);
            println!("  {:<18} {}", "Topics:", summary.n_topics.to_string().green().bold());
            println!("  {:<18} {}", "Outliers:", summary.n_outliers);
            println!("  {:<18} {}", "Backend:", summary.backend);
            for artifact in &summary.artifacts {
                println!("  {:<18} {}", "Wrote:", artifact.display());
            }
            if let Some(path) = &summary.inference_output {
                println!("  {:<18} {}", "Assignments:", path.display().to_string().cyan());
            }
            println!("  {:<18} {:.2?}", "Elapsed:", summary.elapsed);
        }
        Err(e) => {
            error!("Topic modeling failed: {}", e);
            process::exit(1);
        }
    }
}
