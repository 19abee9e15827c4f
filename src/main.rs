//! Pairwise Judge CLI
//!
//! Judges text pairs with an LLM and converts corpora into JSON-lines.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pairwise_judge::{
    config::Config,
    dumper::{dump_jsonl_files, dump_raw_text_files, WriteMode, DEFAULT_SOURCE_TAG},
    evaluator::PairwiseEvaluator,
    llm::LlmClient,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pairwise Judge - LLM-judged text quality for training corpora
#[derive(Parser)]
#[command(name = "pairwise-judge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge every pair in a JSON-lines file
    Evaluate {
        /// JSON-lines file with one {"text1", "text2", "lang"} object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the pairwise report (defaults to the configured output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model to judge with (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Convert every .txt file under a directory into one JSON-lines file
    DumpText {
        /// Directory searched recursively for .txt files
        input_dir: PathBuf,

        /// Directory that receives tmp.jsonl
        output_dir: PathBuf,

        /// Append to an existing tmp.jsonl instead of overwriting it
        #[arg(long)]
        append: bool,

        /// Source tag written on every record
        #[arg(short, long, default_value = DEFAULT_SOURCE_TAG)]
        source: String,
    },

    /// Merge every .jsonl file under a directory into one JSON-lines file
    DumpJsonl {
        /// Directory searched recursively for .jsonl files
        input_dir: PathBuf,

        /// Directory that receives tmp.jsonl
        output_dir: PathBuf,

        /// Reduce each record to {text, source}
        #[arg(long)]
        text_only: bool,

        /// Append to an existing tmp.jsonl instead of overwriting it
        #[arg(long)]
        append: bool,

        /// Source tag for records without one
        #[arg(short, long, default_value = DEFAULT_SOURCE_TAG)]
        source: String,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Evaluate {
            input,
            output,
            model,
        } => cmd_evaluate(input, output, model).await,
        Commands::DumpText {
            input_dir,
            output_dir,
            append,
            source,
        } => {
            dump_raw_text_files(&input_dir, &output_dir, write_mode(append), &source);
            Ok(())
        }
        Commands::DumpJsonl {
            input_dir,
            output_dir,
            text_only,
            append,
            source,
        } => {
            dump_jsonl_files(&input_dir, &output_dir, text_only, write_mode(append), &source);
            Ok(())
        }
        Commands::Test => cmd_test().await,
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn write_mode(append: bool) -> WriteMode {
    if append {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    }
}

async fn cmd_evaluate(input: PathBuf, output: Option<PathBuf>, model: Option<String>) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model) = model {
        config.llm.model = model;
    }
    config.validate().context("Invalid configuration")?;

    println!("Evaluating pairs from: {}", input.display());
    println!("Using model: {} ({} API keys)", config.llm.model, config.llm.api_keys.len());

    let mut evaluator =
        PairwiseEvaluator::from_config(&config).context("Failed to build evaluator")?;

    let start = Instant::now();
    let tally = evaluator
        .evaluate_pairwise_pairs(Vec::new(), Some(input.as_path()), output.as_deref())
        .await
        .context("Evaluation aborted")?;

    println!(
        "\nJudged {} pairs in {:.2?}, report written to {}",
        tally.total(),
        start.elapsed(),
        evaluator.output_dir().display()
    );

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!("  API Keys:  {}", config.llm.api_keys.len());
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    for (i, key) in config.llm.api_keys.iter().enumerate() {
        let client = LlmClient::new(config.llm.api_base.clone(), key.trim());
        let prefix: String = key.chars().take(8).collect();

        match client.test_connection(&config.llm.model).await {
            Ok(()) => println!("  [{}] {}... connection successful", i, prefix),
            Err(e) => println!("  [{}] {}... connection failed: {}", i, prefix, e),
        }
    }

    Ok(())
}
