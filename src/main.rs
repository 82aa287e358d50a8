use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use v2ray_health::{
    init_logging, BatchedHealthPipeline, CancellationToken, Config, ConfigList, ConfigValidator,
    HealthReport, HealthSummary, PipelineConfig, Protocol, ServerHealth,
};

/// Validate V2Ray server configs and rank them by TCP health
#[derive(Parser)]
#[command(name = "v2ray-health")]
#[command(about = "Validate V2Ray server configs and rank them by TCP health")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health and print results ranked by quality
    Check {
        /// Input file with one server config per line
        input: PathBuf,
        /// Save the configs of kept servers, one per line
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Probe timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: f64,
        /// Number of concurrent probes
        #[arg(short = 'n', long, default_value = "50")]
        concurrency: usize,
        /// Servers per batch; stop requests are honoured between batches
        #[arg(short, long, default_value = "50")]
        batch_size: usize,
        /// Minimum quality score (0-100) to keep a server
        #[arg(short, long, default_value = "0")]
        min_score: f64,
        /// Drop unreachable servers from the results
        #[arg(short = 'x', long)]
        exclude_unreachable: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate configs without touching the network
    Validate {
        /// Input file with one server config per line
        input: PathBuf,
    },
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: &'a HealthSummary,
    servers: Vec<HealthReport<'a>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::default();
    if cli.verbose {
        config.log_level = "debug".to_string();
    } else if cli.quiet {
        config.log_level = "warn".to_string();
    }
    init_logging(&config.log_level)?;

    match cli.command {
        Commands::Check {
            input,
            output,
            timeout,
            concurrency,
            batch_size,
            min_score,
            exclude_unreachable,
            json,
        } => {
            let timeout = Duration::try_from_secs_f64(timeout)
                .map_err(|e| anyhow!("Invalid timeout {}: {}", timeout, e))?;
            let servers = ConfigList::parse_file(&input)?;

            if !json {
                println!("Loaded {} servers from {:?}", servers.len(), input);
                println!(
                    "Checking with {} concurrent probes, timeout: {:?}, batch size: {}",
                    concurrency, timeout, batch_size
                );
                println!("Press Ctrl+C to stop; the batch in flight is discarded");
                println!();
            }

            let pipeline_config = PipelineConfig::new()
                .with_timeout(timeout)
                .with_concurrency(concurrency)
                .with_batch_size(batch_size)
                .with_min_quality_score(min_score)
                .with_exclude_unreachable(exclude_unreachable);
            let pipeline = BatchedHealthPipeline::new(pipeline_config);

            let token = CancellationToken::new();
            let trigger = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Stop requested, discarding the batch in flight");
                    trigger.request();
                }
            });

            let outcome = pipeline.run(servers, &token).await;

            if json {
                let report = JsonOutput {
                    summary: &outcome.summary,
                    servers: outcome.records.iter().map(ServerHealth::report).collect(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for record in &outcome.records {
                    println!("{}", format_record(record));
                }
                print_summary(&outcome.summary, outcome.records.len());
            }

            if let Some(output_path) = output {
                ConfigList::save_to_file(&outcome.records, &output_path)?;
                if !json {
                    println!(
                        "Saved {} servers to {:?}",
                        outcome.records.len(),
                        output_path
                    );
                }
            }
        }
        Commands::Validate { input } => {
            let configs = ConfigList::parse_file(&input)?;
            let mut valid = 0;

            for config in &configs {
                let protocol = Protocol::detect(config.trim());
                match ConfigValidator::validate(config) {
                    Ok(validation) => {
                        valid += 1;
                        let target = validation
                            .target()
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!("valid    {:<7} {}", protocol, target);
                    }
                    Err(e) => println!("invalid  {:<7} {} ({})", protocol, abbreviate(config), e),
                }
            }

            println!();
            println!(
                "Results: {} valid, {} invalid",
                valid,
                configs.len() - valid
            );
        }
    }

    Ok(())
}

fn format_record(record: &ServerHealth) -> String {
    let latency = record
        .latency_ms
        .map(|ms| format!("{:.0}ms", ms))
        .unwrap_or_else(|| "-".to_string());
    let address = record.address().unwrap_or_else(|| "-".to_string());
    let detail = record.error.as_deref().unwrap_or_default();

    format!(
        "{:>5.1}  {:<11} {:>7}  {:<6} {} {}",
        record.quality_score(),
        record.status.to_string(),
        latency,
        record.protocol,
        address,
        detail
    )
    .trim_end()
    .to_string()
}

fn print_summary(summary: &HealthSummary, kept: usize) {
    println!();
    println!(
        "Results: {} healthy, {} degraded, {} unreachable, {} invalid ({} kept)",
        summary.healthy, summary.degraded, summary.unreachable, summary.invalid, kept
    );
    if summary.stopped_early {
        println!(
            "Stopped early after {}/{} batches, {} of {} servers checked",
            summary.batches_run, summary.batches_total, summary.checked, summary.total
        );
    }
}

/// Keep long base64 configs readable on one line
fn abbreviate(config: &str) -> String {
    const MAX: usize = 60;
    if config.chars().count() <= MAX {
        config.to_string()
    } else {
        let head: String = config.chars().take(MAX).collect();
        format!("{}...", head)
    }
}
