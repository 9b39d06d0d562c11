use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tally_classify::summary::format_cents;
use tally_classify::{AssociationTable, FailurePolicy, LoadedSource, Pipeline, summarize};
use tally_ingest::{Provider, SourceDecoder, SourceFile, read_canonical_file};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Settings;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Normalize, merge and categorize Alipay / WeChat Pay exports")]
struct Cli {
    /// Settings file (default: ./tally.toml, then ~/.tally/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "tally_classify=debug" (RUST_LOG wins when set)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize, merge and categorize exports into one canonical CSV
    Run {
        /// Alipay export (repeatable); replaces sources from the settings file
        #[arg(long)]
        alipay: Vec<PathBuf>,

        /// WeChat Pay export (repeatable); replaces sources from the settings file
        #[arg(long)]
        wechat: Vec<PathBuf>,

        /// Labelled historical dataset to learn associations from
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Pre-built association table written by `tally learn`
        #[arg(long, conflicts_with = "dataset")]
        table: Option<PathBuf>,

        /// Output CSV path
        #[arg(long)]
        out: Option<PathBuf>,

        /// Log and skip files that fail instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// Learn associations from a labelled dataset and save them as JSON
    Learn {
        #[arg(long)]
        dataset: Option<PathBuf>,

        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        min_frequency: Option<u32>,
    },

    /// Print per-category totals of a canonical CSV
    Summary {
        csv: PathBuf,
    },

    /// Write a default settings file
    InitConfig {
        #[arg(long, default_value = config::LOCAL_CONFIG_FILE)]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Command::Run {
            alipay,
            wechat,
            dataset,
            table,
            out,
            keep_going,
        } => {
            let mut settings = config::load_settings(cli.config.as_deref())?;
            if !alipay.is_empty() || !wechat.is_empty() {
                settings.sources = alipay
                    .into_iter()
                    .map(|p| SourceFile::new(Provider::Alipay, p))
                    .chain(wechat.into_iter().map(|p| SourceFile::new(Provider::Wechat, p)))
                    .collect();
            }
            if dataset.is_some() {
                settings.dataset_path = dataset;
                settings.association_table_path = None;
            }
            if table.is_some() {
                settings.association_table_path = table;
            }
            if let Some(out) = out {
                settings.destination_path = out;
            }
            let policy = if keep_going {
                FailurePolicy::SkipFailed
            } else {
                FailurePolicy::FailFast
            };
            run(settings, policy).await?;
        }

        Command::Learn {
            dataset,
            out,
            min_frequency,
        } => {
            let mut settings = config::load_settings(cli.config.as_deref())?;
            if let Some(n) = min_frequency {
                settings.min_frequency = n;
            }
            let dataset = dataset.or(settings.dataset_path.clone());
            let Some(dataset) = dataset else {
                bail!("no dataset given (pass --dataset <csv> or set dataset_path)");
            };

            let table = settings
                .learner()?
                .learn_from_file(Some(&dataset))
                .with_context(|| format!("learning from {}", dataset.display()))?;
            table
                .save_json(&out)
                .with_context(|| format!("writing {}", out.display()))?;

            println!(
                "Learned {} associations ({} retired) from {}",
                table.len(),
                table.tombstone_count(),
                dataset.display()
            );
            println!("Wrote {}", out.display());
        }

        Command::Summary { csv } => {
            summary(&csv)?;
        }

        Command::InitConfig { path } => {
            config::init_config(&path)?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn association_table(settings: &Settings) -> Result<AssociationTable> {
    if let Some(path) = &settings.association_table_path {
        return AssociationTable::load_json(path)
            .with_context(|| format!("loading association table {}", path.display()));
    }
    let learner = settings.learner()?;
    let dataset = settings.dataset_path.as_deref();
    learner
        .learn_from_file(dataset)
        .with_context(|| format!("learning from {}", dataset.map(|p| p.display().to_string()).unwrap_or_default()))
}

/// Read every source concurrently; each read result is kept for per-file handling.
async fn load_sources(sources: Vec<SourceFile>) -> Result<Vec<LoadedSource>> {
    let handles: Vec<_> = sources
        .into_iter()
        .map(|source| {
            tokio::spawn(async move {
                let content = tokio::fs::read(&source.path).await;
                LoadedSource { source, content }
            })
        })
        .collect();

    let mut loaded = Vec::with_capacity(handles.len());
    for handle in handles {
        loaded.push(handle.await.context("source read task failed")?);
    }
    Ok(loaded)
}

async fn run(settings: Settings, policy: FailurePolicy) -> Result<()> {
    if settings.sources.is_empty() {
        bail!("no source files (pass --alipay/--wechat or add [[sources]] to the settings file)");
    }

    let keywords = settings.keyword_dictionary()?;
    let table = association_table(&settings)?;
    let pipeline = Pipeline::new(SourceDecoder::new(settings.decoder_options()), keywords, table)
        .with_refund_indicator(settings.refund_indicator.as_str());

    let loaded = load_sources(settings.sources.clone()).await?;
    let report = tokio::task::spawn_blocking(move || pipeline.run(loaded, policy))
        .await
        .context("pipeline task failed")??;

    let dest = &settings.destination_path;
    report
        .write_csv(dest)
        .with_context(|| format!("writing {}", dest.display()))?;

    let s = report.summary;
    println!("Wrote {} records to {}", report.records.len(), dest.display());
    println!(
        "  preset={} keyword={} learned={} unassigned={} dropped={}",
        s.preset, s.keyword, s.learned, s.unresolved, s.dropped
    );
    for (source, err) in &report.failed {
        println!("  skipped {}: {}", source.path.display(), err);
    }

    Ok(())
}

fn summary(csv: &Path) -> Result<()> {
    let records = read_canonical_file(csv).with_context(|| format!("reading {}", csv.display()))?;
    let totals = summarize(&records);

    println!("{} records in {}\n", records.len(), csv.display());
    println!("{:<8} {:>6} {:>12} {:>12} {:>10}", "类型", "count", "expense", "income", "other");
    for t in &totals {
        println!(
            "{:<8} {:>6} {:>12} {:>12} {:>10}",
            t.label(),
            t.count,
            format_cents(t.expense_cents),
            format_cents(t.income_cents),
            format_cents(t.other_cents)
        );
    }
    Ok(())
}
