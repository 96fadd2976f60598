//! Ingest command handler
//!
//! Feeds every message of a file or directory through the report sink, a bounded
//! number at a time. Infrastructure failures are retried per the configured policy;
//! rejections are dead-lettered and counted by reason.

use super::utils::{files_with_extension, read_file, run_blocking, with_schema_dir, Pipeline};
use crate::cli::IngestArgs;
use crate::config::Config;
use crate::error::{Error, ErrorContext, Result};
use crate::logging::create_operation_span;
use crate::logging::timing::Timer;
use crate::output::{IngestSummary, OutputWriter};
use reportsink_core::{
    execute_with_retry, Collection, Query, ReportSink, Repository, RetryPolicy, SinkOutcome,
};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, Instrument};

/// Handle the ingest command
pub async fn handle_ingest(args: IngestArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let span = create_operation_span("ingest", Some(&args.input.display().to_string()));
    run_ingest(args, config, output).instrument(span).await
}

async fn run_ingest(args: IngestArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    if args.concurrency == Some(0) {
        return Err(Error::invalid_args("--concurrency must be at least 1"));
    }
    let timer = Timer::with_details("ingest", &args.input.display().to_string());
    let messages = read_messages(&args.input)?;
    output.info(&format!(
        "Ingesting {} messages from {}",
        messages.len(),
        args.input.display()
    ))?;

    let mut policy = config.retry.clone();
    if let Some(retries) = args.max_retries {
        policy.max_attempts = retries;
    }
    let concurrency = args.concurrency.unwrap_or(config.ingest.concurrency).max(1);
    let show_progress = args.progress || config.output.progress;
    debug!(concurrency, max_retries = policy.max_attempts, "Ingest settings");

    let config = with_schema_dir(config, args.schemas.as_deref());
    let sink = run_blocking(move || {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Arc::new(ReportSink::new(pipeline.orchestrator(), Repository::in_memory())))
    })
    .await?;

    // The loader may own a blocking HTTP client, which must not be dropped on the runtime.
    let ingested = ingest_messages(
        &sink,
        messages,
        policy,
        concurrency,
        show_progress,
        args.out_dir.as_deref(),
        output,
    )
    .await;
    run_blocking(move || {
        drop(sink);
        Ok(())
    })
    .await?;
    let mut summary = ingested?;

    summary.duration_ms = timer.elapsed().as_millis() as u64;
    output.ingest_summary(&summary)?;

    if summary.failed > 0 {
        return Err(Error::BatchFailed {
            failed: summary.failed,
            total: summary.total,
        });
    }
    Ok(())
}

async fn ingest_messages(
    sink: &Arc<ReportSink>,
    messages: Vec<String>,
    policy: RetryPolicy,
    concurrency: usize,
    show_progress: bool,
    out_dir: Option<&Path>,
    output: &mut OutputWriter,
) -> Result<IngestSummary> {
    let progress = if show_progress {
        output.progress_bar(messages.len() as u64, "messages")
    } else {
        None
    };

    let total = messages.len();
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    for (index, raw) in messages.into_iter().enumerate() {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                // Aborted tasks release their sink handles before this returns
                tasks.shutdown().await;
                return Err(Error::other(format!("Ingest queue closed: {}", e)));
            }
        };
        let sink = sink.clone();
        let policy = policy.clone();
        tasks.spawn(async move {
            let _permit = permit;
            (index, process_with_retry(sink, Arc::from(raw), policy).await)
        });
    }

    let mut summary = IngestSummary {
        total,
        ..IngestSummary::default()
    };
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(SinkOutcome::Persisted { .. }))) => summary.persisted += 1,
            Ok((_, Ok(SinkOutcome::DeadLettered { result, .. }))) => {
                summary.dead_lettered += 1;
                *summary.reasons.entry(result.reason).or_insert(0) += 1;
            }
            Ok((index, Err(e))) => {
                error!(message_index = index, error = %e, "Message could not be processed");
                summary.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "Ingest task failed");
                summary.failed += 1;
            }
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if let Some(dir) = out_dir {
        write_collections(sink.repository(), dir)?;
        output.info(&format!("Wrote collections to {}", dir.display()))?;
    }
    Ok(summary)
}

async fn process_with_retry(
    sink: Arc<ReportSink>,
    raw: Arc<str>,
    policy: RetryPolicy,
) -> reportsink_core::Result<SinkOutcome> {
    execute_with_retry(
        || {
            let sink = sink.clone();
            let raw = raw.clone();
            async move {
                match tokio::task::spawn_blocking(move || sink.process(&raw)).await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(anyhow::anyhow!("Worker task failed: {}", e).into()),
                }
            }
        },
        policy,
    )
    .await
}

/// Split the ingest input into raw messages.
///
/// A directory yields each `*.json` file; `.jsonl`/`.ndjson` files yield one message per
/// line; a file holding a JSON array yields its elements; anything else is one message.
pub fn read_messages(input: &Path) -> Result<Vec<String>> {
    if input.is_dir() {
        return files_with_extension(input, "json")?
            .iter()
            .map(|path| read_file(path))
            .collect();
    }

    let content = read_file(input)?;
    let extension = input.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if matches!(extension, "jsonl" | "ndjson") {
        return Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect());
    }

    if content.trim_start().starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(&content) {
            return Ok(items.iter().map(Value::to_string).collect());
        }
    }
    Ok(vec![content])
}

/// Write both collections as JSON lines into `dir`
fn write_collections(repository: &Repository, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    write_jsonl(repository.reports.as_ref(), &dir.join("reports.jsonl"))?;
    write_jsonl(repository.dead_letters.as_ref(), &dir.join("dead_letters.jsonl"))
}

fn write_jsonl(collection: &dyn Collection, path: &Path) -> Result<()> {
    let items = collection.query_items(&Query::all())?;
    let mut file = std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    for item in &items {
        writeln!(file, "{}", serde_json::to_string(item)?)?;
    }
    debug!(collection = collection.name(), items = items.len(), path = %path.display(), "Collection written");
    Ok(())
}
