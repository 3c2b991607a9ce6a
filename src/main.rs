use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use campaign_stream::aggregator::Aggregator;
use campaign_stream::batch::BatchClient;
use campaign_stream::config::{self, Config};
use campaign_stream::connection::RetryPolicy;
use campaign_stream::export;
use campaign_stream::job::{self, JobRequest};
use campaign_stream::model::{Kind, Row};
use campaign_stream::persistence::{SnapshotStore, SqliteSnapshots};
use campaign_stream::store::{DeleteOutcome, Store};
use campaign_stream::transport::WebSocketTransport;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream results over the websocket until the crawl finishes or ctrl-c
    Stream(JobArgs),
    /// Run a one-shot batch crawl and merge its results
    Fetch {
        #[command(flatten)]
        job: JobArgs,
        /// Also write the merged results to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List stored results
    Show {
        #[arg(long, value_parser = parse_kind_arg)]
        kind: Option<Kind>,
        /// Only rows containing this keyword
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Write stored results as one line per row
    Export {
        #[arg(long, default_value = "campaign_result.txt")]
        out: PathBuf,
        #[arg(long, value_parser = parse_kind_arg)]
        kind: Option<Kind>,
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Delete a stored row; its id stays excluded from later crawls
    Delete {
        #[arg(value_parser = parse_kind_arg)]
        kind: Kind,
        index: usize,
    },
    /// Print an example config file
    ExampleConfig,
}

#[derive(Debug, clap::Args)]
struct JobArgs {
    /// Query string of the result page (session_cookie=..&selected_days=..)
    #[arg(long, conflicts_with_all = ["session", "days", "all_days", "exclude", "start_id", "end_id"])]
    query: Option<String>,
    /// Site session cookie (PHPSESSID)
    #[arg(long)]
    session: Option<String>,
    /// Participation days of month, comma separated (e.g. 1,2,15)
    #[arg(long, value_delimiter = ',')]
    days: Vec<u8>,
    #[arg(long)]
    all_days: bool,
    /// Comma separated keywords the crawler should skip
    #[arg(long)]
    exclude: Option<String>,
    #[arg(long)]
    start_id: Option<i64>,
    #[arg(long)]
    end_id: Option<i64>,
    /// Scan the whole id range the crawler derives itself
    #[arg(long, conflicts_with_all = ["start_id", "end_id"])]
    full_range: bool,
}

fn parse_kind_arg(s: &str) -> Result<Kind, String> {
    Kind::parse_kind(s).ok_or_else(|| format!("expected hidden or public, got {s:?}"))
}

/// Build the job from flags, falling back to the last job that was run.
fn resolve_job(args: &JobArgs, cached: Option<JobRequest>) -> Result<JobRequest> {
    if let Some(query) = &args.query {
        return Ok(JobRequest::from_query(query)?);
    }
    let mut job = cached.unwrap_or_else(|| JobRequest::full_range("", Vec::new(), Vec::new()));
    if let Some(session) = &args.session {
        job.session_cookie = session.clone();
    }
    if args.all_days {
        job.selected_days = job::all_day_tokens();
    } else if !args.days.is_empty() {
        job.selected_days = args
            .days
            .iter()
            .map(|d| job::day_token(*d).ok_or_else(|| anyhow!("day out of range: {}", d)))
            .collect::<Result<_>>()?;
    }
    if let Some(exclude) = &args.exclude {
        job.exclude_keywords = job::parse_keywords(exclude);
    }
    if args.start_id.is_some() || args.end_id.is_some() {
        job.use_full_range = false;
        job.start_id = args.start_id;
        job.end_id = args.end_id;
    }
    if args.full_range {
        job.use_full_range = true;
        job.start_id = None;
        job.end_id = None;
    }
    job.exclude_ids.clear();
    Ok(job)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::ExampleConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;
    let snapshots = SqliteSnapshots::open(&cfg.app.database_url()).await?;

    match args.command {
        Command::Stream(job_args) => stream(&cfg, snapshots, &job_args).await,
        Command::Fetch { job, out } => fetch(&cfg, snapshots, &job, out.as_deref()).await,
        Command::Show { kind, filter } => show(snapshots, kind, &filter).await,
        Command::Export { out, kind, filter } => export_rows(snapshots, &out, kind, &filter).await,
        Command::Delete { kind, index } => delete(snapshots, kind, index).await,
        Command::ExampleConfig => Ok(()),
    }
}

async fn stream(cfg: &Config, snapshots: SqliteSnapshots, args: &JobArgs) -> Result<()> {
    let cached = snapshots.load_job().await?;
    let job = resolve_job(args, cached)?;
    let (aggregator, handle) = Aggregator::start(
        snapshots,
        Arc::new(WebSocketTransport),
        cfg.stream.endpoint.clone(),
        job,
        RetryPolicy::from(&cfg.stream),
    )
    .await?;
    let runner = tokio::spawn(aggregator.run());

    let mut views = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = String::new();
        loop {
            let (status, hidden, public) = {
                let view = views.borrow_and_update();
                (view.status_line(), view.hidden.len(), view.public.len())
            };
            if status != last {
                println!("{}  (hidden {}, public {})", status, hidden, public);
                last = status;
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        state = handle.wait_for_terminal() => info!(?state, "stream finished"),
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                warn!(?err, "failed to listen for ctrl-c");
            }
            info!("interrupted, cancelling");
        }
    }
    handle.cancel().await;
    let summary = runner.await.context("aggregator task failed")?;
    printer.abort();

    println!(
        "{}: {} new, {} duplicate; hidden {}, public {}",
        summary.state.status_line(),
        summary.inserted,
        summary.skipped,
        summary.hidden,
        summary.public
    );
    Ok(())
}

async fn fetch(
    cfg: &Config,
    snapshots: SqliteSnapshots,
    args: &JobArgs,
    out: Option<&Path>,
) -> Result<()> {
    let cached = snapshots.load_job().await?;
    let job = resolve_job(args, cached)?;
    job.validate()?;
    if let Err(err) = snapshots.save_job(&job).await {
        warn!(?err, "failed to cache job parameters");
    }

    let client = BatchClient::new(&cfg.stream.batch_endpoint)?;
    let result = client.fetch(&job).await?;

    let mut store = Store::load(snapshots).await?;
    for kind in Kind::ALL {
        let report = store.merge_lines(kind, result.lines(kind)).await?;
        println!(
            "{}: {} new, {} duplicate, {} malformed",
            kind, report.inserted, report.skipped, report.malformed
        );
    }

    if let Some(out) = out {
        let rows: Vec<Row> = Kind::ALL
            .iter()
            .flat_map(|kind| store.rows(*kind).iter().cloned())
            .collect();
        export::write(out, &rows).await?;
    }
    Ok(())
}

fn kinds(kind: Option<Kind>) -> Vec<Kind> {
    match kind {
        Some(kind) => vec![kind],
        None => Kind::ALL.to_vec(),
    }
}

async fn show(snapshots: SqliteSnapshots, kind: Option<Kind>, keyword: &str) -> Result<()> {
    let store = Store::load(snapshots).await?;
    for kind in kinds(kind) {
        let entries = export::filter(store.rows(kind), keyword);
        println!("[{}] {} rows", kind, entries.len());
        print!("{}", export::table(&entries));
        println!();
    }
    Ok(())
}

async fn export_rows(
    snapshots: SqliteSnapshots,
    out: &Path,
    kind: Option<Kind>,
    keyword: &str,
) -> Result<()> {
    let store = Store::load(snapshots).await?;
    let rows: Vec<Row> = kinds(kind)
        .into_iter()
        .flat_map(|kind| export::filter(store.rows(kind), keyword))
        .map(|(_, row)| row.clone())
        .collect();
    export::write(out, &rows).await?;
    println!("wrote {} rows to {}", rows.len(), out.display());
    Ok(())
}

async fn delete(snapshots: SqliteSnapshots, kind: Kind, index: usize) -> Result<()> {
    let mut store = Store::load(snapshots).await?;
    match store.delete(kind, index).await? {
        DeleteOutcome::Deleted(row) => println!("deleted: {}", row.name),
        DeleteOutcome::OutOfRange { len } => {
            return Err(anyhow!("{} has {} rows, no index {}", kind, len, index))
        }
    }
    Ok(())
}
