//! bucketjanitor CLI: `scan`, `report`, `generate-script`, `clean`.
//!
//! This binary is the ambient front-end around the library's core —
//! flag parsing, logging setup, and translating `CoreError` into a
//! one-line stderr message plus a process exit code. No core logic
//! lives here.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bucketjanitor::error::{CoreError, Result};
use bucketjanitor::media::{self, LoftyTagReader};
use bucketjanitor::progress::IndicatifProgress;
use bucketjanitor::rename::{self, CleanRule};
use bucketjanitor::report::{self, ReportFormat};
use bucketjanitor::retention;
use bucketjanitor::scanner;
use bucketjanitor::script;
use bucketjanitor::store::IndexStore;
use bucketjanitor::transport::{ObjectStoreClient, S3Client, S3ClientConfig};
use bucketjanitor::fingerprint;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bucketjanitor")]
#[command(version, author, about = "Finds duplicate objects and naming anomalies in S3-compatible buckets")]
struct Cli {
    /// Enable verbose (trace-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the local index against a live bucket listing.
    Scan(ScanArgs),
    /// Render the current duplicate/anomaly report.
    Report(ReportArgs),
    /// Emit a review-able deletion script for the current duplicates.
    GenerateScript(GenerateScriptArgs),
    /// Emit a review-able rename script from cleanup rules.
    Clean(CleanArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Bucket to scan.
    #[arg(long)]
    bucket: String,

    /// Key prefix to scan; scanning a subtree never deletes entries
    /// outside it.
    #[arg(long, default_value = "")]
    prefix: String,

    /// Path to the local index database.
    #[arg(long, default_value = "bucketjanitor.db")]
    db: PathBuf,

    /// Also extract artist/album/title/codec tags for media files.
    #[arg(long)]
    extract_metadata: bool,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// S3-compatible endpoint URL (MinIO, R2, LocalStack, ...). Omit for AWS S3.
    #[arg(long, env = "BUCKETJANITOR_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// AWS region.
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// Use path-style addressing (required by most non-AWS S3-compatible stores).
    #[arg(long, env = "BUCKETJANITOR_FORCE_PATH_STYLE")]
    force_path_style: bool,

    /// Explicit access key ID; otherwise the default AWS credential chain is used.
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    access_key_id: Option<String>,

    /// Explicit secret access key; otherwise the default AWS credential chain is used.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    secret_access_key: Option<String>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Output format.
    #[arg(long, default_value = "table")]
    format: String,

    /// Path to the local index database.
    #[arg(long, default_value = "bucketjanitor.db")]
    db: PathBuf,

    /// Write the report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateScriptArgs {
    /// Bucket the script's `aws s3 rm` lines target.
    #[arg(long)]
    bucket: String,

    /// Comma-separated retention criteria, in priority order.
    #[arg(long, default_value = "cleanest")]
    keep: String,

    /// Path to the local index database.
    #[arg(long, default_value = "bucketjanitor.db")]
    db: PathBuf,

    /// Write the script here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Endpoint URL to embed in the script (overrides the one captured at scan time).
    #[arg(long)]
    endpoint_url: Option<String>,
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Bucket the script's `aws s3 mv` lines target.
    #[arg(long)]
    bucket: String,

    /// Key prefix to plan renames over.
    #[arg(long, default_value = "")]
    prefix: String,

    /// Comma-separated cleanup rule names.
    #[arg(long, default_value = "strip-spaces")]
    rules: String,

    /// Path to the local index database.
    #[arg(long, default_value = "bucketjanitor.db")]
    db: PathBuf,

    /// Write the script here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Endpoint URL to embed in the script (overrides the one captured at scan time).
    #[arg(long)]
    endpoint_url: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cli.command));
    if let Err(err) = result {
        print_error(&err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("BUCKETJANITOR_LOG").map(EnvFilter::new))
        .unwrap_or_else(|_| {
            EnvFilter::new(if verbose { "bucketjanitor=trace" } else { "bucketjanitor=info" })
        });

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_error(err: &CoreError) {
    eprintln!("\x1b[31mError:\x1b[0m {err}");
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Scan(args) => run_scan(args).await,
        Command::Report(args) => run_report(args),
        Command::GenerateScript(args) => run_generate_script(args),
        Command::Clean(args) => run_clean(args),
    }
}

fn build_s3_config(conn: &ConnectionArgs) -> S3ClientConfig {
    S3ClientConfig {
        region: Some(conn.region.clone()),
        endpoint_url: conn.endpoint_url.clone(),
        force_path_style: conn.force_path_style,
        access_key_id: conn.access_key_id.clone(),
        secret_access_key: conn.secret_access_key.clone(),
    }
}

async fn run_scan(args: ScanArgs) -> Result<()> {
    let store = IndexStore::open(&args.db)?;
    let client = S3Client::new(&build_s3_config(&args.connection)).await;
    let progress = IndicatifProgress::new();

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("received interrupt, finishing current page/object before stopping");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    store.upsert_bucket_config(&args.bucket, args.connection.endpoint_url.as_deref())?;

    let scan_result =
        scanner::scan_bucket(&client, &store, &args.bucket, &args.prefix, &cancel, &progress).await?;

    let resolve_outcome =
        fingerprint::resolve_duplicates(&client, &store, &args.bucket, &progress).await?;

    if args.extract_metadata {
        extract_media_for_prefix(&client, &store, &args.bucket, &args.prefix, &progress).await?;
    }

    let stats = store.get_stats()?;
    eprintln!(
        "scan complete: {} new, {} updated, {} deleted, {} hashed · {} duplicate groups, {} reclaimable",
        scan_result.new,
        scan_result.updated,
        scan_result.deleted,
        resolve_outcome.hashed,
        stats.duplicate_groups,
        humansize::format_size(stats.wasted_bytes, humansize::BINARY),
    );
    Ok(())
}

/// Extracts media tags for every key under `prefix` that looks like a
/// media file and has no metadata row yet — resumable across scans the
/// same way Pass 3 is, by skipping already-populated keys.
async fn extract_media_for_prefix(
    client: &dyn ObjectStoreClient,
    store: &IndexStore,
    bucket: &str,
    prefix: &str,
    progress: &IndicatifProgress,
) -> Result<()> {
    use bucketjanitor::progress::ProgressSink;

    let already_tagged: std::collections::HashSet<String> =
        store.all_media_metadata()?.into_iter().map(|m| m.key).collect();

    let candidates: Vec<String> = store
        .keys_with_prefix(prefix)?
        .into_iter()
        .filter(|key| media::is_media_file(key) && !already_tagged.contains(key))
        .collect();

    if candidates.is_empty() {
        return Ok(());
    }

    progress.start(candidates.len() as u64, "extracting media tags");
    let reader = LoftyTagReader;
    for key in candidates {
        progress.set_current(&key);
        let meta = media::extract_metadata(client, &reader, bucket, &key).await;
        store.upsert_media_metadata(&meta)?;
        progress.advance(1);
    }
    progress.finish();
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<()> {
    let format: ReportFormat = args
        .format
        .parse()
        .map_err(CoreError::Validation)?;
    let store = IndexStore::open(&args.db)?;
    let rendered = report::render(&store, format)?;
    write_output(&rendered, args.output.as_deref())
}

fn run_generate_script(args: GenerateScriptArgs) -> Result<()> {
    let criteria = retention::parse_criteria(&args.keep).map_err(CoreError::Validation)?;
    let store = IndexStore::open(&args.db)?;

    let groups = store.get_all_duplicates()?;
    let stats = store.get_stats()?;
    let endpoint_url = args
        .endpoint_url
        .clone()
        .or(store.get_bucket_endpoint(&args.bucket)?);

    let output_path = args.output.as_deref().map(display_path).unwrap_or_else(|| "generated.sh".to_string());
    let script_text = script::generate_delete_script(
        &args.bucket,
        &groups,
        &criteria,
        &args.keep,
        stats,
        endpoint_url.as_deref(),
        &output_path,
    );

    write_output(&script_text, args.output.as_deref())?;
    eprintln!(
        "{} duplicate groups, {} objects to delete, {} reclaimable",
        stats.duplicate_groups,
        stats.duplicate_objects,
        humansize::format_size(stats.wasted_bytes, humansize::BINARY),
    );
    Ok(())
}

fn run_clean(args: CleanArgs) -> Result<()> {
    let rules: Vec<CleanRule> = args
        .rules
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<CleanRule>())
        .collect::<std::result::Result<Vec<_>, String>>()
        .map_err(CoreError::Validation)?;

    let store = IndexStore::open(&args.db)?;
    let existing_keys = store.keys_with_prefix(&args.prefix)?;
    let plan = rename::plan_renames(&rules, &existing_keys);

    let endpoint_url = args
        .endpoint_url
        .clone()
        .or(store.get_bucket_endpoint(&args.bucket)?);

    let output_path = args.output.as_deref().map(display_path).unwrap_or_else(|| "clean.sh".to_string());
    let script_text =
        script::generate_rename_script(&args.bucket, &rules, &plan, endpoint_url.as_deref(), &output_path);

    let conflicts = plan.iter().filter(|r| r.conflict_with.is_some()).count();
    write_output(&script_text, args.output.as_deref())?;
    eprintln!("{} renames planned ({} conflict-resolved)", plan.len(), conflicts);
    Ok(())
}

fn display_path(path: &std::path::Path) -> String {
    path.display().to_string()
}

fn write_output(content: &str, output: Option<&std::path::Path>) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            file.write_all(content.as_bytes())?;
        }
        None => {
            print!("{content}");
        }
    }
    Ok(())
}
