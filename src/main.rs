//! SourceFinder-RS: a claim-provenance search engine for mirrored social content
//!
//! This is the main entry point for the command-line surface.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sourcefinder_rs::{
    classify::HttpClassifier,
    config::Settings,
    items::DatasetWriter,
    network::HttpClient,
    pagination::PaginationEngine,
    query::{KeywordExtractor, KeywordGroup, QueryBuilder},
    retrieval::{MirrorPool, RetrievalClient, SearchRequest},
    search::{
        top_authors, DateRange, LabeledItem, SearchOptions, SearchOutcome, SourceFinder,
        StepSize,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FindSource,
    FindAll,
}

/// Fallback keyword source when no extractor output is supplied on the
/// command line: the claim's own words, in order.
struct ClaimWords;

#[async_trait]
impl KeywordExtractor for ClaimWords {
    async fn extract(&self, text: &str, max_keywords: usize) -> Result<Vec<String>> {
        Ok(text
            .split_whitespace()
            .take(max_keywords)
            .map(str::to_string)
            .collect())
    }
}

struct CliArgs {
    claim: String,
    mode: Mode,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
    keywords: Option<Vec<String>>,
    drop_count: Option<usize>,
    excludes: Option<Vec<String>>,
    earliest_k: Option<usize>,
    step: Option<u32>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_args()? {
        Some(args) => args,
        None => return Ok(()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting SourceFinder-RS v{}", sourcefinder_rs::VERSION);

    let settings = load_settings(args.config.as_deref())?;
    info!(
        "Loaded configuration for instance: {}",
        settings.general.instance_name
    );

    let endpoint = settings
        .classifier
        .endpoint
        .clone()
        .ok_or_else(|| anyhow!("no classifier endpoint configured; set classifier.endpoint or SOURCEFINDER_CLASSIFIER_URL"))?;

    // keyword extraction runs out of process; the CLI takes extractor
    // output directly and falls back to the claim's own words
    let keywords = match args.keywords.clone() {
        Some(list) => list,
        None => {
            ClaimWords
                .extract(&args.claim, settings.search.max_keywords)
                .await?
        }
    };
    if keywords.is_empty() {
        bail!("no keywords to search with");
    }
    let groups: Vec<KeywordGroup> = keywords
        .iter()
        .map(|k| KeywordGroup::bare(k.as_str()))
        .collect();
    let drop_count = args.drop_count.unwrap_or(settings.search.drop_count);
    let query = QueryBuilder::build(&groups, drop_count);
    info!("query: {query}");

    let request = SearchRequest::new(query)
        .with_includes(settings.search.includes.clone())
        .with_excludes(
            args.excludes
                .clone()
                .unwrap_or_else(|| settings.search.excludes.clone()),
        )
        .with_near(settings.search.near.clone());

    let range = DateRange::new(
        args.since.unwrap_or(settings.search.default_since),
        args.until.unwrap_or_else(|| Utc::now().date_naive()),
    );
    let options = SearchOptions {
        step: StepSize::new(
            args.step.unwrap_or(settings.search.step),
            settings.search.granularity,
        ),
        earliest_k: args.earliest_k.unwrap_or(settings.search.earliest_k),
        probe_windows: settings.search.probe_windows,
    };

    // each invocation owns its fetcher, pool and classifier
    let fetcher = Arc::new(HttpClient::with_settings(&settings.outgoing)?);
    let pool = MirrorPool::from_directory(&fetcher, &settings.mirrors).await;
    info!("mirror pool ready with {} instances", pool.len());
    let engine = PaginationEngine::new(RetrievalClient::new(fetcher, pool));
    let classifier = HttpClassifier::new(
        HttpClient::with_settings(&settings.outgoing)?,
        endpoint,
        settings.classifier.batch_size,
    );
    let mut finder = SourceFinder::new(engine, classifier);

    let started = Instant::now();
    let outcome = match args.mode {
        Mode::FindSource => {
            finder
                .find_source(&args.claim, &request, range, &options)
                .await?
        }
        Mode::FindAll => finder.find_all(&args.claim, &request, range).await?,
    };
    info!("search finished in {:.2?}", started.elapsed());

    report(&outcome);
    if args.mode == Mode::FindAll && !outcome.supporting.is_empty() {
        println!("\nMost active authors:");
        for activity in top_authors(&outcome.supporting, 3) {
            println!("  {}  |  {} item(s)", activity.author, activity.count);
        }
    }
    write_dataset(&args, &keywords, drop_count, &range, &outcome)?;

    Ok(())
}

fn report(outcome: &SearchOutcome) {
    match &outcome.source {
        Some(source) => {
            println!("\nEarliest entailing item:\n");
            print_item(source);
            println!("\n{} supporting item(s) in total", outcome.supporting.len());
        }
        None => {
            let reason = outcome.reason.as_deref().unwrap_or("no result");
            println!("\nNo source found: {reason}");
        }
    }
    if !outcome.earliest.is_empty() {
        println!("\nEarliest {} item(s) seen, regardless of label:\n", outcome.earliest.len());
        for labeled in &outcome.earliest {
            print_item(labeled);
        }
    }
}

fn print_item(labeled: &LabeledItem) {
    let item = &labeled.item;
    println!("{}", "-".repeat(80));
    println!("User: {}", item.author);
    println!("Date: {}", item.iso_created_at());
    println!("Link: {}", item.permalink);
    println!("Label: {}", labeled.label);
    println!(
        "Stats: {} replies, {} reshares, {} quotes, {} likes",
        item.engagement.replies,
        item.engagement.reshares,
        item.engagement.quotes,
        item.engagement.likes
    );
    println!("Text:\n{}", item.body);
    println!("{}", "-".repeat(80));
}

fn write_dataset(
    args: &CliArgs,
    keywords: &[String],
    drop_count: usize,
    range: &DateRange,
    outcome: &SearchOutcome,
) -> Result<()> {
    if outcome.supporting.is_empty() && outcome.earliest.is_empty() {
        return Ok(());
    }
    let path = args.out.clone().unwrap_or_else(|| {
        // kpc: keywords per clause
        let kpc = keywords.len().saturating_sub(drop_count).max(1);
        PathBuf::from(format!(
            "{}_kpc_{}_{}_to_{}.csv",
            keywords.join("_"),
            kpc,
            range.since,
            range.until
        ))
    });
    let mut writer = DatasetWriter::create(&path, true)?;
    for labeled in outcome.supporting.iter().chain(&outcome.earliest) {
        writer.write(&labeled.item, Some(labeled.label))?;
    }
    writer.flush()?;
    info!("dataset written to {}", path.display());
    Ok(())
}

/// Parse command-line arguments. Returns None when the invocation only
/// asked for help or the version.
fn parse_args() -> Result<Option<CliArgs>> {
    let mut claim_parts: Vec<String> = Vec::new();
    let mut mode = Mode::FindSource;
    let mut since = None;
    let mut until = None;
    let mut keywords = None;
    let mut drop_count = None;
    let mut excludes = None;
    let mut earliest_k = None;
    let mut step = None;
    let mut out = None;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("sourcefinder-rs v{}", sourcefinder_rs::VERSION);
                return Ok(None);
            }
            "--mode" => {
                mode = match value(&mut args, "--mode")?.as_str() {
                    "find-source" => Mode::FindSource,
                    "find-all" => Mode::FindAll,
                    other => bail!("unknown mode '{other}'"),
                }
            }
            "--since" => since = Some(parse_date(&value(&mut args, "--since")?)?),
            "--until" => until = Some(parse_date(&value(&mut args, "--until")?)?),
            "--keywords" => keywords = Some(split_list(&value(&mut args, "--keywords")?)),
            "--drop" => drop_count = Some(value(&mut args, "--drop")?.parse()?),
            "--exclude" => excludes = Some(split_list(&value(&mut args, "--exclude")?)),
            "--earliest" => earliest_k = Some(value(&mut args, "--earliest")?.parse()?),
            "--step" => step = Some(value(&mut args, "--step")?.parse()?),
            "--out" => out = Some(PathBuf::from(value(&mut args, "--out")?)),
            "-c" | "--config" => config = Some(PathBuf::from(value(&mut args, "--config")?)),
            _ if arg.starts_with('-') => bail!("unknown option '{arg}'"),
            _ => claim_parts.push(arg),
        }
    }

    if claim_parts.is_empty() {
        print_usage();
        bail!("missing claim");
    }

    Ok(Some(CliArgs {
        claim: claim_parts.join(" "),
        mode,
        since,
        until,
        keywords,
        drop_count,
        excludes,
        earliest_k,
        step,
        out,
        config,
    }))
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load settings from file or use defaults
fn load_settings(explicit: Option<&std::path::Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        let mut settings = Settings::from_file(path)?;
        settings.merge_env();
        return Ok(settings);
    }

    let paths = [
        PathBuf::from("sourcefinder.yml"),
        PathBuf::from("config/sourcefinder.yml"),
        PathBuf::from("/etc/sourcefinder/sourcefinder.yml"),
        dirs::config_dir()
            .map(|p| p.join("sourcefinder-rs/sourcefinder.yml"))
            .unwrap_or_default(),
    ];

    if let Ok(path) = std::env::var("SOURCEFINDER_SETTINGS_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            let mut settings = Settings::from_file(&path)?;
            settings.merge_env();
            return Ok(settings);
        }
    }

    for path in paths.iter() {
        if path.exists() {
            let mut settings = Settings::from_file(path)?;
            settings.merge_env();
            return Ok(settings);
        }
    }

    let mut settings = Settings::default();
    settings.merge_env();
    Ok(settings)
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
SourceFinder-RS v{}
A claim-provenance search engine for mirrored social content

USAGE:
    sourcefinder-rs [OPTIONS] <CLAIM>

OPTIONS:
    --mode <MODE>          find-source (default) or find-all
    --since <DATE>         Scan start, YYYY-MM-DD
    --until <DATE>         Scan end, YYYY-MM-DD
    --keywords <LIST>      Comma-separated keywords (claim words when omitted)
    --drop <N>             Keywords the query may drop per clause
    --exclude <LIST>       Comma-separated excluded result categories
    --earliest <K>         Keep the K chronologically earliest items seen
    --step <N>             Window step count
    --out <FILE>           Dataset CSV path
    -c, --config <FILE>    Path to configuration file
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    SOURCEFINDER_SETTINGS_PATH   Path to sourcefinder.yml
    SOURCEFINDER_DEBUG           Enable debug mode (true/false)
    SOURCEFINDER_CLASSIFIER_URL  Classifier inference endpoint
    SOURCEFINDER_MIRROR_DIRECTORY  Mirror directory document URL
    SOURCEFINDER_FALLBACK_MIRROR   Mirror used when the directory is down
"#,
        sourcefinder_rs::VERSION
    );
}
