use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

use title_policy::models::BatchStats;
use title_policy::progress::{create_progress_bar, format_duration, log_progress, set_log_only};
use title_policy::safety::validate_output_path;
use title_policy::{EngineConfig, ParsedTitle, PolicyEngine, ProfileName, VersionTable};

/// Titles between log-only progress lines
const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Parser)]
#[command(name = "title-policy")]
#[command(about = "Parse music titles into artist/title/features/version and decide accept, graylist or reject")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a single title
    Parse(ParseArgs),

    /// Load and check policy, allow list and deny list
    Validate(ValidateArgs),

    /// Parse a file of `title[<TAB>channel]` lines in parallel into JSON lines
    Batch(BatchArgs),
}

/// Configuration documents; any omitted one uses the shipped default.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Policy YAML (profiles and thresholds)
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Allow list JSON
    #[arg(long)]
    allowlist: Option<PathBuf>,

    /// Deny list JSON
    #[arg(long)]
    denylist: Option<PathBuf>,

    /// Version table JSON (`{"key": "label"}`), replaces the default table in full
    #[arg(long)]
    version_table: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<EngineConfig> {
        EngineConfig::load_or_default(
            self.policy.as_deref(),
            self.allowlist.as_deref(),
            self.denylist.as_deref(),
        )
        .context("Failed to load configuration")
    }

    fn version_table(&self) -> Result<Option<VersionTable>> {
        let Some(path) = &self.version_table else {
            return Ok(None);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read version table {}", path.display()))?;
        let table = VersionTable::from_json(&path.display().to_string(), &json)
            .context("Invalid version table")?;
        Ok(Some(table))
    }

    fn engine(&self) -> Result<PolicyEngine> {
        let engine = PolicyEngine::from_config(self.load()?).context("Invalid configuration")?;
        Ok(match self.version_table()? {
            Some(table) => {
                info!(entries = table.len(), "Using custom version table");
                engine.with_version_table(table)
            }
            None => engine,
        })
    }

    fn paths(&self) -> Vec<&Path> {
        [&self.policy, &self.allowlist, &self.denylist, &self.version_table]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect()
    }
}

#[derive(Args)]
struct ParseArgs {
    title: String,

    /// Channel (uploader) name
    #[arg(long, default_value = "")]
    channel: String,

    #[arg(long, default_value = "balanced")]
    profile: ProfileName,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args)]
struct ValidateArgs {
    /// Report entries that expired before this date (YYYY-MM-DD)
    #[arg(long)]
    today: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args)]
struct BatchArgs {
    input: PathBuf,

    /// Output file, must end in .jsonl
    output: PathBuf,

    #[arg(long, default_value = "balanced")]
    profile: ProfileName,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log periodic progress lines instead
    #[arg(long)]
    log_only: bool,

    /// Write batch statistics as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,
}

/// One JSON line of batch output.
#[derive(Serialize)]
struct BatchRecord<'a> {
    input: &'a str,
    channel: &'a str,
    #[serde(flatten)]
    parsed: Option<&'a ParsedTitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// ============================================================================
// Commands
// ============================================================================

fn run_parse(args: ParseArgs) -> Result<()> {
    let engine = args.config.engine()?;
    let result = engine.parse(&args.title, &args.channel, args.profile)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Artist:     {}", result.artist);
    println!("Title:      {}", result.title);
    println!("Features:   {}", result.features.join(", "));
    println!("Version:    {}", result.version);
    println!("Confidence: {:.2}", result.confidence);
    println!("Decision:   {}", result.decision);
    println!("Method:     {}", result.parsing_method);
    println!("Profile:    {}", result.profile_used);
    println!("Reason:     {}", result.reason);
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = args.config.load()?;
    let engine = PolicyEngine::from_config(config.clone()).context("Invalid configuration")?;
    let version_table = args.config.version_table()?;

    println!("Policy: {} (version {})", engine.policy_name(), engine.policy_version());
    for name in ProfileName::ALL {
        let p = engine.profile(name);
        println!(
            "  {:<10} accept>={:.2} gray>={:.2} reject<{:.2} oac_boost={:.2} stage_b={} shadow={}",
            name, p.accept_min, p.gray_min, p.reject_below, p.oac_boost, p.allow_stage_b, p.shadow_only
        );
    }
    println!("Allow list entries: {}", engine.allowlist_len());
    println!("Deny list entries:  {}", engine.denylist_len());
    if let Some(table) = &version_table {
        println!("Version table entries: {}", table.len());
    }

    if let Some(today) = args.today {
        let expired = config.expired_entries(&today);
        if expired.is_empty() {
            println!("No entries expired before {}", today);
        } else {
            println!("Expired entries ({}):", expired.len());
            for line in expired {
                println!("  {}", line);
            }
        }
    }

    println!("Configuration OK");
    Ok(())
}

/// Read `title[<TAB>channel]` lines, skipping blanks and `#` comments.
fn read_titles(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| match line.split_once('\t') {
            Some((title, channel)) => (title.to_string(), channel.trim().to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect())
}

fn run_batch(args: BatchArgs) -> Result<()> {
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let mut sources: Vec<&Path> = vec![args.input.as_path()];
    sources.extend(args.config.paths());
    validate_output_path(&args.output, &sources)?;

    let start = Instant::now();
    let engine = args.config.engine()?;
    if engine.profile(args.profile).shadow_only {
        warn!(profile = %args.profile, "Shadow-only profile: decisions are advisory");
    }

    let titles = read_titles(&args.input)?;
    if titles.is_empty() {
        bail!("No titles in {}", args.input.display());
    }
    info!(count = titles.len(), input = %args.input.display(), "Parsing titles");

    let total = titles.len() as u64;
    let pb = create_progress_bar(total, "Parsing");
    let done = AtomicU64::new(0);

    let results: Vec<_> = titles
        .par_iter()
        .map(|(title, channel)| {
            let result = engine.parse(title, channel, args.profile);
            pb.inc(1);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            log_progress("parse", n, total, PROGRESS_INTERVAL);
            result
        })
        .collect();
    pb.finish_with_message(format!("Parsed {} titles", results.len()));

    let mut stats = BatchStats::default();
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("Failed to create output {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);

    for ((title, channel), result) in titles.iter().zip(&results) {
        let record = match result {
            Ok(parsed) => {
                stats.record(parsed);
                BatchRecord {
                    input: title,
                    channel,
                    parsed: Some(parsed),
                    error: None,
                }
            }
            Err(e) => {
                stats.record_invalid();
                BatchRecord {
                    input: title,
                    channel,
                    parsed: None,
                    error: Some(e.to_string()),
                }
            }
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let elapsed = start.elapsed();
    stats.elapsed_seconds = elapsed.as_secs_f64();

    println!("\n{:=<60}", "");
    println!("Batch complete!");
    println!("  Titles:    {}", stats.total_titles);
    println!("  Accepted:  {} ({:.1}%)", stats.accepted, stats.accept_rate());
    println!("  Graylist:  {}", stats.graylisted);
    println!("  Rejected:  {}", stats.rejected);
    println!("  Invalid:   {}", stats.invalid_titles);
    println!("  Elapsed:   {}", format_duration(elapsed));
    println!("{:=<60}", "");

    if let Some(path) = &args.stats {
        stats.write_to_file(path)?;
        info!(path = %path.display(), "Wrote stats");
    } else if args.log_only {
        stats.log_phase("batch");
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().cmd {
        Command::Parse(args) => run_parse(args),
        Command::Validate(args) => run_validate(args),
        Command::Batch(args) => run_batch(args),
    }
}
