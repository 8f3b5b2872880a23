//! Text-Harvest main entry point
//!
//! This is the command-line interface for the Text-Harvest crawl-and-extract
//! pipeline.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use text_harvest::config::{load_config_with_hash, Config, DiscoveryRule};
use text_harvest::output::print_statistics;
use text_harvest::storage::{open_store, SubmissionRequest, SubmissionStore, UploadedFile};
use text_harvest::Coordinator;
use tracing_subscriber::EnvFilter;

/// Text-Harvest: a polite crawl-and-extract pipeline
///
/// Text-Harvest fetches listing pages, discovers links to content pages,
/// extracts a title and body from each one and writes the sanitized text to a
/// delimited file.
#[derive(Parser, Debug)]
#[command(name = "text-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite crawl-and-extract pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["list_submissions", "submit"])]
    dry_run: bool,

    /// Print stored submissions as JSON and exit
    #[arg(long, conflicts_with_all = ["dry_run", "submit"])]
    list_submissions: bool,

    /// Store a submission with this file and exit (requires --text)
    #[arg(long, value_name = "FILE", requires = "text")]
    submit: Option<PathBuf>,

    /// Plain text of the submission
    #[arg(long, value_name = "TEXT", requires = "submit")]
    text: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.list_submissions {
        handle_list_submissions(&config)?;
    } else if let Some(file) = &cli.submit {
        handle_submit(&config, file, cli.text.unwrap_or_default())?;
    } else {
        handle_harvest(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("text_harvest=info,warn"),
            1 => EnvFilter::new("text_harvest=debug,info"),
            2 => EnvFilter::new("text_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Text-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Delay between requests: {}ms", config.crawler.delay_ms);
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    if let Some(max) = config.crawler.max_records {
        println!("  Max records: {}", max);
    }

    println!("\nHTTP:");
    println!("  User-Agent: {}", config.http.user_agent);
    if let Some(language) = &config.http.accept_language {
        println!("  Accept-Language: {}", language);
    }
    println!(
        "  Encoding: {} (fallback {})",
        config.http.encoding, config.http.fallback_encoding
    );

    println!("\nOutput:");
    println!("  Path: {}", config.output.path);
    println!("  Delimiter: {:?}", config.output.delimiter);
    let headers: Vec<&str> = config
        .output
        .columns
        .iter()
        .map(|c| c.header_label())
        .collect();
    println!("  Columns: {}", headers.join(", "));

    let site = &config.site;
    println!("\nSite:");
    if let Some(pages) = &site.pages {
        println!(
            "  Pages: {} for ids {}..={} ({} pages)",
            pages.url_template,
            pages.start,
            pages.end,
            pages.end - pages.start + 1
        );
    } else {
        println!("  Depth: {}", site.depth);
        println!("  Seeds ({}):", site.seeds.len());
        for seed in &site.seeds {
            match &seed.label {
                Some(label) => println!("    * {} [{}]", seed.url, label),
                None => println!("    * {}", seed.url),
            }
        }
        if let Some(rule) = &site.first_level {
            println!("  First level: {}", describe_rule(rule));
        }
        if let Some(rule) = &site.second_level {
            println!("  Second level: {}", describe_rule(rule));
        }
        if site.emit_links {
            println!("  Last level: links written as records, not fetched");
        }
    }

    let selectors: Vec<&str> = site
        .content
        .body_selectors
        .iter()
        .map(|s| s.selector.as_str())
        .collect();
    println!("  Body selectors: {}", selectors.join(" > "));

    println!("\n✓ Configuration is valid");
}

fn describe_rule(rule: &DiscoveryRule) -> String {
    match rule {
        DiscoveryRule::HeaderAnchored { header, cap, .. } => {
            format!("list items after header {:?} (up to {})", header, cap)
        }
        DiscoveryRule::ListItems {
            item_tags,
            first_anchor_only,
        } => format!(
            "anchors in {}{}",
            item_tags.join("/"),
            if *first_anchor_only { " (first only)" } else { "" }
        ),
        DiscoveryRule::TagBlock {
            selector,
            text_prefix,
        } => match text_prefix {
            Some(prefix) => format!("anchors in {} starting with {:?}", selector, prefix),
            None => format!("anchors in {}", selector),
        },
    }
}

/// Handles the --list-submissions mode
fn handle_list_submissions(config: &Config) -> anyhow::Result<()> {
    let Some(submissions) = &config.submissions else {
        bail!("no [submissions] section in the configuration");
    };

    let store = open_store(submissions)?;
    let views = store.list()?;
    println!("{}", serde_json::to_string_pretty(&views)?);

    Ok(())
}

/// Handles the --submit mode
fn handle_submit(config: &Config, file: &Path, text: String) -> anyhow::Result<()> {
    let Some(submissions) = &config.submissions else {
        bail!("no [submissions] section in the configuration");
    };

    let content =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut store = open_store(submissions)?;
    let submission = store.create(SubmissionRequest {
        plain_text: Some(text),
        text_file: Some(UploadedFile { filename, content }),
    })?;
    println!("{}", serde_json::to_string_pretty(&submission)?);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config)?;

    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current writes and stopping");
            token.cancel();
        }
    });

    match coordinator.run().await {
        Ok(stats) => {
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
