//! Stylesweep main entry point
//!
//! This is the command-line interface for the Stylesweep CSS auditor.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use stylesweep::auth::{build_login_client, form_login};
use stylesweep::config::{load_config_with_hash, validate, Config};
use stylesweep::crawler::DEFAULT_USER_AGENT;
use stylesweep::output::{render, write_markdown_report, ReportOptions};
use stylesweep::{audit, PageKind};
use tracing_subscriber::EnvFilter;

/// Stylesweep: find unused and duplicated CSS rules
///
/// Stylesweep crawls a site (optionally both logged out and logged in),
/// matches every selector of the given stylesheets against each page and
/// reports the rules nothing uses.
#[derive(Parser, Debug)]
#[command(name = "stylesweep")]
#[command(version)]
#[command(about = "Find unused and duplicated CSS rules", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "stylesweep.toml")]
    config: PathBuf,

    /// Page to check (URL, file or HTML), instead of a config file
    #[arg(long, requires = "css")]
    html: Option<String>,

    /// Stylesheet to check (URL, file or CSS), instead of a config file
    #[arg(long, requires = "html")]
    css: Option<String>,

    /// Show every rule with its match count, not just unused rules
    #[arg(short, long)]
    used: bool,

    /// Leave out headings and the summary line
    #[arg(short, long)]
    nosummary: bool,

    /// List duplicated rules
    #[arg(short, long)]
    duplicates: bool,

    /// Also write a markdown report to this path
    #[arg(long, value_name = "PATH")]
    markdown: Option<PathBuf>,

    /// Validate config and show what would be audited without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match (&cli.html, &cli.css) {
        (Some(html), Some(css)) => {
            let config = Config::single(html, css);
            validate(&config).context("Invalid --html/--css arguments")?;
            (config, None)
        }
        _ => {
            tracing::info!("Loading configuration from: {}", cli.config.display());
            let (config, hash) = load_config_with_hash(&cli.config).with_context(|| {
                format!("Failed to load configuration from {}", cli.config.display())
            })?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let cookie = resolve_cookie(&config).await?;
    let result = audit(config.to_request(cookie))
        .await
        .context("Audit failed")?;

    let options = ReportOptions {
        used: cli.used,
        summary: !cli.nosummary,
        duplicates: cli.duplicates,
    };
    print!("{}", render(&result, &options));

    if let Some(path) = &cli.markdown {
        write_markdown_report(&result, config_hash.as_deref(), path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Markdown report written to {}", path.display());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so the report on stdout stays clean.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("stylesweep=info,warn"),
            1 => EnvFilter::new("stylesweep=debug,info"),
            2 => EnvFilter::new("stylesweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Gets the session cookie: the static one, or one from a form login
async fn resolve_cookie(config: &Config) -> anyhow::Result<Option<String>> {
    if let Some(cookie) = config.static_cookie() {
        tracing::info!("Using configured session cookie");
        return Ok(Some(cookie.to_string()));
    }

    let Some(form) = config.login_form() else {
        return Ok(None);
    };

    let user_agent = config.http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    let client = build_login_client(user_agent).context("Failed to build login client")?;
    let cookie = form_login(&client, &form).await?;
    Ok(Some(cookie))
}

/// Handles the --dry-run mode: shows what would be audited
fn handle_dry_run(config: &Config) {
    println!("=== Stylesweep Dry Run ===\n");

    println!("CSS sources ({}):", config.css.len());
    for source in config.css_sources() {
        println!("  - {}", source);
    }

    let pages = config.page_set();
    println!("\nCrawl ({}):", pages.crawl.len());
    for target in &pages.crawl {
        println!("  - {} [{}]", target.locator, kind_name(target.kind));
    }

    println!("\nInclude ({}):", pages.include.len());
    for target in &pages.include {
        println!("  - {} [{}]", target.locator, kind_name(target.kind));
    }

    println!("\nExclude ({}):", pages.exclude.len());
    for entry in &pages.exclude {
        println!("  - {}", entry);
    }

    println!("\nWhitelist ({}):", config.whitelist.len());
    for rule in &config.whitelist {
        println!("  - {}", rule);
    }

    println!("\nHTTP:");
    println!("  Timeout: {}ms", config.http.timeout);
    println!(
        "  Max concurrent fetches: {}",
        config.http.max_concurrent_fetches
    );
    println!(
        "  User agent: {}",
        config.http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    );

    let auth = if config.static_cookie().is_some() {
        "static cookie"
    } else if config.login_form().is_some() {
        "form login"
    } else {
        "none"
    };
    println!("  Authentication: {}", auth);

    println!("\n✓ Configuration is valid");
}

fn kind_name(kind: PageKind) -> &'static str {
    match kind {
        PageKind::Url => "url",
        PageKind::FilePath => "file",
        PageKind::InlineHtml => "html",
    }
}
