//! SchemeLens - Government Scheme Intelligence Dashboard
//!
//! A CLI tool that loads a scheme budget-utilisation workbook, classifies
//! each scheme by utilisation risk, renders a dashboard report and can
//! draft a formal review note with an AI model.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing API key, bad workbook, review failure, etc.)
//!   2 - High-risk schemes found and --fail-on-high-risk set

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;
mod review;
mod session;

use analysis::DistrictFilter;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{ApiKey, Config};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Dashboard, ReviewNote};
use review::{ReviewConfig, ReviewNoteRequester};
use session::Session;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first: it can raise the log level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("SchemeLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run_dashboard(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .schemelens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to customize the model, worksheet, and report layout.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete dashboard workflow. Returns exit code (0 or 2).
async fn run_dashboard(args: Args, config: Config) -> Result<i32> {
    // Step 1: Credentials are checked before any input is touched
    let api_key = if args.offline {
        info!("Offline mode: skipping API key check");
        None
    } else {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Some(config::resolve_api_key(&config.model.api_key_env)?)
    };

    // Step 2: Load the workbook
    let input = args
        .input
        .clone()
        .context("An input workbook is required (--input)")?;
    println!("📥 Loading workbook: {}", input.display());

    let dataset = loader::load_workbook(&input, config.input.sheet.as_deref())
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let mut session = Session::new(dataset, DistrictFilter::All, config.input.on_invalid);
    println!(
        "   {} records from worksheet '{}'",
        session.dataset().len(),
        session.dataset().sheet
    );

    if session.dataset().is_empty() {
        warn!("Worksheet '{}' has a header but no data rows", session.dataset().sheet);
    }

    if args.list_districts {
        return handle_list_districts(&session);
    }

    session.select(DistrictFilter::from_selection(args.district.as_deref()));

    if !session.selection_is_known() {
        warn!(
            "District '{}' not found. Available: {}",
            session.filter(),
            session.district_options().join(", ")
        );
    }

    // Step 3: Compute and render the dashboard
    println!("\n🔎 District: {}", session.filter());

    let source = input.display().to_string();
    let mut dashboard = session
        .dashboard(&source, config.report.preview_rows)
        .context("Failed to compute dashboard indicators")?;

    let output_path = output_path(&args, &config);
    write_dashboard(&dashboard, &output_path, args.format, &config)?;
    print_summary(&dashboard, &config);
    println!("\n✅ Dashboard saved to: {}", output_path.display());

    // Step 4: Optional review note, only on explicit request
    if args.review {
        let api_key = api_key.context("API key unavailable for review request")?;
        let note = request_review_note(&session, &args, &config, api_key)
            .await
            .with_context(|| {
                format!(
                    "Review note failed; dashboard at {} was left unchanged",
                    output_path.display()
                )
            })?;

        dashboard.attach_review_note(note);
        write_dashboard(&dashboard, &output_path, args.format, &config)?;
        println!("🧠 Review note added to: {}", output_path.display());
    }

    if args.fail_on_high_risk && dashboard.kpis.high_risk_count > 0 {
        eprintln!(
            "\n⛔ {} high-risk scheme(s) found. Failing (exit code 2).",
            dashboard.kpis.high_risk_count
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --list-districts: print the selectable districts and exit.
fn handle_list_districts(session: &Session) -> Result<i32> {
    println!("\n📍 Selectable districts:\n");
    for district in session.district_options() {
        println!("   {}", district);
    }
    Ok(0)
}

/// Draft the review note for the session's current view.
async fn request_review_note(
    session: &Session,
    args: &Args,
    config: &Config,
    api_key: ApiKey,
) -> Result<ReviewNote> {
    let requester = ReviewNoteRequester::new(ReviewConfig::from(&config.model), api_key)?;

    println!("\n🤖 Requesting review note...");
    println!("   Model: {}", requester.config().model_name);
    println!("   Timeout: {}s (Ctrl-C to cancel)", requester.config().timeout_seconds);

    let spinner = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Drafting review note...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler: never cancel.
            std::future::pending::<()>().await;
        }
    };

    let result = session
        .review_note(&requester, args.instruction.as_deref(), cancel)
        .await;
    spinner.finish_and_clear();

    Ok(result?)
}

/// Render the dashboard in the requested format and write it.
fn write_dashboard(
    dashboard: &Dashboard,
    path: &Path,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_json_report(dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(dashboard, &config.report),
    };

    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write dashboard to {}", path.display()))
}

/// Resolve the output path; JSON output gets a `.json` extension unless
/// a path was given explicitly.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    match (args.format, &args.output) {
        (_, Some(explicit)) => explicit.clone(),
        (OutputFormat::Json, None) => path.with_extension("json"),
        (OutputFormat::Markdown, None) => path,
    }
}

/// Print the KPI summary to stdout.
fn print_summary(dashboard: &Dashboard, config: &Config) {
    let kpis = &dashboard.kpis;
    let currency = &config.report.currency_label;

    println!("\n📌 Key Performance Indicators:");
    println!(
        "   Total Allocation ({}): {}",
        currency,
        report::charts::format_amount(kpis.total_allocation, 2)
    );
    println!(
        "   Total Utilisation ({}): {}",
        currency,
        report::charts::format_amount(kpis.total_utilisation, 2)
    );
    println!("   Average Utilisation (%): {}", kpis.mean_display());
    println!("   High Risk Schemes: {}", kpis.high_risk_count);

    let counts: Vec<String> = analysis::risk_counts(&dashboard.risk_table)
        .into_iter()
        .map(|(level, count)| format!("{} {}: {}", level.emoji(), level, count))
        .collect();
    println!("   - {}", counts.join(" | "));

    if kpis.excluded_rows > 0 {
        println!(
            "   ⚠️  {} row(s) excluded for invalid metrics",
            kpis.excluded_rows
        );
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", config::CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
