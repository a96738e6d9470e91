//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use placebook_core::{
    DocumentSource, FileSource, HttpSource, Pipeline, ProgressEvent, ProgressReporter, RunConfig,
    RunSummary,
};
use placebook_enrich::HttpPlacesClient;
use placebook_model::{CompletionConfig, OpenAiCompatClient};
use placebook_shared::{AppConfig, Catalog, SecretSource, init_config, load_config, resolve_secret};
use placebook_store::{CatalogStore, HttpObjectStore, LocalStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Placebook — turn narrative guides into enriched place catalogs.
#[derive(Parser)]
#[command(
    name = "placebook",
    version,
    about = "Convert a narrative guide document into a versioned, enriched place catalog.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the document-to-catalog pipeline.
    Run {
        /// Document to process: a local path, or an id resolved against the
        /// configured source endpoint.
        document: String,

        /// Force re-enrichment of every place regardless of prior status.
        #[arg(long)]
        full_refresh: bool,

        /// Location context override (e.g. "Door County, Wisconsin").
        #[arg(short, long)]
        location: Option<String>,

        /// Catalog storage key override.
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Summarize the currently stored catalog.
    Show {
        /// Catalog storage key override.
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "placebook=info",
        1 => "placebook=debug",
        _ => "placebook=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            document,
            full_refresh,
            location,
            key,
        } => cmd_run(&document, full_refresh, location.as_deref(), key.as_deref()).await,
        Command::Show { key } => cmd_show(key.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    document: &str,
    full_refresh: bool,
    location: Option<&str>,
    key: Option<&str>,
) -> Result<()> {
    let config = load_config()?;

    let location_context = location
        .map(String::from)
        .unwrap_or_else(|| config.defaults.location_context.clone());
    let catalog_key = key
        .map(String::from)
        .unwrap_or_else(|| config.defaults.catalog_key.clone());

    let source = build_source(&config)?;
    let model = build_model(&config)?;
    let lookup = build_lookup(&config)?;
    let store = build_store(&config)?;

    let run_config = RunConfig {
        document_id: document.to_string(),
        location_context,
        full_refresh,
        enrichment_version: config.defaults.enrichment_version.clone(),
        catalog_key: catalog_key.clone(),
        rate_limit: Duration::from_millis(config.places.rate_limit_ms),
        max_results: config.places.max_results,
    };

    info!(document, full_refresh, key = %catalog_key, "starting pipeline run");

    let reporter = CliProgress::new();
    let pipeline = Pipeline::new(source, model, lookup, store, run_config);
    let catalog = pipeline.run(&reporter).await?;

    let stats = catalog.metadata.enrichment_stats;
    println!();
    println!("  Catalog written to '{catalog_key}'");
    println!("  Source:     {}", catalog.metadata.source_title);
    println!("  Places:     {}", catalog.metadata.total_places);
    println!("  Enriched:   {}", stats.enriched_places);
    println!("  Skipped:    {}", stats.skipped_places);
    println!("  Failed:     {}", stats.failed_places);
    println!("  Categories: {}", catalog.metadata.categories.join(", "));
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Collaborator construction
// ---------------------------------------------------------------------------

fn build_source(config: &AppConfig) -> Result<Arc<dyn DocumentSource>> {
    if config.source.base_url.is_empty() {
        return Ok(Arc::new(FileSource));
    }
    let source = HttpSource::new(
        config.source.base_url.clone(),
        Duration::from_secs(config.source.timeout_secs),
    )?;
    Ok(Arc::new(source))
}

fn build_model(config: &AppConfig) -> Result<Arc<OpenAiCompatClient>> {
    let api_key = config.model.resolve_key()?;
    let client = OpenAiCompatClient::new(CompletionConfig {
        base_url: config.model.base_url.clone(),
        api_key,
        model: config.model.model.clone(),
        max_output_tokens: config.model.max_output_tokens,
        timeout: Duration::from_secs(config.model.timeout_secs),
    })?;
    Ok(Arc::new(client))
}

fn build_lookup(config: &AppConfig) -> Result<Arc<HttpPlacesClient>> {
    let api_key = config.places.resolve_key()?;
    let client = HttpPlacesClient::new(
        config.places.base_url.clone(),
        api_key,
        Duration::from_secs(config.places.timeout_secs),
    )?;
    Ok(Arc::new(client))
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn CatalogStore>> {
    match config.storage.backend.as_str() {
        "local" => {
            let root = LocalStore::expand_root(&config.storage.root);
            Ok(Arc::new(LocalStore::new(root)))
        }
        "http" => {
            if config.storage.base_url.is_empty() {
                return Err(eyre!("storage.backend is 'http' but storage.base_url is empty"));
            }
            let token = resolve_secret(&[SecretSource::Env(config.storage.token_env.clone())]);
            Ok(Arc::new(HttpObjectStore::new(
                config.storage.base_url.clone(),
                token,
            )?))
        }
        other => Err(eyre!(
            "unknown storage backend '{other}': expected 'local' or 'http'"
        )),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn event(&self, event: &ProgressEvent) {
        self.spinner
            .set_message(format!("[{}] {}", event.phase, event.message));
    }

    fn place_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {detail}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

async fn cmd_show(key: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let catalog_key = key
        .map(String::from)
        .unwrap_or_else(|| config.defaults.catalog_key.clone());

    let store = build_store(&config)?;
    let Some(data) = store.download(&catalog_key).await? else {
        return Err(eyre!("no catalog found at '{catalog_key}'"));
    };

    let catalog: Catalog = serde_json::from_slice(&data)
        .map_err(|e| eyre!("catalog at '{catalog_key}' is unreadable: {e}"))?;

    let stats = catalog.metadata.enrichment_stats;
    println!();
    println!("  Catalog '{catalog_key}'");
    println!("  Source:     {}", catalog.metadata.source_title);
    println!("  Generated:  {}", catalog.metadata.generated_at);
    println!("  Version:    {}", catalog.metadata.parser_version);
    println!("  Places:     {}", catalog.metadata.total_places);
    println!("  Enriched:   {}", stats.enriched_places);
    println!("  Skipped:    {}", stats.skipped_places);
    println!("  Failed:     {}", stats.failed_places);
    println!();

    for place in &catalog.places {
        let marker = if place.enrichment_status.enriched {
            "✓"
        } else {
            "✗"
        };
        println!("  {marker} {:<32} [{}] {}", place.name, place.place_type, place.category);
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
