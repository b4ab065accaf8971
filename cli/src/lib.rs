//! `poimap` command-line front end
//!
//! ## Commands
//!
//! - `poimap categories` - list categories of the resolved directory
//! - `poimap list` - print the filtered records as a table (or JSON)
//! - `poimap render` - draw the filtered records onto a GeoJSON map
//! - `poimap add` - search or paste a link, then commit a new place
//!
//! Exit codes: 0 ok, 1 degraded (remote unavailable, local data or local
//! commit used instead), 2 user or configuration error.

pub mod geojson;
pub mod listing;

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use poimap_core::ErrorCategory;
use poimap_core::Persistence;
use poimap_core::PoiError;
use poimap_core::PoiMapConfig;
use poimap_core::ResolveReport;
use poimap_core::Session;
use poimap_core::SourceOrigin;
use serde::Serialize;

use crate::geojson::GeoJsonMap;
use crate::listing::render_table;

pub const EXIT_OK: i32 = 0;
pub const EXIT_DEGRADED: i32 = 1;
pub const EXIT_USER_ERROR: i32 = 2;

/// Browse and extend a directory of map places
#[derive(Debug, Parser)]
#[command(name = "poimap", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Config file (default: $POIMAP_CONFIG, then ~/.config/poimap/poimap.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Remote directory service base URL
    #[arg(long, global = true, value_name = "URL")]
    pub remote: Option<String>,

    /// Search service base URL (defaults to --remote)
    #[arg(long, global = true, value_name = "URL")]
    pub search_url: Option<String>,

    /// Local CSV dataset used when the remote is unavailable
    #[arg(long, global = true, value_name = "PATH")]
    pub fallback: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List categories in first-seen order
    Categories(CategoriesArgs),

    /// Print the records of the selected categories
    List(SelectionArgs),

    /// Render the selected categories as a GeoJSON map
    Render(RenderArgs),

    /// Add a place via search or a pasted map link
    Add(AddArgs),
}

#[derive(Debug, Args)]
pub struct CategoriesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Category to include (repeatable)
    #[arg(long = "category", short = 'c', value_name = "NAME")]
    pub categories: Vec<String>,

    /// Include every category
    #[arg(long, conflicts_with = "categories")]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// GeoJSON output file (stdout when omitted)
    #[arg(long, short, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Search query
    #[arg(long, short, conflicts_with = "link")]
    pub query: Option<String>,

    /// Index of the search result to pick
    #[arg(long, default_value_t = 0)]
    pub select: usize,

    /// Map link carrying the position (alternative to --query)
    #[arg(long)]
    pub link: Option<String>,

    /// Name (overrides the search result)
    #[arg(long)]
    pub name: Option<String>,

    /// Category (overrides the search result)
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub rating: Option<f64>,

    #[arg(long)]
    pub capacity: Option<u32>,

    /// Directory the updated CSV is written to
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub out_dir: PathBuf,
}

impl Cli {
    pub async fn run(self) -> i32 {
        match self.execute().await {
            Ok(code) => code,
            Err(err) => {
                eprintln!("error: {err:#}");
                exit_code_for(&err)
            }
        }
    }

    async fn execute(self) -> anyhow::Result<i32> {
        let config = load_config(&self.global)?;
        let mut session = Session::from_config(config)?;
        let report = session.resolve().await;
        log_resolution(&report);
        let resolved = resolution_code(&report);

        let code = match self.command {
            Command::Categories(args) => run_categories(&session, &args)?,
            Command::List(args) => run_list(&session, &args)?,
            Command::Render(args) => run_render(&mut session, &args)?,
            Command::Add(args) => run_add(&mut session, args).await?,
        };
        Ok(code.max(resolved))
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .try_init();
}

fn load_config(args: &GlobalArgs) -> anyhow::Result<PoiMapConfig> {
    let mut config = match &args.config {
        Some(path) => PoiMapConfig::load_from(path)?,
        None => PoiMapConfig::load()?,
    };
    if let Some(url) = &args.remote {
        config.remote.directory_url = Some(url.clone());
    }
    if let Some(url) = &args.search_url {
        config.remote.search_url = Some(url.clone());
    }
    if let Some(path) = &args.fallback {
        config.fallback.path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn log_resolution(report: &ResolveReport) {
    if let Some(err) = &report.remote_error {
        eprintln!("warning: {err}; showing local data");
    }
    if !report.skipped.is_empty() {
        eprintln!("warning: skipped {} malformed row(s)", report.skipped.len());
    }
    tracing::info!(
        origin = report.origin.as_str(),
        records = report.records,
        map_eligible = report.map_eligible,
        "Directory ready"
    );
}

fn resolution_code(report: &ResolveReport) -> i32 {
    if report.remote_error.is_some() || report.origin == SourceOrigin::Empty {
        EXIT_DEGRADED
    } else {
        EXIT_OK
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PoiError>().map(PoiError::category) {
        Some(ErrorCategory::Source | ErrorCategory::Persistence) => EXIT_DEGRADED,
        _ => EXIT_USER_ERROR,
    }
}

fn selected_categories(session: &Session, args: &SelectionArgs) -> HashSet<String> {
    if args.all {
        session.categories().iter().map(str::to_string).collect()
    } else {
        args.categories.iter().cloned().collect()
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_categories(session: &Session, args: &CategoriesArgs) -> anyhow::Result<i32> {
    if args.json {
        print_json(&session.categories().as_slice())?;
    } else {
        for category in session.categories().iter() {
            println!("{category}");
        }
    }
    Ok(EXIT_OK)
}

fn run_list(session: &Session, args: &SelectionArgs) -> anyhow::Result<i32> {
    let selected = selected_categories(session, args);
    let records = session.filter(&selected);
    if args.json {
        print_json(&records)?;
    } else {
        print!("{}", render_table(&records));
    }
    Ok(EXIT_OK)
}

fn run_render(session: &mut Session, args: &RenderArgs) -> anyhow::Result<i32> {
    let selected = selected_categories(session, &args.selection);
    let (center, zoom) = session.initial_viewport();
    let mut map = GeoJsonMap::new(center, zoom);

    let summary = session.render(&mut map, &selected);
    let doc = serde_json::to_string_pretty(&map.to_geojson())?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, doc)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "rendered {} marker(s) to {} ({} without coordinates)",
                summary.created,
                path.display(),
                summary.skipped
            );
        }
        None => println!("{doc}"),
    }
    session.teardown(&mut map);
    Ok(EXIT_OK)
}

async fn run_add(session: &mut Session, args: AddArgs) -> anyhow::Result<i32> {
    session.open_add_flow();

    if let Some(query) = &args.query {
        let candidates = session.request_search(query).await?;
        for (index, candidate) in candidates.iter().enumerate() {
            eprintln!("[{index}] {} ({}) {}", candidate.name, candidate.category, candidate.address);
        }
        session.report_selection(args.select)?;
    } else if let Some(link) = &args.link {
        session.fill_pending_from_link(link)?;
    }

    if let Some(pending) = session.pending_mut() {
        if let Some(name) = args.name {
            pending.name = Some(name);
        }
        if let Some(category) = args.category {
            pending.category = category;
        }
        if args.rating.is_some() {
            pending.rating = args.rating;
        }
        if args.capacity.is_some() {
            pending.capacity = args.capacity;
        }
    }

    let outcome = session.commit().await?;
    let path = outcome.export.write_to(&args.out_dir)?;

    let code = match &outcome.persistence {
        Persistence::Remote => {
            eprintln!("saved {} to the remote directory", outcome.record.name);
            EXIT_OK
        }
        Persistence::LocalFallback(err) => {
            eprintln!("warning: {err}; kept {} locally", outcome.record.name);
            EXIT_DEGRADED
        }
        Persistence::LocalOnly => {
            eprintln!("added {} locally", outcome.record.name);
            EXIT_OK
        }
    };
    println!("{}", path.display());
    Ok(code)
}
