//! qbuild: the query builder CLI
//!
//! Loads a serialized query tree, checks it against the demo configuration
//! and prints the SQL where condition and JsonLogic it renders to.
//!
//! # Usage
//!
//! ```bash
//! # Render the initial (empty) query
//! qbuild
//!
//! # Render a saved tree, with the MongoDB filter too
//! qbuild render query.json --mongo
//!
//! # Page through the autocomplete field
//! qbuild search autocomplete a --offset 3
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use qbuild::prelude::*;
use qbuild::fetch::SimulatedFetch;
use qbuild::settings::CliSettings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qbuild")]
#[command(version = "0.1.0")]
#[command(about = "Render query builder trees as SQL, JsonLogic and MongoDB filters")]
#[command(long_about = None)]
#[command(after_help = "EXAMPLES:
    qbuild render query.json
    qbuild render query.json --mongo --query-string
    qbuild check query.json
    qbuild search autocomplete aa")]
struct Cli {
    /// Settings file (defaults to ./qbuild.toml, then the user config dir)
    #[arg(long, env = "QBUILD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a query tree
    Render {
        /// JSON tree file; the initial query value when omitted
        file: Option<PathBuf>,

        /// Also print the MongoDB filter
        #[arg(long)]
        mongo: bool,

        /// Also print the readable query string
        #[arg(long)]
        query_string: bool,
    },
    /// List the configured fields
    Fields,
    /// Check a query tree and report every repair
    Check {
        /// JSON tree file
        file: PathBuf,
    },
    /// Search the async list of a field
    Search {
        /// Field key
        field: String,

        /// Case-insensitive search text
        term: Option<String>,

        /// Offset of the first result
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qbuild=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => CliSettings::from_path(path)?,
        None => CliSettings::load()?,
    };
    let config = Arc::new(demo_config()?);

    match cli.command {
        Some(Commands::Render {
            file,
            mongo,
            query_string,
        }) => {
            let file = file.or_else(|| settings.tree.clone());
            render(
                &config,
                file.as_deref(),
                mongo || settings.show_mongo,
                query_string || settings.show_query_string,
            )
        }
        Some(Commands::Fields) => {
            show_fields(&config);
            Ok(())
        }
        Some(Commands::Check { file }) => check(&config, &file),
        Some(Commands::Search {
            field,
            term,
            offset,
        }) => search(&config, &settings, &field, term.as_deref(), offset).await,
        None => render(
            &config,
            settings.tree.as_deref(),
            settings.show_mongo,
            settings.show_query_string,
        ),
    }
}

fn read_tree(path: &Path) -> Result<QueryTree> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(QueryTree::from_json_str(&json)?)
}

fn render(config: &Arc<Config>, file: Option<&Path>, mongo: bool, text: bool) -> Result<()> {
    let initial = match file {
        Some(path) => get_tree(&read_tree(path)?),
        None => initial_query_value(),
    };

    let builder = QueryBuilder::new(config.clone(), initial);
    for issue in builder.load_issues() {
        println!("{} {}", "!".yellow(), issue);
    }

    let rendered = builder.render();
    println!("{}", "Query Builder".cyan().bold());
    println!(
        "{} {}",
        "SQL where:".green().bold(),
        serde_json::to_string(&rendered.sql_where)?
    );
    println!(
        "{} {}",
        "JsonLogic:".green().bold(),
        serde_json::to_string(&rendered.json_logic)?
    );

    if mongo {
        let filter = mongodb_format(builder.tree(), builder.config());
        println!("{} {}", "MongoDb query:".green().bold(), serde_json::to_string(&filter)?);
    }
    if text {
        let readable = query_string(builder.tree(), builder.config(), true);
        println!("{} {}", "Query string:".green().bold(), serde_json::to_string(&readable)?);
    }
    Ok(())
}

fn show_fields(config: &Config) {
    println!("{}", "Fields:".cyan().bold());
    for (key, field) in config.fields() {
        println!(
            "  {:14} {:16} {}",
            key.yellow(),
            field.label,
            field.field_type.to_string().dimmed()
        );
        println!("  {:14} {}", "", config.operators_for_field(key).join(", ").dimmed());
    }
}

fn check(config: &Config, file: &Path) -> Result<()> {
    let tree = read_tree(file)?;
    let (_, issues) = check_tree(&tree, config);
    if issues.is_empty() {
        println!("{} {} is valid", "✓".green(), file.display());
        return Ok(());
    }

    for issue in &issues {
        println!("{} {}", "✗".red(), issue);
    }
    println!();
    println!("{} issue(s) found", issues.len().to_string().cyan());
    std::process::exit(1);
}

async fn search(
    config: &Config,
    settings: &CliSettings,
    field: &str,
    term: Option<&str>,
    offset: usize,
) -> Result<()> {
    let def = config
        .field(field)
        .ok_or_else(|| QbError::UnknownField(field.to_string()))?;

    let mut fetch: SimulatedFetch = def
        .field_settings
        .async_fetch
        .clone()
        .with_context(|| format!("field '{field}' has no async list"))?;
    if let Some(page_size) = settings.page_size {
        fetch = fetch.with_page_size(page_size);
    }
    if let Some(delay) = settings.fetch_delay() {
        fetch = fetch.with_delay(delay);
    }

    let page = fetch.fetch(term, offset).await;
    if page.values.is_empty() {
        println!("{}", "(no results)".dimmed());
    }
    for item in &page.values {
        println!("  {:8} {}", item.value.yellow(), item.title);
    }
    if page.has_more {
        println!(
            "{} more with --offset {}",
            "…".dimmed(),
            offset + page.values.len()
        );
    }
    Ok(())
}
