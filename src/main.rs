use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use greylit::backend::SearchClient;
use greylit::config::CONFIG;
use greylit::data_models::{QueryTerms, SearchSpec, parse_site_list};
use greylit::export::{export_run, export_table};
use greylit::orchestrator::{Orchestrator, RunResult};

#[derive(Parser)]
#[command(name = "greylit", version, about = "Search for grey literature and export the hits as CSV")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape search-engine results pages for one query across all sites
    Html {
        #[command(flatten)]
        search: SearchArgs,

        /// Number of results pages to fetch
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,

        #[arg(long, default_value = "google_search_results.csv")]
        out: PathBuf,
    },
    /// Query the custom search API per site, escalating through up to three tiers
    Api {
        #[command(flatten)]
        search: SearchArgs,

        /// JSON search spec with fallback tiers; replaces the search flags
        #[arg(long)]
        spec_file: Option<PathBuf>,

        #[arg(long, default_value = "greylit_results")]
        out_dir: PathBuf,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// All these words
    #[arg(long, default_value = "")]
    all_words: String,

    /// This exact word or phrase
    #[arg(long, default_value = "")]
    exact_phrase: String,

    /// Any of these words
    #[arg(long, default_value = "")]
    any_words: String,

    /// None of these words
    #[arg(long, default_value = "")]
    exclude_words: String,

    /// Date range start (YYYY-MM-DD)
    #[arg(long)]
    date_start: Option<NaiveDate>,

    /// Date range end (YYYY-MM-DD)
    #[arg(long)]
    date_end: Option<NaiveDate>,

    /// Site to search, may be repeated
    #[arg(long)]
    site: Vec<String>,

    /// File with one site per line
    #[arg(long)]
    sites_file: Option<PathBuf>,
}

impl SearchArgs {
    fn into_spec(self) -> Result<SearchSpec> {
        let mut target_sites = self.site;
        if let Some(path) = &self.sites_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read sites file {}", path.display()))?;
            target_sites.extend(parse_site_list(&text));
        }

        Ok(SearchSpec {
            terms: QueryTerms {
                include_all_words: self.all_words,
                exact_phrase: self.exact_phrase,
                any_words: self.any_words,
                exclude_words: self.exclude_words,
            },
            fallback_tiers: Vec::new(),
            date_range_start: self.date_start,
            date_range_end: self.date_end,
            target_sites,
        })
    }
}

fn load_spec_file(path: &Path) -> Result<SearchSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid spec file {}", path.display()))
}

fn report(run: &RunResult) {
    for table in &run.tables {
        match &table.failure {
            Some(failure) => println!("{}: {} results ({failure})", table.name, table.records.len()),
            None => println!("{}: {} results", table.name, table.records.len()),
        }
    }
    println!("total: {} results", run.total_records());
    if run.rate_limit_warning() {
        println!("warning: search limit exceeded, some sites are incomplete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = &*CONFIG;
    let client = SearchClient::new(config)?;
    let orchestrator = Orchestrator::new(&client, config);

    match cli.command {
        Command::Html { search, pages, out } => {
            let spec = search.into_spec()?;
            tracing::info!(pages, sites = spec.sites().len(), "starting html run");
            let run = orchestrator.run_html(&spec, pages).await;
            report(&run);
            for table in run.tables.iter().filter(|t| !t.records.is_empty()) {
                export_table(table, &out)?;
                println!("wrote {}", out.display());
            }
        }
        Command::Api {
            search,
            spec_file,
            out_dir,
        } => {
            if client.credentials().is_empty() {
                bail!("no API credentials configured, set GREYLIT_API_KEY_1 and GREYLIT_API_CX_1");
            }
            let spec = match spec_file {
                Some(path) => load_spec_file(&path)?,
                None => search.into_spec()?,
            };
            if spec.sites().is_empty() {
                bail!("api mode needs at least one target site");
            }

            tracing::info!(sites = spec.sites().len(), tiers = spec.tiers().len(), "starting api run");
            let run = orchestrator.run_api(&spec).await;
            report(&run);
            for path in export_run(&run, &out_dir)? {
                println!("wrote {}", path.display());
            }
        }
    }
    Ok(())
}
