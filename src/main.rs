//! nlplan binary: print the natural-language plan for a SQL query
//!
//! Usage: nlplan [OPTIONS] [QUERY]
//!
//! The query is read from the argument, from `--file`, or from stdin.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Bad input or configuration
//!   2 - Query could not be planned

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nlplan::{NlPlanner, PlanText, PlannerConfig, SqlDialect};

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translate a SQL query into numbered natural-language steps")]
struct Cli {
    /// SQL query; read from --file or stdin when absent
    query: Option<String>,

    /// Read the query from a file
    #[arg(long, short, conflicts_with = "query")]
    file: Option<PathBuf>,

    /// Preserve identifier case (true) or fold to lowercase (false)
    #[arg(long)]
    case_sensitive: Option<bool>,

    /// Single-quote every identifier
    #[arg(long)]
    quote_identifiers: bool,

    /// SQL dialect: generic, sqlite, mysql, postgres
    #[arg(long)]
    dialect: Option<SqlDialect>,

    /// Keep single-use checks as separate steps
    #[arg(long)]
    no_simplify: bool,

    /// Destination named in the final step
    #[arg(long)]
    sink: Option<String>,

    /// Step placed before the query steps (repeatable)
    #[arg(long)]
    prologue: Vec<String>,

    /// Instruction inserted after every step
    #[arg(long)]
    intersperse: Option<String>,

    /// Number the first step offset + 1
    #[arg(long, default_value_t = 0, env = "NLPLAN_OFFSET")]
    offset: usize,

    /// Prefix for every output line
    #[arg(long, default_value = "", env = "NLPLAN_PREFIX")]
    prefix: String,
}

impl Cli {
    /// Flags override values read from the environment
    fn apply(&self, mut config: PlannerConfig) -> PlannerConfig {
        if let Some(case_sensitive) = self.case_sensitive {
            config.case_sensitive = case_sensitive;
        }
        if self.quote_identifiers {
            config.quote_identifiers = true;
        }
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        if self.no_simplify {
            config.simplify = false;
        }
        if let Some(sink) = &self.sink {
            config.output_sink = sink.clone();
        }
        config.prologue.extend(self.prologue.iter().cloned());
        if let Some(step) = &self.intersperse {
            config.intersperse = Some(step.clone());
        }
        config
    }

    fn read_query(&self) -> io::Result<String> {
        if let Some(query) = &self.query {
            return Ok(query.clone());
        }
        if let Some(path) = &self.file {
            return fs::read_to_string(path);
        }
        let mut query = String::new();
        io::stdin().read_to_string(&mut query)?;
        Ok(query)
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match PlannerConfig::from_env() {
        Ok(config) => cli.apply(config),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let query = match cli.read_query() {
        Ok(query) => query,
        Err(e) => {
            eprintln!("ERROR: Failed to read query: {}", e);
            std::process::exit(1);
        }
    };

    tracing::debug!(?config, "configuration");

    let planner = NlPlanner::new(config);
    let rendered = planner
        .plan(&query)
        .and_then(|plan| PlanText::format(&plan, &cli.prefix, cli.offset));

    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(2);
        }
    }
}
