use crate::config::Config;
use crate::error::{QryError, Result};
use crate::output_formats::OutputFormat;
use crate::query::{DateRange, Query, SearchMode, SortBy};
use crate::search::algorithms::SearchAlgorithm;
use crate::search::{EngineConfig, Strategy};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Find local files by name, content, type, size and date", long_about = None)]
pub struct Cli {
    /// Search text; `a or b` matches either term
    pub query: Vec<String>,

    /// Root to search (repeatable)
    #[clap(short = 'p', long = "path", value_parser, default_value = ".")]
    pub paths: Vec<PathBuf>,

    #[clap(short, long, value_enum)]
    pub mode: Option<SearchMode>,

    /// Accepted extensions, e.g. `-t py,md`
    #[clap(short = 't', long = "type", value_parser, value_delimiter = ',')]
    pub types: Vec<String>,

    /// Only files modified within the last N days
    #[clap(short = 'd', long, value_parser)]
    pub last_days: Option<u32>,

    #[clap(short, long, value_parser)]
    pub limit: Option<usize>,

    /// 0 searches only the roots themselves
    #[clap(long, value_parser)]
    pub depth: Option<usize>,

    /// Directory name to skip, added to the defaults (repeatable)
    #[clap(long, value_parser)]
    pub exclude: Vec<String>,

    /// Descend into every directory, including the default exclusions
    #[clap(long, value_parser, default_value_t = false)]
    pub no_exclude: bool,

    /// Minimum size, e.g. 100, 1k, 10KB, 5MB
    #[clap(long, value_parser = parse_size)]
    pub min_size: Option<u64>,

    #[clap(long, value_parser = parse_size)]
    pub max_size: Option<u64>,

    #[clap(long, value_parser, default_value_t = false)]
    pub regex: bool,

    #[clap(long, value_parser, default_value_t = false)]
    pub case_sensitive: bool,

    #[clap(long, value_enum)]
    pub sort: Option<SortBy>,

    #[clap(long, value_enum)]
    pub strategy: Option<Strategy>,

    #[clap(long, value_parser)]
    pub workers: Option<usize>,

    /// Single-pattern content algorithm
    #[clap(long, value_enum)]
    pub algorithm: Option<SearchAlgorithm>,

    /// Show the first matching line of each result
    #[clap(long, value_parser, default_value_t = false)]
    pub snippet: bool,

    #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[clap(long, value_parser)]
    pub config: Option<PathBuf>,

    #[clap(long, value_parser, default_value_t = false)]
    pub verbose: bool,

    #[clap(long, value_parser)]
    pub log: Option<PathBuf>,

    /// Print engine counters to stderr when done
    #[clap(long, value_parser, default_value_t = false)]
    pub metrics: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion scripts
    Completions {
        #[clap(value_enum)]
        shell: Shell,
    },
    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,
        /// Replace an existing file
        #[clap(long)]
        force: bool,
    },
}

impl Cli {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }

    /// Flags override the configuration file, which overrides built-in defaults.
    pub fn build_query(&self, config: &Config) -> Query {
        let search = &config.search;
        let mut query = Query::new(self.query_text())
            .mode(self.mode.unwrap_or(search.default_mode))
            .max_results(self.limit.unwrap_or(search.max_results))
            .regex(self.regex)
            .case_sensitive(self.case_sensitive || search.case_sensitive)
            .file_types(&self.types);

        query = if self.no_exclude {
            query.exclude_dirs(Vec::<String>::new())
        } else {
            query.exclude_dirs(search.exclude_dirs.iter().chain(&self.exclude).cloned())
        };

        if let Some(days) = self.last_days {
            query = query.date_range(DateRange::last_days(days));
        }
        if let Some(depth) = self.depth {
            query = query.max_depth(depth);
        }
        if let Some(min) = self.min_size {
            query = query.min_size(min);
        }
        if let Some(max) = self.max_size {
            query = query.max_size(max);
        }
        if let Some(sort) = self.sort {
            query = query.sort_by(sort);
        }
        query
    }

    pub fn build_engine_config(&self, config: &Config) -> EngineConfig {
        let mut engine = config.engine.to_engine_config();
        if let Some(strategy) = self.strategy {
            engine.strategy = strategy;
        }
        if let Some(workers) = self.workers {
            engine.workers = workers;
        }
        if let Some(algorithm) = self.algorithm {
            engine.algorithm = algorithm;
        }
        engine
    }
}

/// Parses `100`, `100b`, `1k`, `10KB`, `5MB`, `1G`, `2gb`. Units are binary multiples.
pub fn parse_size(text: &str) -> Result<u64> {
    let lowered = text.trim().to_ascii_lowercase();
    let split = lowered
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lowered.len());
    let (number, unit) = lowered.split_at(split);
    let invalid = || QryError::InvalidSize(text.to_string());

    let value: u64 = number.parse().map_err(|_| invalid())?;
    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" => 1 << 10,
        "m" | "mb" => 1 << 20,
        "g" | "gb" => 1 << 30,
        "t" | "tb" => 1 << 40,
        _ => return Err(invalid()),
    };
    value.checked_mul(multiplier).ok_or_else(invalid)
}
