use clap::{CommandFactory, Parser};
use colored::*;
use env_logger::{Builder, Env, Target};
use log::{info, warn};
use qry::cli::{Cli, Commands};
use qry::config::Config;
use qry::error::{QryError, Result as QryResult};
use qry::output_formats::{OutputFormat, OutputFormatter};
use qry::progress::TierProgressReporter;
use qry::search::{SearchEngine, Strategy};
use qry::CancellationToken;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Instant;

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;
const SNIPPET_CONTEXT_LINES: usize = 1;

fn main() -> QryResult<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    match &cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Some(Commands::InitConfig { path, force }) => {
            return init_config(path.as_deref(), *force);
        }
        None => {}
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Ignoring configuration: {e}");
            Config::default()
        }),
    };

    let query = cli.build_query(&config);
    let engine_config = cli.build_engine_config(&config);
    let tiered = engine_config.strategy != Strategy::Plain;
    info!("Searching {:?} for {:?}", cli.paths, query.text);

    let reporter = Arc::new(if tiered && cli.output == OutputFormat::Text {
        TierProgressReporter::new()
    } else {
        TierProgressReporter::hidden()
    });
    let engine = SearchEngine::new(engine_config)?.with_observer(reporter.clone());

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| QryError::Other(format!("failed to install Ctrl-C handler: {e}")))?;

    let start_time = Instant::now();
    let formatter = OutputFormatter::new(cli.output).with_snippet(cli.snippet);
    let mut stream = engine.search_streaming_with_cancel(&query, &cli.paths, cancel)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut collected = Vec::new();
    let mut count = 0usize;

    for mut result in stream.by_ref() {
        if cli.snippet {
            result.attach_snippet(&query.text, SNIPPET_CONTEXT_LINES, query.use_regex);
        }
        count += 1;
        if formatter.is_streaming() {
            writeln!(out, "{}", formatter.format_result(&result)?)?;
        } else {
            collected.push(result);
        }
    }

    let interrupted = stream.is_interrupted();
    if !formatter.is_streaming() {
        writeln!(
            out,
            "{}",
            formatter.format_json(&query.text, &collected, interrupted)?
        )?;
    }
    out.flush()?;

    let tiers = reporter.finish();
    let elapsed = start_time.elapsed();
    info!(
        "Search finished in {:.2?}: {count} results, {} tiers ({} deferred)",
        elapsed, tiers.tiers_done, tiers.tiers_deferred
    );

    if cli.output == OutputFormat::Text {
        if count == 0 {
            eprintln!("{}", "No files found".yellow());
        } else {
            eprintln!(
                "\n{} {} {} {:.2}s",
                "Found".green(),
                count,
                "files in".green(),
                elapsed.as_secs_f64()
            );
        }
    }

    if cli.metrics {
        eprintln!("{}", engine.metrics().gather()?);
    }

    if interrupted {
        eprintln!("{}", "Search interrupted".red().bold());
        process::exit(EXIT_INTERRUPTED);
    }
    Ok(())
}

fn init_config(path: Option<&Path>, force: bool) -> QryResult<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()
            .ok_or_else(|| QryError::Config("No user config directory found".to_string()))?,
    };
    if path.exists() && !force {
        return Err(QryError::Config(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }

    Config::default().save(&path)?;
    eprintln!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn setup_logging(cli: &Cli) -> QryResult<()> {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir)?;
            }
        }
        let log_file = fs::File::create(log_path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| QryError::Other(e.to_string()))?;
    Ok(())
}
