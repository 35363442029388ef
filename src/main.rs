//! showmyslskd CLI - import slskd uploads and run canned reports

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};
use showmyslskd::config::{self, AppConfig};
use showmyslskd::import::{CancelToken, DEFAULT_BATCH_SIZE, ImportEvent, Importer};
use showmyslskd::storage::{self, ReportStore};
use showmyslskd::ui::{self, Icons};
use showmyslskd::{DateRange, ReportEngine, ReportRequest, ReportTemplate};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "showmyslskd")]
#[command(version)]
#[command(about = "Upload statistics for slskd - import transfers and run canned reports")]
#[command(long_about = r#"
showmyslskd copies completed uploads from an slskd database into a local
reporting database and answers questions about them:
  • Who downloads the most files or data from you
  • Which artists are most popular
  • Who errors or cancels most often
  • How much you share per day

Example usage:
  showmyslskd import --source ~/slskd/data/transfers.db --target ~/uploads.db --save
  showmyslskd report top-artists --range 30d
  showmyslskd report data-by-day --search alice --chart
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import completed uploads from an slskd database
    Import {
        /// slskd database to read from (overrides the config)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Reporting database to write to (overrides the config)
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Accepted for compatibility; existing records are always kept
        #[arg(long)]
        overwrite: bool,

        /// Rows read from the source per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Remember the database paths in the config file
        #[arg(long)]
        save: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run one of the canned reports
    Report {
        /// Template name, title or number (see `templates`)
        template: ReportTemplate,

        /// Date range: all, 24h, 7d, 30d
        #[arg(short, long, default_value = "all")]
        range: DateRange,

        /// Username or artist to narrow the report to
        #[arg(short, long)]
        search: Option<String>,

        /// Also draw a bar chart
        #[arg(short, long)]
        chart: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Reporting database (overrides the config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List the available report templates
    Templates,

    /// List known usernames and artists
    Names {
        /// Reporting database (overrides the config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show statistics about the reporting database
    Stats {
        /// Reporting database (overrides the config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show or change the remembered database paths
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location and contents
    Show,
    /// Set one or both database paths
    Set {
        /// slskd database to read from
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Reporting database to write to
        #[arg(short, long)]
        target: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let mut app_config = config::load_config(Some(config_path.as_path()))?;

    match cli.command {
        Commands::Import { source, target, overwrite, batch_size, save, yes } => {
            if let Some(source) = source {
                app_config.input_db = Some(source.display().to_string());
            }
            if let Some(target) = target {
                app_config.output_db = Some(target.display().to_string());
            }

            let prompted = prompt_for_missing_paths(&mut app_config)?;
            if save || prompted {
                config::save_config(&config_path, &app_config)?;
                tracing::info!("Saved database paths to {}", config_path.display());
            }

            let importer = Importer::from_config(&app_config)?
                .overwrite(overwrite)
                .batch_size(batch_size);

            if !yes && console::Term::stdout().is_term() {
                let action = if overwrite {
                    "overwrite requested, existing records are kept and skipped"
                } else {
                    "adding new records"
                };
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Import {} into {} ({})?",
                        importer.source().display(),
                        importer.target().display(),
                        action
                    ))
                    .default(true)
                    .interact()?;
                if !confirmed {
                    ui::warn("Import aborted");
                    return Ok(());
                }
            }

            ui::header("Importing uploads");
            ui::status(Icons::INBOX, "Source", &importer.source().display().to_string());
            ui::status(Icons::DATABASE, "Target", &importer.target().display().to_string());

            let handle = importer.spawn()?;
            cancel_on_ctrl_c(handle.cancel_token());
            let progress = ui::ImportProgress::new();

            let mut outcome = None;
            for event in handle.events().iter() {
                match event {
                    ImportEvent::Progress(percent) => progress.set(percent),
                    ImportEvent::Finished(summary) => {
                        progress.finish_with_summary(&summary);
                        outcome = Some(Ok(summary));
                        break;
                    }
                    ImportEvent::Failed(e) => {
                        progress.abandon();
                        outcome = Some(Err(e));
                        break;
                    }
                }
            }
            handle.join()?;

            match outcome {
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    ui::error(&format!("Import failed, nothing from this run was kept: {}", e));
                    return Err(e.into());
                }
                None => anyhow::bail!("import worker stopped without reporting a result"),
            }
        }

        Commands::Report { template, range, search, chart, format, database } => {
            let Some(database) = output_database(database, &app_config) else {
                ui::warn("No output database configured. Please import data first.");
                return Ok(());
            };
            if !database.exists() {
                ui::warn(&format!("{} does not exist. Please import data first.", database.display()));
                return Ok(());
            }

            let store = ReportStore::open_read_only(&database)?;
            let mut request = ReportRequest::new(template).range(range);
            request.search = search;

            let table = match ReportEngine::new(&store).run(&request) {
                Ok(table) => table,
                Err(e) => {
                    ui::error(&format!("Query failed: {}", e));
                    return Err(e.into());
                }
            };

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&table)?);
                return Ok(());
            }

            ui::section(&table.title);
            ui::status(Icons::CALENDAR, "Range", range.label());
            if let Some(term) = request.search.as_deref().filter(|t| !t.trim().is_empty()) {
                ui::status(Icons::SEARCH, "Search", term.trim());
            }

            if table.is_empty() {
                println!("∅ No data available.");
            } else {
                println!("{}", ui::report_table(&table));
                if chart {
                    println!();
                    print!("{}", ui::bar_chart(&table.chart_points(), 40));
                }
            }
        }

        Commands::Templates => {
            ui::section("Report templates");
            for (index, template) in ReportTemplate::all().iter().enumerate() {
                println!("  {}. {:<16} {}", index + 1, template.as_str(), ui::dim(template.title()));
            }
        }

        Commands::Names { database } => {
            let database = output_database(database, &app_config);
            let names = storage::distinct_usernames_and_artists(database.as_deref())?;
            if names.is_empty() {
                println!("∅ No usernames or artists found.");
            }
            for name in names {
                println!("{}", name);
            }
        }

        Commands::Stats { database } => {
            let Some(database) = output_database(database, &app_config) else {
                ui::warn("No output database configured. Please import data first.");
                return Ok(());
            };
            if !database.exists() {
                ui::warn(&format!("{} does not exist. Please import data first.", database.display()));
                return Ok(());
            }
            let store = ReportStore::open_read_only(&database)?;
            let stats = store.stats()?;

            println!("{} Upload Statistics ({})", Icons::STATS, database.display());
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                ui::info("Config file", &config_path.display().to_string());
                ui::summary_row("input_db ", app_config.input_db.as_deref().unwrap_or("(not set)"));
                ui::summary_row("output_db", app_config.output_db.as_deref().unwrap_or("(not set)"));
            }
            ConfigAction::Set { source, target } => {
                if source.is_none() && target.is_none() {
                    anyhow::bail!("nothing to set: pass --source and/or --target");
                }
                if let Some(source) = source {
                    app_config.input_db = Some(source.display().to_string());
                }
                if let Some(target) = target {
                    app_config.output_db = Some(target.display().to_string());
                }
                config::save_config(&config_path, &app_config)?;
                ui::success(&format!("Saved {}", config_path.display()));
            }
        },
    }

    Ok(())
}

/// Reporting database from the flag, else from the config
fn output_database(flag: Option<PathBuf>, config: &AppConfig) -> Option<PathBuf> {
    flag.or_else(|| config.output_db().ok().map(Path::to_path_buf))
}

/// Ask for unset database paths on a terminal; returns whether anything was asked.
///
/// Without a terminal the missing path is reported as an error.
fn prompt_for_missing_paths(config: &mut AppConfig) -> anyhow::Result<bool> {
    if config.is_complete() {
        return Ok(false);
    }
    if !console::Term::stdout().is_term() {
        config.input_db()?;
        config.output_db()?;
        return Ok(false);
    }

    ui::info("Configuration required", "select the input and output database files");
    if config.input_db().is_err() {
        let input: String = Input::new().with_prompt("slskd database (input)").interact_text()?;
        config.input_db = Some(input);
    }
    if config.output_db().is_err() {
        let output: String = Input::new().with_prompt("Reporting database (output)").interact_text()?;
        config.output_db = Some(output);
    }
    Ok(true)
}

/// Cancel the import on Ctrl-C instead of killing the process mid-write
fn cancel_on_ctrl_c(token: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };
            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                ui::warn("Cancelling import, keeping records written so far...");
                token.cancel();
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Ctrl-C handling unavailable: {}", e);
    }
}
