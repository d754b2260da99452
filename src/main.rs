use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use dirsync::config::{DEFAULT_CHECK_INPUT, DEFAULT_SYNC_INPUT};
use dirsync::db::Database;
use dirsync::logging::configure_logging;
use dirsync::workers::{run_check, run_search, run_sync, RunSummary};
use dirsync::AppConfig;

#[derive(Parser)]
#[clap(
    name = "dirsync",
    version,
    about = "Reconcile employee directory profiles with the identity store"
)]
struct Cli {
    /// Path of the SQLite identity store
    #[clap(short = 'N', long = "database", global = true)]
    database: Option<String>,

    /// Number of concurrent workers
    #[clap(short, long, global = true)]
    workers: Option<usize>,

    /// Verbose logging
    #[clap(short = 'D', long, global = true)]
    debug: bool,

    /// Base URL that profile tokens are appended to
    #[clap(long, global = true)]
    base_url: Option<String>,

    /// URL of the directory search form
    #[clap(long, global = true)]
    search_url: Option<String>,

    /// HTML-to-table converter command line
    #[clap(long, global = true)]
    converter: Option<String>,

    /// Directory for scratch HTML and table files
    #[clap(short = 'd', long, global = true)]
    work_dir: Option<PathBuf>,

    /// Report records that share a name instead of picking the first one
    #[clap(long, global = true)]
    strict_ambiguity: bool,

    /// Also write the run summary as JSON to this path
    #[clap(long, global = true)]
    summary: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every profile in a work list and update the matching records
    Sync {
        /// Work list, one "Last, First; <token>" per line
        #[clap(short = 'f', long = "file", default_value = DEFAULT_SYNC_INPUT)]
        file: PathBuf,

        /// Skip input lines until one contains this text
        #[clap(short = 's', long = "skip-to")]
        skip_to: Option<String>,
    },

    /// Compare a CSV of names and known email addresses with the store
    Check {
        /// CSV with "Last, First" and email columns
        #[clap(short = 'f', long = "file", default_value = DEFAULT_CHECK_INPUT)]
        file: PathBuf,

        /// Skip input rows until one contains this text
        #[clap(short = 's', long = "skip-to")]
        skip_to: Option<String>,
    },

    /// Build a work list from the directory's last-name search
    Search {
        /// Where to write the work list
        #[clap(short, long, default_value = DEFAULT_SYNC_INPUT)]
        output: PathBuf,
    },
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.debug |= self.debug;
        if let Some(base_url) = &self.base_url {
            config.profile_base_url = base_url.clone();
            if self.search_url.is_none() {
                config.search_url = format!("{}SearchForm?OpenForm", with_slash(base_url));
            }
        }
        if let Some(search_url) = &self.search_url {
            config.search_url = search_url.clone();
        }
        if let Some(converter) = &self.converter {
            config.set_converter_command(converter);
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if self.strict_ambiguity {
            config.pick_first_on_ambiguous = false;
        }
        match &self.command {
            Commands::Sync { file, skip_to } | Commands::Check { file, skip_to } => {
                config.input_path = file.clone();
                config.resume_marker = skip_to.clone();
            }
            Commands::Search { .. } => {}
        }
    }
}

fn with_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    cli.apply(&mut config);
    config.validate()?;

    configure_logging(config.debug);
    info!(
        "dirsync {} (built {}, commit {})",
        env!("CARGO_PKG_VERSION"),
        env!("DIRSYNC_BUILD_TIMESTAMP"),
        option_env!("DIRSYNC_GIT_HASH").unwrap_or("unknown")
    );

    let result = match &cli.command {
        Commands::Sync { .. } => {
            let db = open_store(&config).await?;
            run_sync(&config, db).await
        }
        Commands::Check { .. } => {
            let db = open_store(&config).await?;
            run_check(&config, db).await
        }
        Commands::Search { output } => run_search(&config, output).await,
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            error!("Run aborted: {}", err);
            return Err(err.into());
        }
    };

    print_summary(&summary, cli.summary.as_ref())?;
    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<Database> {
    let db = Database::new(&config.database_path)
        .await
        .with_context(|| format!("Failed to open identity store {}", config.database_path))?;
    db.ping().await.context("Identity store is not responding")?;
    info!("Identity store holds {} people", db.count_people().await?);
    Ok(db)
}

fn print_summary(summary: &RunSummary, json_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", summary);
    if let Some(path) = json_path {
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    }
    Ok(())
}
