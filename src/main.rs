use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Timelike};
use clap::{ArgAction, Parser, Subcommand};
use simplelog::{Config, LevelFilter, SimpleLogger};
use std::path::PathBuf;
use std::time::Duration;

use verseclock::app::{download_translations, log_download_event, Session};
use verseclock::catalog::Catalogs;
use verseclock::clock;
use verseclock::config::{ConfigStore, JsonConfigStore, Settings};
use verseclock::download::{DownloadPlan, DownloadStatus, DownloadTask};
use verseclock::provider::{BollsClient, VerseCache};
use verseclock::resolver::{candidate_books, resolve, resolve_in};
use verseclock::Translation;

/// Show a Bible verse for the current time: the hour picks the chapter, the
/// minute picks the verse.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = "verseclock.json")]
    config: PathBuf,

    /// More logging, repeat for trace output
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the reference for a time without fetching any text
    Resolve {
        /// Time to resolve instead of now, HH:MM
        #[arg(long)]
        at: Option<String>,
        /// Book to use instead of the configured selection
        #[arg(long)]
        book: Option<String>,
    },
    /// Render one frame
    Render {
        /// Time to render instead of now, HH:MM
        #[arg(long)]
        at: Option<String>,
        #[arg(long, short, default_value = "verse.png")]
        output: PathBuf,
    },
    /// Render a frame at the start of every minute
    Run {
        #[arg(long, short, default_value = "verse.png")]
        output: PathBuf,
    },
    /// Download verse text for offline use
    Download {
        /// Translation to download, repeatable; defaults to the configured list
        #[arg(long, short)]
        translation: Vec<Translation>,
    },
    /// Show or edit the settings
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List the books of the active translation
    Books,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the settings as JSON
    Show,
    /// Change one setting, e.g. `set layoutStyle center`
    Set { key: String, value: String },
    /// Print the settings file location
    Path,
}

fn log_level(cli: &Cli) -> LevelFilter {
    match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Current time of the configured zone, moved to `at` when given
fn display_time(settings: &Settings, at: Option<&str>) -> Result<DateTime<FixedOffset>> {
    let now = clock::current_time(settings.device.timezone, settings.dst_override);
    match at {
        Some(at) => Ok(clock::with_hh_mm(now, at)?),
        None => Ok(now),
    }
}

fn resolve_command(settings: &Settings, at: Option<&str>, book: Option<&str>) -> Result<()> {
    let catalogs = Catalogs::load(settings.catalog_dir.as_deref())?;
    let catalog = catalogs.for_translation(settings.translation);
    let now = display_time(settings, at)?;
    let time = clock::sample(&now, settings.clock_convention)?;

    if let Some(book) = book {
        println!("{}", resolve(time, book, catalog)?);
        return Ok(());
    }
    let books = candidate_books(&settings.book_selection(), time, clock::hourly_seed(&now), catalog)?;
    if books.is_empty() {
        println!("No book has chapter {}", time.raw_chapter());
    }
    for book in books {
        println!("{}", resolve_in(time, book)?);
    }
    Ok(())
}

fn render_command(store: JsonConfigStore, at: Option<String>, output: PathBuf) -> Result<()> {
    if let Some(at) = &at {
        clock::parse_hh_mm(at, Default::default())?;
    }
    let mut session = Session::new(store, BollsClient::new, output);
    let report = session.tick_with(|settings| {
        let now = clock::current_time(settings.device.timezone, settings.dst_override);
        at.as_deref()
            .and_then(|at| clock::with_hh_mm(now, at).ok())
            .unwrap_or(now)
    })?;
    println!("{} ({})", report.verse.reference, report.translation);
    println!("{}", report.verse.text);
    if session.is_downloading() {
        log::info!("Waiting for the download to finish");
        session.finish_download()?;
    }
    Ok(())
}

fn run_command(store: JsonConfigStore, output: PathBuf) -> Result<()> {
    let mut session = Session::new(store, BollsClient::new, output);
    log::info!("Writing a frame every minute to {}", session.output().display());
    loop {
        if let Err(e) = session.tick() {
            log::error!("Refresh failed: {:#}", e);
        }
        let second = chrono::Local::now().second().min(59);
        std::thread::sleep(Duration::from_secs(u64::from(60 - second)));
    }
}

fn download_command(settings: &Settings, translations: Vec<Translation>) -> Result<()> {
    let translations = if translations.is_empty() {
        download_translations(settings)
    } else {
        translations
    };
    let catalogs = Catalogs::load(settings.catalog_dir.as_deref())?;
    let plan = DownloadPlan::new(
        &translations,
        &settings.book_selection(),
        &catalogs,
        settings.clock_convention,
    )?;
    let cache = VerseCache::new(&settings.cache_dir)?;
    let status_dir = cache.dir().to_path_buf();

    let task = DownloadTask::spawn(plan, BollsClient::new()?, cache, Default::default())?;
    while !task.is_finished() {
        task.poll().iter().for_each(log_download_event);
        std::thread::sleep(Duration::from_millis(250));
    }
    task.poll().iter().for_each(log_download_event);
    let report = task.join()?;

    let status = DownloadStatus::load(&status_dir);
    println!("{}", status.message);
    let failed: Vec<String> = report.failed().map(|o| o.translation.to_string()).collect();
    if !failed.is_empty() {
        bail!("Download incomplete for {}", failed.join(", "));
    }
    Ok(())
}

fn config_command(store: &JsonConfigStore, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let settings = store.load()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigCommand::Set { key, value } => {
            let mut settings = store.load()?;
            settings
                .set(&key, &value)
                .with_context(|| format!("Cannot set {}", key))?;
            store.save(&settings)?;
        }
        ConfigCommand::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

fn books_command(settings: &Settings) -> Result<()> {
    let catalogs = Catalogs::load(settings.catalog_dir.as_deref())?;
    for book in catalogs.for_translation(settings.translation).books() {
        println!("{:>2}  {:<16} {:>3} chapters", book.id, book.name, book.chapter_count());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::init(log_level(&cli), Config::default())?;

    let store = JsonConfigStore::new(&cli.config);
    match cli.command {
        Command::Resolve { at, book } => {
            resolve_command(&store.load()?, at.as_deref(), book.as_deref())
        }
        Command::Render { at, output } => render_command(store, at, output),
        Command::Run { output } => run_command(store, output),
        Command::Download { translation } => download_command(&store.load()?, translation),
        Command::Config(command) => config_command(&store, command),
        Command::Books => books_command(&store.load()?),
    }
}
