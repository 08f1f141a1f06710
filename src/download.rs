//! Bulk download of every verse the clock can show, for offline use.
//!
//! The batch runs on its own thread. The host polls [`DownloadTask::poll`] for
//! [`DownloadEvent`]s between renders and collects the [`DownloadReport`] with
//! [`DownloadTask::join`]. A failing translation never stops the others.
//!
//! Progress is mirrored to `<cacheDir>/download_status.json` so it survives a
//! restart and can be shown without a running task.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::catalog::Catalogs;
use crate::error::VerseError;
use crate::provider::cache::CacheEntries;
use crate::provider::{VerseCache, VerseTextProvider};
use crate::resolver::{candidate_books, resolve_in, BookSelection, ClockConvention, Reference, TimeSample};
use crate::translation::Translation;

pub const STATUS_FILE: &str = "download_status.json";

/// References to fetch, per translation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    jobs: Vec<(Translation, Vec<Reference>)>,
}

impl DownloadPlan {
    /// Every reference any minute of the day resolves to, for each translation
    pub fn new(
        translations: &[Translation],
        selection: &BookSelection,
        catalogs: &Catalogs,
        convention: ClockConvention,
    ) -> Result<Self, VerseError> {
        let mut seen = BTreeSet::new();
        let mut jobs = Vec::new();
        for &translation in translations {
            if !seen.insert(translation) {
                continue;
            }
            let catalog = catalogs.for_translation(translation);
            // a matching clock only shows books that have the hour's chapter
            let every_day = match selection {
                BookSelection::Matching => None,
                _ => Some(selection.reachable_books(catalog)?),
            };
            let mut references = BTreeSet::new();
            for hour in 0..24 {
                for minute in 0..60 {
                    let time = TimeSample::new(hour, minute, convention)?;
                    let books = match &every_day {
                        Some(books) => books.clone(),
                        None => candidate_books(selection, time, 0, catalog)?,
                    };
                    for book in books {
                        references.insert(resolve_in(time, book)?);
                    }
                }
            }
            jobs.push((translation, references.into_iter().collect()));
        }
        Ok(Self { jobs })
    }

    pub fn translations(&self) -> impl Iterator<Item = Translation> + '_ {
        self.jobs.iter().map(|(translation, _)| *translation)
    }

    pub fn references(&self, translation: Translation) -> &[Reference] {
        self.jobs
            .iter()
            .find(|(t, _)| *t == translation)
            .map(|(_, refs)| refs.as_slice())
            .unwrap_or(&[])
    }

    /// Number of verses over all translations
    pub fn total(&self) -> usize {
        self.jobs.iter().map(|(_, refs)| refs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    /// Retries of a verse after a network error
    pub max_retries: u32,
    /// First retry delay, doubled for every further retry
    pub base_backoff: Duration,
    /// Verses between cache flushes and status updates
    pub checkpoint_every: usize,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
            checkpoint_every: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Started {
        translations: Vec<Translation>,
        total: usize,
    },
    Progress {
        translation: Translation,
        done: usize,
        total: usize,
        percent: u8,
    },
    TranslationDone(TranslationOutcome),
    TranslationFailed {
        translation: Translation,
        error: VerseError,
    },
    Finished {
        completed: usize,
        failed: usize,
    },
}

/// What happened to one translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub translation: Translation,
    /// Verses fetched from the provider
    pub fetched: usize,
    /// Verses that were already cached
    pub skipped: usize,
    /// Verses the provider has no text for
    pub missing: usize,
    pub error: Option<VerseError>,
}

impl TranslationOutcome {
    fn new(translation: Translation) -> Self {
        Self {
            translation,
            fetched: 0,
            skipped: 0,
            missing: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub outcomes: Vec<TranslationOutcome>,
}

impl DownloadReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.error.is_none())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TranslationOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    NotStarted,
    Downloading,
    Completed,
    Error,
}

/// Contents of the status file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStatus {
    pub status: StatusKind,
    pub progress: u8,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Local>>,
}

impl DownloadStatus {
    pub fn new(status: StatusKind, progress: u8, message: impl Into<String>) -> Self {
        Self {
            status,
            progress,
            message: message.into(),
            timestamp: Some(Local::now()),
        }
    }

    pub fn path(cache_dir: &Path) -> PathBuf {
        cache_dir.join(STATUS_FILE)
    }

    /// Last written status, `not_started` when there is none
    pub fn load(cache_dir: &Path) -> Self {
        fs::read_to_string(Self::path(cache_dir))
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or(Self {
                status: StatusKind::NotStarted,
                progress: 0,
                message: String::new(),
                timestamp: None,
            })
    }

    pub fn save(&self, cache_dir: &Path) -> Result<()> {
        let path = Self::path(cache_dir);
        let text = serde_json::to_string(self)?;
        fs::write(&path, text)
            .with_context(|| format!("Error saving download status {}", path.display()))
    }
}

fn set_status(cache: &VerseCache, status: DownloadStatus) {
    if let Err(e) = status.save(cache.dir()) {
        error!("{:#}", e);
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        (done * 100 / total).min(100) as u8
    }
}

/// Fetch one verse, retrying network errors with exponential backoff
pub fn fetch_with_retry<P: VerseTextProvider + ?Sized>(
    provider: &mut P,
    reference: &Reference,
    translation: Translation,
    options: &DownloadOptions,
) -> Result<String, VerseError> {
    let mut attempt = 0;
    loop {
        match provider.fetch(reference, translation) {
            Err(e) if e.is_transient() && attempt < options.max_retries => {
                let delay = options.base_backoff * 2u32.pow(attempt);
                warn!(
                    "{} ({}): {}, retry {} in {:?}",
                    reference,
                    translation,
                    e,
                    attempt + 1,
                    delay
                );
                thread::sleep(delay);
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn flush(cache: &VerseCache, translation: Translation, pending: &mut CacheEntries) {
    if pending.is_empty() {
        return;
    }
    if let Err(e) = cache.store_many(translation, std::mem::take(pending)) {
        error!("Could not save downloaded {} verses: {:#}", translation, e);
    }
}

/// Run the whole batch on the current thread, reporting through `emit`
pub fn run_download<P: VerseTextProvider + ?Sized>(
    plan: &DownloadPlan,
    provider: &mut P,
    cache: &VerseCache,
    options: &DownloadOptions,
    mut emit: impl FnMut(DownloadEvent),
) -> DownloadReport {
    let total = plan.total();
    let translations: Vec<Translation> = plan.translations().collect();
    info!(
        "Starting bulk download of {} verses for {:?}",
        total, translations
    );
    set_status(
        cache,
        DownloadStatus::new(StatusKind::Downloading, 0, "Starting download..."),
    );
    emit(DownloadEvent::Started {
        translations: translations.clone(),
        total,
    });

    let checkpoint = options.checkpoint_every.max(1);
    let mut done = 0;
    let mut report = DownloadReport::default();

    for translation in translations {
        info!("Downloading {}...", translation);
        let cached = cache.load(translation);
        let mut outcome = TranslationOutcome::new(translation);
        let mut pending = CacheEntries::new();
        let references = plan.references(translation);

        for (index, reference) in references.iter().enumerate() {
            let key = reference.cache_key();
            if cached.get(&key).is_some_and(|text| !text.is_empty()) {
                outcome.skipped += 1;
            } else {
                match fetch_with_retry(provider, reference, translation, options) {
                    Ok(text) => {
                        pending.insert(key, text);
                        outcome.fetched += 1;
                    }
                    Err(VerseError::NotFound(what)) => {
                        warn!("No text for {}", what);
                        outcome.missing += 1;
                    }
                    Err(e) => {
                        error!("Giving up on {} at {}: {}", translation, reference, e);
                        done += references.len() - index;
                        outcome.error = Some(e);
                        break;
                    }
                }
            }

            done += 1;
            if done % checkpoint == 0 {
                flush(cache, translation, &mut pending);
                let progress = percent(done, total);
                info!("Progress: {}%", progress);
                set_status(
                    cache,
                    DownloadStatus::new(
                        StatusKind::Downloading,
                        progress,
                        format!("{}: Downloaded {}/{}", translation, done, total),
                    ),
                );
                emit(DownloadEvent::Progress {
                    translation,
                    done,
                    total,
                    percent: progress,
                });
            }
        }
        flush(cache, translation, &mut pending);

        match &outcome.error {
            Some(e) => emit(DownloadEvent::TranslationFailed {
                translation,
                error: e.clone(),
            }),
            None => {
                info!(
                    "{} done: {} fetched, {} already cached, {} missing",
                    translation, outcome.fetched, outcome.skipped, outcome.missing
                );
                emit(DownloadEvent::TranslationDone(outcome.clone()));
            }
        }
        report.outcomes.push(outcome);
    }

    let failed: Vec<String> = report
        .failed()
        .map(|o| format!("{} ({})", o.translation, o.error.as_ref().map(ToString::to_string).unwrap_or_default()))
        .collect();
    let completed = report.outcomes.len() - failed.len();
    if failed.is_empty() {
        info!("Download completed! Processed {} verses", done);
        set_status(
            cache,
            DownloadStatus::new(
                StatusKind::Completed,
                100,
                format!("Downloaded all verses for {} translation(s)!", completed),
            ),
        );
    } else {
        set_status(
            cache,
            DownloadStatus::new(
                StatusKind::Error,
                percent(done, total),
                format!("Error: {}", failed.join(", ")),
            ),
        );
    }
    emit(DownloadEvent::Finished {
        completed,
        failed: failed.len(),
    });
    report
}

/// Download batch running on a worker thread
pub struct DownloadTask {
    events: Receiver<DownloadEvent>,
    handle: JoinHandle<DownloadReport>,
}

impl DownloadTask {
    pub fn spawn<P>(
        plan: DownloadPlan,
        mut provider: P,
        cache: VerseCache,
        options: DownloadOptions,
    ) -> Result<Self>
    where
        P: VerseTextProvider + Send + 'static,
    {
        let (sender, events) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("verse-download".into())
            .spawn(move || {
                run_download(&plan, &mut provider, &cache, &options, |event| {
                    // the host may stop listening, the batch still finishes
                    let _ = sender.send(event);
                })
            })
            .context("Failed to start download thread")?;
        Ok(Self { events, handle })
    }

    /// Events since the last poll, never blocks
    pub fn poll(&self) -> Vec<DownloadEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the batch to end
    pub fn join(self) -> Result<DownloadReport> {
        self.handle
            .join()
            .map_err(|_| anyhow!("download thread panicked"))
    }
}
