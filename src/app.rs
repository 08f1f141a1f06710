//! One display refresh: clock, book choice, verse text, frame.
//!
//! Lookup problems never fail a refresh. An unknown or empty book falls back to
//! [`DEFAULT_BOOK`], missing text falls through the remaining candidate books and
//! then to a placeholder verse. Only rendering and writing the frame can fail.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use image::RgbImage;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::catalog::{BookCatalog, Catalogs};
use crate::clock;
use crate::config::{BookMode, ConfigStore, Settings, DEFAULT_BOOK};
use crate::download::{
    DownloadEvent, DownloadOptions, DownloadPlan, DownloadStatus, DownloadTask, StatusKind,
};
use crate::error::VerseError;
use crate::provider::{CachedProvider, VerseCache, VerseTextProvider};
use crate::render::{self, Renderer};
use crate::resolver::{
    candidate_books, next_rotation_book, resolve_in, BookSelection, Reference, TimeSample,
};
use crate::translation::Translation;

pub const PLACEHOLDER_TEXT: &str = "The Lord is my shepherd; I shall not want.";

/// Psalm 23:1, shown when nothing else can be
pub fn placeholder_reference() -> Reference {
    Reference {
        book: DEFAULT_BOOK.to_string(),
        book_id: 19,
        chapter: 23,
        verse: 1,
    }
}

/// Where the text of a frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerseSource {
    /// The selected book (or one of the matching books)
    Selected,
    /// The selected book was unusable, the default book was shown instead
    DefaultBook,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    pub reference: Reference,
    pub text: String,
    pub source: VerseSource,
}

impl Verse {
    fn placeholder() -> Self {
        Self {
            reference: placeholder_reference(),
            text: PLACEHOLDER_TEXT.to_string(),
            source: VerseSource::Placeholder,
        }
    }
}

pub struct Frame {
    pub verse: Verse,
    pub translation: Translation,
    pub image: RgbImage,
}

enum Lookup {
    Found(Verse),
    Missing,
    Offline,
}

/// Catalogs plus a text provider, turns clock readings into verses
pub struct VerseClock<P> {
    catalogs: Catalogs,
    provider: P,
}

impl<P: VerseTextProvider> VerseClock<P> {
    pub fn new(catalogs: Catalogs, provider: P) -> Self {
        Self { catalogs, provider }
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    fn lookup(
        &mut self,
        selection: &BookSelection,
        time: TimeSample,
        seed: u32,
        translation: Translation,
        source: VerseSource,
    ) -> Result<Lookup, VerseError> {
        let catalog = self.catalogs.for_translation(translation);
        let books = candidate_books(selection, time, seed, catalog)?;
        let only_book = books.len() == 1;

        for book in books {
            let reference = match resolve_in(time, book) {
                Ok(reference) => reference,
                Err(e) if only_book => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {}", book.name, e);
                    continue;
                }
            };
            match self.provider.fetch(&reference, translation) {
                Ok(text) => {
                    return Ok(Lookup::Found(Verse {
                        reference,
                        text,
                        source,
                    }))
                }
                Err(VerseError::NotFound(what)) => {
                    info!("No text for {}, trying the next book", what)
                }
                Err(e) => {
                    warn!("Could not fetch {} ({}): {}", reference, translation, e);
                    return Ok(Lookup::Offline);
                }
            }
        }
        Ok(Lookup::Missing)
    }

    /// Verse to show at `time`; never fails, see the module docs for the fallbacks
    pub fn verse_at(
        &mut self,
        selection: &BookSelection,
        time: TimeSample,
        seed: u32,
        translation: Translation,
    ) -> Verse {
        let first = match self.lookup(selection, time, seed, translation, VerseSource::Selected) {
            Ok(first) => first,
            Err(e) => {
                warn!("{}, using {}", e, DEFAULT_BOOK);
                let fallback = BookSelection::Fixed(DEFAULT_BOOK.to_string());
                self.lookup(&fallback, time, seed, translation, VerseSource::DefaultBook)
                    .unwrap_or_else(|e| {
                        error!("Default book unusable: {}", e);
                        Lookup::Missing
                    })
            }
        };

        match first {
            Lookup::Found(verse) => verse,
            Lookup::Missing => {
                warn!(
                    "Could not find {}:{} in {}, using {}",
                    time.raw_chapter(),
                    time.raw_verse(),
                    translation,
                    placeholder_reference()
                );
                Verse::placeholder()
            }
            Lookup::Offline => Verse::placeholder(),
        }
    }

    /// Resolve, fetch and draw one frame for `settings`
    pub fn frame(&mut self, settings: &Settings, time: TimeSample, seed: u32) -> Result<Frame, VerseError> {
        let renderer = Renderer::for_device(&settings.device)?;
        let translation = settings.translation;
        let verse = self.verse_at(&settings.book_selection(), time, seed, translation);
        let image = renderer.render(&verse.text, &verse.reference, translation, &settings.style())?;
        Ok(Frame {
            verse,
            translation,
            image,
        })
    }
}

/// Move a rotating book on when the day changed; true when `settings` changed
pub fn advance_rotation(settings: &mut Settings, today: NaiveDate, catalog: &BookCatalog) -> bool {
    if settings.book_mode != BookMode::Rotate || settings.rotation_date == Some(today) {
        return false;
    }
    if settings.rotation_date.is_some() {
        let order: Vec<String> = if settings.rotation_books.is_empty() {
            catalog.names().map(str::to_string).collect()
        } else {
            settings.rotation_books.clone()
        };
        let next = match next_rotation_book(&settings.book, &order) {
            Ok(next) => Some(next.to_string()),
            Err(e) => {
                warn!("{}: not in the rotation, starting over", e);
                order.first().cloned()
            }
        };
        if let Some(next) = next {
            info!("Rotating book from {} to {}", settings.book, next);
            settings.book = next;
        }
    }
    settings.rotation_date = Some(today);
    true
}

/// What one [`Session::tick_with`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub verse: Verse,
    pub translation: Translation,
    pub output: PathBuf,
}

/// Directories the live clock was built from
#[derive(PartialEq, Eq)]
struct Sources {
    cache_dir: PathBuf,
    catalog_dir: Option<PathBuf>,
}

impl Sources {
    fn of(settings: &Settings) -> Self {
        Self {
            cache_dir: settings.cache_dir.clone(),
            catalog_dir: settings.catalog_dir.clone(),
        }
    }
}

/// The long running display: config reload, rotation, downloads and frames
pub struct Session<S, F, R> {
    store: S,
    connect: F,
    output: PathBuf,
    options: DownloadOptions,
    live: Option<(Sources, VerseClock<CachedProvider<R>>)>,
    download: Option<DownloadTask>,
}

impl<S, F, R> Session<S, F, R>
where
    S: ConfigStore,
    F: FnMut() -> Result<R>,
    R: VerseTextProvider + Send + 'static,
{
    /// `connect` builds a remote provider, once for the live clock and once per download
    pub fn new(store: S, connect: F, output: impl Into<PathBuf>) -> Self {
        Self {
            store,
            connect,
            output: output.into(),
            options: DownloadOptions::default(),
            live: None,
            download: None,
        }
    }

    pub fn with_download_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Refresh with the current time of the configured zone
    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick_with(|settings| clock::current_time(settings.device.timezone, settings.dst_override))
    }

    /// Refresh with the time `now` picks from the freshly loaded settings
    pub fn tick_with(
        &mut self,
        now: impl FnOnce(&Settings) -> DateTime<FixedOffset>,
    ) -> Result<TickReport> {
        let mut settings = self.store.load()?;
        let now = now(&settings);
        self.poll_download();

        let sources = Sources::of(&settings);
        if self.live.as_ref().map_or(true, |(built, _)| *built != sources) {
            let catalogs = Catalogs::load(settings.catalog_dir.as_deref())?;
            let cache = VerseCache::new(&settings.cache_dir)?;
            let remote = (self.connect)()?;
            self.live = Some((sources, VerseClock::new(catalogs, CachedProvider::new(cache, remote))));
        }
        let live = self
            .live
            .as_mut()
            .map(|(_, live)| live)
            .context("Display clock is not available")?;

        let catalog = live.catalogs().for_translation(settings.translation);
        if advance_rotation(&mut settings, now.date_naive(), catalog) {
            self.store.save(&settings)?;
        }

        if settings.trigger_download {
            settings.trigger_download = false;
            self.store.save(&settings)?;
            if self.download.is_some() {
                info!("Download already in progress");
            } else {
                match start_download(&settings, live.catalogs(), &mut self.connect, self.options) {
                    Ok(task) => self.download = Some(task),
                    Err(e) => {
                        error!("Download not started: {:#}", e);
                        let status = DownloadStatus::new(
                            StatusKind::Error,
                            0,
                            format!("Download not started: {:#}", e),
                        );
                        if let Err(e) = status.save(&settings.cache_dir) {
                            warn!("{:#}", e);
                        }
                    }
                }
            }
        }

        let time = clock::sample(&now, settings.clock_convention)?;
        let frame = live.frame(&settings, time, clock::hourly_seed(&now))?;
        render::save_png(&frame.image, &self.output)?;
        info!(
            "{} ({}) written to {}",
            frame.verse.reference,
            frame.translation,
            self.output.display()
        );

        Ok(TickReport {
            verse: frame.verse,
            translation: frame.translation,
            output: self.output.clone(),
        })
    }

    /// Log what the download thread reported since the last call
    pub fn poll_download(&mut self) {
        let Some(task) = &self.download else {
            return;
        };
        for event in task.poll() {
            log_download_event(&event);
        }
        if task.is_finished() {
            if let Some(task) = self.download.take() {
                for event in task.poll() {
                    log_download_event(&event);
                }
                if let Err(e) = task.join() {
                    error!("{:#}", e);
                }
            }
        }
    }

    pub fn is_downloading(&self) -> bool {
        self.download.is_some()
    }

    /// Block until a running download ends
    pub fn finish_download(&mut self) -> Result<()> {
        if let Some(task) = self.download.take() {
            let report = task.join()?;
            for outcome in report.failed() {
                warn!("{} download incomplete", outcome.translation);
            }
        }
        Ok(())
    }
}

fn start_download<R, F>(
    settings: &Settings,
    catalogs: &Catalogs,
    connect: &mut F,
    options: DownloadOptions,
) -> Result<DownloadTask>
where
    F: FnMut() -> Result<R>,
    R: VerseTextProvider + Send + 'static,
{
    let plan = DownloadPlan::new(
        &download_translations(settings),
        &settings.book_selection(),
        catalogs,
        settings.clock_convention,
    )?;
    let cache = VerseCache::new(&settings.cache_dir)?;
    let remote = connect()?;
    info!("Started bulk download for {:?}", plan.translations().collect::<Vec<_>>());
    DownloadTask::spawn(plan, remote, cache, options)
}

/// Translations picked for download, the display translation when none are
pub fn download_translations(settings: &Settings) -> Vec<Translation> {
    if settings.download_translations.is_empty() {
        vec![settings.translation]
    } else {
        settings.download_translations.clone()
    }
}

pub fn log_download_event(event: &DownloadEvent) {
    match event {
        DownloadEvent::Started {
            translations,
            total,
        } => info!("Download of {} verses for {:?} started", total, translations),
        DownloadEvent::Progress {
            translation,
            done,
            total,
            percent,
        } => info!("{}: {}/{} ({}%)", translation, done, total, percent),
        DownloadEvent::TranslationDone(outcome) => info!(
            "{}: {} fetched, {} cached, {} missing",
            outcome.translation, outcome.fetched, outcome.skipped, outcome.missing
        ),
        DownloadEvent::TranslationFailed { translation, error } => {
            error!("{} download failed: {}", translation, error)
        }
        DownloadEvent::Finished { completed, failed } => {
            info!("Download finished, {} done, {} failed", completed, failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Book;
    use crate::provider::fake::FakeProvider;
    use crate::resolver::ClockConvention;

    fn at(hour: u32, minute: u32) -> TimeSample {
        TimeSample::new(hour, minute, ClockConvention::TwentyFourHour).unwrap()
    }

    #[test]
    fn fixed_book_shows_fetched_text() {
        let provider = FakeProvider::default().with(Translation::Kjv, "John 3:16", "For God so loved");
        let mut clock = VerseClock::new(Catalogs::builtin(), provider);
        let verse = clock.verse_at(&BookSelection::Fixed("John".into()), at(3, 16), 0, Translation::Kjv);
        assert_eq!(verse.reference.to_string(), "John 3:16");
        assert_eq!(verse.text, "For God so loved");
        assert_eq!(verse.source, VerseSource::Selected);
    }

    #[test]
    fn unknown_book_falls_back_to_default_book() {
        let provider = FakeProvider::default().with(Translation::Kjv, "Psalm 3:8", "Salvation belongs to the Lord");
        let mut clock = VerseClock::new(Catalogs::builtin(), provider);
        let verse = clock.verse_at(&BookSelection::Fixed("Hezekiah".into()), at(3, 16), 0, Translation::Kjv);
        assert_eq!(verse.reference.to_string(), "Psalm 3:8");
        assert_eq!(verse.source, VerseSource::DefaultBook);
    }

    #[test]
    fn empty_book_falls_back_to_default_book() {
        let mut catalogs = Catalogs::builtin();
        let mut books = BookCatalog::builtin().books().to_vec();
        books.push(Book::new("Lost", 99, vec![]));
        catalogs.insert(Translation::Esv, BookCatalog::new(books));
        let provider = FakeProvider::default().with(Translation::Esv, "Psalm 24:1", "The earth is the Lord's");
        let mut clock = VerseClock::new(catalogs, provider);
        let verse = clock.verse_at(&BookSelection::Fixed("Lost".into()), at(0, 0), 0, Translation::Esv);
        assert_eq!(verse.reference.to_string(), "Psalm 24:1");
        assert_eq!(verse.source, VerseSource::DefaultBook);
    }

    #[test]
    fn matching_tries_books_until_text_is_found() {
        // three books that all have chapter 10, only the last one has text
        let mut catalogs = Catalogs::builtin();
        let mut books: Vec<Book> = BookCatalog::builtin().books().to_vec();
        books.retain(|b| ["Psalm", "Isaiah", "Jeremiah"].contains(&b.name.as_str()));
        books.iter_mut().for_each(|b| *b = Book::new(b.name.clone(), b.id, b.verses_per_chapter()[..24].to_vec()));
        catalogs.insert(Translation::Niv, BookCatalog::new(books));

        let provider = FakeProvider::default().with(Translation::Niv, "Jeremiah 10:5", "Like a scarecrow");
        let mut clock = VerseClock::new(catalogs, provider);
        let verse = clock.verse_at(&BookSelection::Matching, at(10, 5), 0, Translation::Niv);
        assert_eq!(verse.reference.to_string(), "Jeremiah 10:5");
        assert_eq!(clock.provider().calls, 3);
    }

    #[test]
    fn missing_text_shows_placeholder() {
        let mut clock = VerseClock::new(Catalogs::builtin(), FakeProvider::default());
        let verse = clock.verse_at(&BookSelection::Fixed("John".into()), at(3, 16), 0, Translation::Nlt);
        assert_eq!(verse.reference.to_string(), "Psalm 23:1");
        assert_eq!(verse.text, PLACEHOLDER_TEXT);
        assert_eq!(verse.source, VerseSource::Placeholder);
    }

    #[test]
    fn network_error_shows_placeholder_without_trying_more_books() {
        let provider = FakeProvider::default()
            .failing(Translation::Csb, "John 3:16", VerseError::NetworkError("offline".into()));
        let mut clock = VerseClock::new(Catalogs::builtin(), provider);
        let verse = clock.verse_at(&BookSelection::Fixed("John".into()), at(3, 16), 0, Translation::Csb);
        assert_eq!(verse.source, VerseSource::Placeholder);
        assert_eq!(clock.provider().calls, 1);
    }

    #[test]
    fn frame_renders_at_device_size() {
        let provider = FakeProvider::default().with(Translation::Nasb, "John 3:16", "For God so loved");
        let mut clock = VerseClock::new(Catalogs::builtin(), provider);
        let mut settings = Settings::default();
        settings.set("bookMode", "fixed").unwrap();
        settings.set("book", "John").unwrap();
        settings.set("orientation", "vertical").unwrap();
        let frame = clock.frame(&settings, at(3, 16), 0).unwrap();
        assert_eq!(frame.image.dimensions(), (480, 800));
        assert_eq!(frame.verse.reference.to_string(), "John 3:16");
    }

    fn rotating(book: &str, order: &[&str], date: Option<NaiveDate>) -> Settings {
        let mut settings = Settings::default();
        settings.book_mode = BookMode::Rotate;
        settings.book = book.to_string();
        settings.rotation_books = order.iter().map(|s| s.to_string()).collect();
        settings.rotation_date = date;
        settings
    }

    #[test]
    fn rotation_advances_once_per_day() {
        let catalog = BookCatalog::builtin();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let tuesday = monday.succ_opt().unwrap();

        let mut settings = rotating("John", &["Mark", "John", "Acts"], None);
        assert!(advance_rotation(&mut settings, monday, &catalog));
        assert_eq!(settings.book, "John");

        assert!(!advance_rotation(&mut settings, monday, &catalog));
        assert!(advance_rotation(&mut settings, tuesday, &catalog));
        assert_eq!(settings.book, "Acts");
        assert_eq!(settings.rotation_date, Some(tuesday));

        let wednesday = tuesday.succ_opt().unwrap();
        assert!(advance_rotation(&mut settings, wednesday, &catalog));
        assert_eq!(settings.book, "Mark");
    }

    #[test]
    fn rotation_defaults_to_canon_order_and_recovers_unknown_book() {
        let catalog = BookCatalog::builtin();
        let day = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let next_day = day.succ_opt().unwrap();

        let mut settings = rotating("Revelation", &[], Some(day));
        assert!(advance_rotation(&mut settings, next_day, &catalog));
        assert_eq!(settings.book, "Genesis");

        let mut settings = rotating("Hezekiah", &["Ruth", "Esther"], Some(day));
        assert!(advance_rotation(&mut settings, next_day, &catalog));
        assert_eq!(settings.book, "Ruth");
    }

    #[test]
    fn rotation_ignores_other_modes() {
        let mut settings = Settings::default();
        let day = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        assert!(!advance_rotation(&mut settings, day, &BookCatalog::builtin()));
        assert_eq!(settings.rotation_date, None);
    }
}
