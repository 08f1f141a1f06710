//! Persisted plugin settings.
//!
//! The settings file is a camelCase JSON document using the same keys as the
//! plugin settings page (`translation`, `layoutStyle`, `sizePreset`, ...). Every
//! field has a default so a missing file or a partial document still loads.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::clock::{DstOverride, Zone};
use crate::error::VerseError;
use crate::render::palette::Panel;
use crate::resolver::{BookSelection, ClockConvention};
use crate::style::{BorderStyle, Colors, DisplayStyle, FontFace, Layout, Rgb, SizePreset};
use crate::translation::Translation;

/// Book shown when nothing else works
pub const DEFAULT_BOOK: &str = "Psalm";

/// How the book is picked, see [`BookSelection`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookMode {
    #[default]
    Matching,
    Fixed,
    Rotate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Display hardware the frame is rendered for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub timezone: Zone,
    pub panel: Panel,
}

impl DeviceConfig {
    /// Frame size after applying the orientation
    pub fn dimensions(&self) -> (u32, u32) {
        match self.orientation {
            Orientation::Horizontal => (self.width, self.height),
            Orientation::Vertical => (self.height, self.width),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            orientation: Orientation::Horizontal,
            timezone: Zone::Local,
            panel: Panel::Rgb,
        }
    }
}

/// Everything the user can set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub translation: Translation,
    pub layout_style: Layout,
    pub size_preset: SizePreset,
    pub border_style: BorderStyle,
    pub border_width: u32,
    pub font_name: FontFace,
    pub bg_color: Rgb,
    pub verse_color: Rgb,
    pub ref_color: Rgb,
    pub trans_color: Rgb,
    pub border_color: Rgb,

    #[serde(deserialize_with = "yes_no_or_bool")]
    pub trigger_download: bool,
    pub download_translations: Vec<Translation>,

    pub dst_override: DstOverride,
    pub clock_convention: ClockConvention,

    pub book_mode: BookMode,
    pub book: String,
    /// Rotation order; empty means the whole canon
    pub rotation_books: Vec<String>,
    /// Day the rotation book was last advanced
    pub rotation_date: Option<NaiveDate>,

    pub device: DeviceConfig,
    pub cache_dir: PathBuf,
    pub catalog_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let colors = Colors::default();
        Self {
            translation: Translation::Nasb,
            layout_style: Layout::Corner,
            size_preset: SizePreset::Medium,
            border_style: BorderStyle::None,
            border_width: 3,
            font_name: FontFace::Jost,
            bg_color: colors.background,
            verse_color: colors.verse,
            ref_color: colors.reference,
            trans_color: colors.translation,
            border_color: colors.border,
            trigger_download: false,
            download_translations: Vec::new(),
            dst_override: DstOverride::Auto,
            clock_convention: ClockConvention::TwentyFourHour,
            book_mode: BookMode::Matching,
            book: DEFAULT_BOOK.to_string(),
            rotation_books: Vec::new(),
            rotation_date: None,
            device: DeviceConfig::default(),
            cache_dir: PathBuf::from("bible_cache"),
            catalog_dir: None,
        }
    }
}

/// The settings page posts `"yes"`/`"no"` for the download trigger
fn yes_no_or_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Text(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "yes" | "true" | "on" | "1"
        ),
    })
}

fn parse_bool(value: &str) -> Result<bool, VerseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" => Ok(false),
        other => Err(VerseError::InvalidStyle(format!("'{}' is not yes/no", other))),
    }
}

fn parse_list<T>(value: &str, parse: impl Fn(&str) -> Result<T, VerseError>) -> Result<Vec<T>, VerseError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse)
        .collect()
}

impl Settings {
    pub fn style(&self) -> DisplayStyle {
        DisplayStyle {
            layout: self.layout_style,
            size: self.size_preset,
            border: self.border_style,
            border_width: self.border_width,
            font: self.font_name,
            colors: Colors {
                background: self.bg_color,
                verse: self.verse_color,
                reference: self.ref_color,
                translation: self.trans_color,
                border: self.border_color,
            },
        }
    }

    pub fn book_selection(&self) -> BookSelection {
        match self.book_mode {
            BookMode::Matching => BookSelection::Matching,
            BookMode::Fixed => BookSelection::Fixed(self.book.clone()),
            BookMode::Rotate => BookSelection::Rotate {
                current: self.book.clone(),
                order: self.rotation_books.clone(),
            },
        }
    }

    /// Reject settings that could not be rendered
    pub fn validate(&self) -> Result<(), VerseError> {
        self.style().validate()?;
        let (width, height) = self.device.dimensions();
        if width == 0 || height == 0 {
            return Err(VerseError::InvalidStyle(format!(
                "display size {}x{}",
                width, height
            )));
        }
        if self.book_mode != BookMode::Matching && self.book.trim().is_empty() {
            return Err(VerseError::InvalidStyle("book is empty".to_string()));
        }
        Ok(())
    }

    /// Apply one `key value` edit, keys as in the JSON document
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), VerseError> {
        let number = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| VerseError::InvalidStyle(format!("'{}' is not a number", v)))
        };

        match key {
            "translation" => self.translation = value.parse()?,
            "layoutStyle" => self.layout_style = value.parse()?,
            "sizePreset" => self.size_preset = value.parse()?,
            "borderStyle" => self.border_style = value.parse()?,
            "borderWidth" => self.border_width = number(value)?,
            "fontName" => self.font_name = value.parse()?,
            "bgColor" => self.bg_color = value.parse()?,
            "verseColor" => self.verse_color = value.parse()?,
            "refColor" => self.ref_color = value.parse()?,
            "transColor" => self.trans_color = value.parse()?,
            "borderColor" => self.border_color = value.parse()?,
            "triggerDownload" => self.trigger_download = parse_bool(value)?,
            "downloadTranslations" => {
                self.download_translations = parse_list(value, |v| v.parse())?
            }
            "dstOverride" => {
                self.dst_override = match value.trim() {
                    "auto" => DstOverride::Auto,
                    "always_dst" => DstOverride::AlwaysDst,
                    "never_dst" => DstOverride::NeverDst,
                    other => {
                        return Err(VerseError::InvalidStyle(format!(
                            "unknown DST override '{}'",
                            other
                        )))
                    }
                }
            }
            "clockConvention" => {
                self.clock_convention = match value.trim() {
                    "24h" => ClockConvention::TwentyFourHour,
                    "12h" => ClockConvention::TwelveHour,
                    other => {
                        return Err(VerseError::InvalidStyle(format!(
                            "unknown clock convention '{}'",
                            other
                        )))
                    }
                }
            }
            "bookMode" => {
                self.book_mode = match value.trim() {
                    "matching" => BookMode::Matching,
                    "fixed" => BookMode::Fixed,
                    "rotate" => BookMode::Rotate,
                    other => {
                        return Err(VerseError::InvalidStyle(format!(
                            "unknown book mode '{}'",
                            other
                        )))
                    }
                }
            }
            "book" => self.book = value.trim().to_string(),
            "rotationBooks" => {
                self.rotation_books = parse_list(value, |v| Ok(v.to_string()))?;
                self.rotation_date = None;
            }
            "width" => self.device.width = number(value)?,
            "height" => self.device.height = number(value)?,
            "orientation" => {
                self.device.orientation = match value.trim() {
                    "horizontal" => Orientation::Horizontal,
                    "vertical" => Orientation::Vertical,
                    other => {
                        return Err(VerseError::InvalidStyle(format!(
                            "unknown orientation '{}'",
                            other
                        )))
                    }
                }
            }
            "timezone" => self.device.timezone = value.parse()?,
            "panel" => self.device.panel = value.parse()?,
            "cacheDir" => self.cache_dir = PathBuf::from(value.trim()),
            "catalogDir" => {
                let value = value.trim();
                self.catalog_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            other => {
                return Err(VerseError::InvalidStyle(format!(
                    "unknown setting '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// Persistence for [`Settings`]
pub trait ConfigStore {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept in a JSON file
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            debug!("No settings at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings {}", self.path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write settings {}", self.path.display()))?;
        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
