//! Supported Bible translations

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::VerseError;

/// Bible translation offered by the verse provider
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Translation {
    #[default]
    Nasb,
    Kjv,
    Niv,
    Esv,
    Nkjv,
    Nlt,
    Csb,
}

impl Translation {
    /// Every translation, in the order the settings page lists them
    pub const ALL: [Translation; 7] = [
        Translation::Nasb,
        Translation::Kjv,
        Translation::Niv,
        Translation::Esv,
        Translation::Nkjv,
        Translation::Nlt,
        Translation::Csb,
    ];

    /// Code used on screen, in cache file names and in provider URLs
    pub const fn code(self) -> &'static str {
        match self {
            Translation::Nasb => "NASB",
            Translation::Kjv => "KJV",
            Translation::Niv => "NIV",
            Translation::Esv => "ESV",
            Translation::Nkjv => "NKJV",
            Translation::Nlt => "NLT",
            Translation::Csb => "CSB",
        }
    }
}

impl FromStr for Translation {
    type Err = VerseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Translation::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| VerseError::UnknownTranslation(code.to_string()))
    }
}

impl TryFrom<String> for Translation {
    type Error = VerseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Translation> for String {
    fn from(value: Translation) -> Self {
        value.code().to_string()
    }
}

impl std::fmt::Display for Translation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
