//! Date formatting for articles.
//!
//! Article timestamps are naive local times (either declared in the source
//! or taken from the file's mtime) that are pinned to the configured fixed
//! UTC offset. Human-readable forms follow the configured locale; the
//! machine-readable forms never do.

use chrono::{DateTime, FixedOffset, Locale, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc};
use std::fmt;

/// `10 Oct, 2010`
pub const SHORT_FORMAT: &str = "%d %b, %Y";

/// `Sunday, 10 Oct, 2010, 11:10:10`
pub const DETAILED_FORMAT: &str = "%A, %d %b, %Y, %X";

/// Chooses between locale-invariant (C/POSIX) names and localized names
/// when formatting a date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Names {
    Invariant,
    Localized(Locale),
}

/// Date settings shared by every article of one build: the fixed offset
/// the naive timestamps live in and the locale for human-readable forms.
#[derive(Clone, Copy, Debug)]
pub struct Dates {
    pub offset: FixedOffset,
    pub names: Names,
}

impl Default for Dates {
    fn default() -> Self {
        Dates {
            offset: utc(),
            names: Names::Invariant,
        }
    }
}

impl Dates {
    /// Builds the settings from the configuration strings. An empty or
    /// unknown locale yields locale-invariant names.
    pub fn new(timezone: &str, locale: &str) -> Result<Dates, Error> {
        Ok(Dates {
            offset: parse_offset(timezone)?,
            names: parse_locale(locale).map_or(Names::Invariant, Names::Localized),
        })
    }

    /// Pins a naive timestamp to the configured offset.
    pub fn localize(&self, naive: &NaiveDateTime) -> DateTime<FixedOffset> {
        self.offset
            .from_local_datetime(naive)
            .earliest()
            .unwrap_or_else(|| self.offset.from_utc_datetime(naive))
    }
}

/// Formats `date` with a strftime-style `pattern`. With
/// [`Names::Invariant`] weekday and month names are always English,
/// whatever the process locale is.
pub fn format(date: &DateTime<FixedOffset>, pattern: &str, names: Names) -> String {
    match names {
        Names::Invariant => date.format(pattern).to_string(),
        Names::Localized(locale) => date.format_localized(pattern, locale).to_string(),
    }
}

/// `2010-10-10T11:10:10+00:00`
pub fn rfc3339(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// `Sun, 10 Oct 2010 11:10:10 +0000`. RFC 822 forbids localized names, so
/// this never consults a locale.
pub fn rfc822(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc2822()
}

/// Parses a locale name such as `pl_PL.UTF-8`, `en-US` or `de_DE@euro`.
pub fn parse_locale(s: &str) -> Option<Locale> {
    let name = s.split(['.', '@']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "C" || name == "POSIX" {
        return None;
    }
    Locale::try_from(name.replace('-', "_").as_str()).ok()
}

/// Parses a fixed UTC offset: `+01:00`, `-0530`, `UTC`, `Z` or the empty
/// string (UTC).
pub fn parse_offset(s: &str) -> Result<FixedOffset, Error> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("utc") || s == "Z" {
        return Ok(utc());
    }
    s.parse()
        .map_err(|_: chrono::ParseError| Error::InvalidOffset(s.to_owned()))
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Represents an invalid date setting in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Returned when the `timezone` setting isn't a recognizable offset.
    InvalidOffset(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidOffset(s) => write!(f, "invalid timezone offset `{}`", s),
        }
    }
}

impl std::error::Error for Error {}
