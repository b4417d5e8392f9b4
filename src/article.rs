//! Defines the [`Article`] type: one source file, converted and with its
//! metadata resolved.

use crate::converter::{self, MarkupConverter, MORE_MARKER};
use crate::date::{self, Dates, Names, DETAILED_FORMAT, SHORT_FORMAT};
use crate::slug;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Layout of the `datetime` metadata field.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The metadata fields an article source may declare. Every field is
/// optional; anything else the converter reports is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    pub tags: Vec<String>,
}

impl Metadata {
    /// Parses the converter's attribute map. Tags are comma-separated,
    /// trimmed and sorted; empty entries are dropped and duplicates kept.
    /// A `datetime` that doesn't follow [`DATETIME_FORMAT`] is returned as
    /// the error value.
    pub fn parse(attributes: &HashMap<String, String>) -> std::result::Result<Metadata, String> {
        let datetime = match attributes.get("datetime") {
            Some(value) => Some(
                NaiveDateTime::parse_from_str(value.trim(), DATETIME_FORMAT)
                    .map_err(|_| value.clone())?,
            ),
            None => None,
        };

        let mut tags: Vec<String> = attributes
            .get("tags")
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        tags.sort();

        Ok(Metadata {
            title: attributes
                .get("title")
                .map(|title| title.trim())
                .filter(|title| !title.is_empty())
                .map(str::to_owned),
            datetime,
            tags,
        })
    }
}

/// A converted article. All fields are resolved once, by [`Article::read`],
/// and never change afterwards.
#[derive(Debug, Clone)]
pub struct Article {
    path: PathBuf,
    title: String,
    created: DateTime<FixedOffset>,
    names: Names,
    tags: Vec<String>,
    body: String,
    file_name: String,
}

impl Article {
    /// Reads and converts the source at `path`. A missing title falls back
    /// to the file stem, a missing `datetime` to the file's modification
    /// time, both interpreted in the offset of `dates`.
    pub fn read(path: &Path, converter: &dyn MarkupConverter, dates: &Dates) -> Result<Article> {
        let source = std::fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        let converted = converter.convert(&source).map_err(|err| Error::Convert {
            path: path.to_owned(),
            err,
        })?;
        let metadata =
            Metadata::parse(&converted.attributes).map_err(|value| Error::MalformedMetadata {
                path: path.to_owned(),
                value,
            })?;

        let naive = match metadata.datetime {
            Some(datetime) => datetime,
            None => modified(path)?,
        };
        let title = match metadata.title {
            Some(title) => title,
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        Ok(Article {
            path: path.to_owned(),
            title,
            created: dates.localize(&naive),
            names: dates.names,
            tags: metadata.tags,
            body: converted.body,
            file_name: slug::file_name(path),
        })
    }

    /// Source path; also the article's identity.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created(&self) -> &DateTime<FixedOffset> {
        &self.created
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Output file name, e.g. `first-post.html`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The body up to the first [`MORE_MARKER`], or the whole body when
    /// there is no marker.
    pub fn short_body(&self) -> &str {
        match self.body.find(MORE_MARKER) {
            Some(i) => self.body[..i].trim_end(),
            None => &self.body,
        }
    }

    /// `10 Oct, 2010`, localized.
    pub fn created_short(&self) -> String {
        date::format(&self.created, SHORT_FORMAT, self.names)
    }

    /// `Sunday, 10 Oct, 2010, 11:10:10`, localized.
    pub fn created_detailed(&self) -> String {
        date::format(&self.created, DETAILED_FORMAT, self.names)
    }

    pub fn created_rfc3339(&self) -> String {
        date::rfc3339(&self.created)
    }

    /// Always uses English names, whatever the configured locale.
    pub fn created_rfc822(&self) -> String {
        date::rfc822(&self.created)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        path: &str,
        title: &str,
        created: &str,
        tags: &[&str],
        body: &str,
    ) -> Article {
        let dates = Dates::default();
        let naive = NaiveDateTime::parse_from_str(created, DATETIME_FORMAT).unwrap();
        Article {
            path: PathBuf::from(path),
            title: title.to_owned(),
            created: dates.localize(&naive),
            names: dates.names,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            body: body.to_owned(),
            file_name: slug::file_name(Path::new(path)),
        }
    }
}

/// The modification time of `path` as a naive local time.
fn modified(path: &Path) -> Result<NaiveDateTime> {
    let io_error = |err| Error::Io {
        path: path.to_owned(),
        err,
    };
    let mtime = std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(io_error)?;
    Ok(DateTime::<Local>::from(mtime).naive_local())
}

/// The result of reading an article.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading an article.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source can't be read or stat'ed.
    Io { path: PathBuf, err: io::Error },

    /// Returned when the converter rejects the source.
    Convert {
        path: PathBuf,
        err: converter::Error,
    },

    /// Returned when `datetime` is present but unparseable.
    MalformedMetadata { path: PathBuf, value: String },
}

impl Error {
    pub fn path(&self) -> &Path {
        match self {
            Error::Io { path, .. } => path,
            Error::Convert { path, .. } => path,
            Error::MalformedMetadata { path, .. } => path,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => {
                write!(f, "Reading article '{}': {}", path.display(), err)
            }
            Error::Convert { path, err } => {
                write!(f, "Converting article '{}': {}", path.display(), err)
            }
            Error::MalformedMetadata { path, value } => write!(
                f,
                "Article '{}' has datetime `{}`, expected YYYY-MM-DD HH:MM:SS",
                path.display(),
                value
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
            Error::Convert { err, .. } => Some(err),
            Error::MalformedMetadata { .. } => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::converter::RestConverter;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn read(path: &Path) -> Result<Article> {
        Article::read(path, &RestConverter, &Dates::default())
    }

    #[test]
    fn test_metadata_parse() {
        let attributes: HashMap<String, String> = [
            ("title", " Hello "),
            ("datetime", "2000-01-01 11:11:11"),
            ("tags", "foo, bar baz,, foo"),
            ("modified", "whatever"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let metadata = Metadata::parse(&attributes).unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Hello"));
        assert_eq!(
            metadata.datetime.map(|d| d.to_string()).as_deref(),
            Some("2000-01-01 11:11:11")
        );
        assert_eq!(metadata.tags, vec!["bar baz", "foo", "foo"]);

        assert_eq!(Metadata::parse(&HashMap::new()).unwrap(), Metadata::default());
    }

    #[test]
    fn test_metadata_malformed_datetime() {
        let attributes: HashMap<String, String> =
            [("datetime".to_owned(), "yesterday".to_owned())].into();
        assert_eq!(Metadata::parse(&attributes), Err("yesterday".to_owned()));
    }

    #[test]
    fn test_read_minimal() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "minimal.rst",
            ":Title: title\n:Datetime: 2000-01-01 11:11:11\n:Tags: foo\n\nbody, body",
        );
        let article = read(&path).unwrap();
        assert_eq!(article.title(), "title");
        assert_eq!(article.tags(), &["foo".to_owned()]);
        assert_eq!(article.body(), "<p>body, body</p>");
        assert_eq!(article.file_name(), "minimal.html");
        assert_eq!(article.created_rfc3339(), "2000-01-01T11:11:11+00:00");
        assert_eq!(article.created_short(), "01 Jan, 2000");
        assert_eq!(article.created_detailed(), "Saturday, 01 Jan, 2000, 11:11:11");
        assert_eq!(article.created_rfc822(), "Sat, 1 Jan 2000 11:11:11 +0000");
    }

    #[test]
    fn test_read_falls_back_to_file_stem_and_mtime() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "2011-11-11_incomplete.rst", "body, body");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_321_009_871);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let article = read(&path).unwrap();
        assert_eq!(article.title(), "2011-11-11_incomplete");
        assert!(article.tags().is_empty());
        assert_eq!(article.file_name(), "incomplete.html");
        assert_eq!(
            article.created().naive_local(),
            DateTime::<Local>::from(mtime).naive_local()
        );
    }

    #[test]
    fn test_read_malformed_datetime() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.rst", ":Datetime: 2000-13-01 11:11:11\n\nbody");
        match read(&path) {
            Err(Error::MalformedMetadata { path: p, value }) => {
                assert_eq!(p, path);
                assert_eq!(value, "2000-13-01 11:11:11");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.rst");
        assert!(matches!(read(&path), Err(Error::Io { .. })));
    }

    #[test]
    fn test_short_body() {
        let article = Article::from_parts(
            "a.rst",
            "a",
            "2010-10-10 10:10:10",
            &[],
            "<p>a</p>\n<!-- more -->\n<p>b</p>",
        );
        assert_eq!(article.short_body(), "<p>a</p>");

        let article = Article::from_parts("b.rst", "b", "2010-10-10 10:10:10", &[], "<p>a</p>");
        assert_eq!(article.short_body(), "<p>a</p>");
    }

    #[test]
    fn test_read_full_keeps_marker_in_body() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "full.rst",
            ":Title: Kiroku\n:Datetime: 2013-09-08 10:57:24\n:Modified:\n:Tags: blog\n\n\
             Kiroku\n-------\n\nLorem ipsum dolor sit amet.\n\n.. more\n\nArcu scelerisque.",
        );
        let article = read(&path).unwrap();
        assert!(article.body().contains(MORE_MARKER));
        assert_eq!(
            article.short_body(),
            "<h2>Kiroku</h2>\n<p>Lorem ipsum dolor sit amet.</p>"
        );
    }
}
