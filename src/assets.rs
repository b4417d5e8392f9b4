//! Static files: the stylesheets and scripts seeded into a fresh build
//! directory, the favicon, and the non-article files mirrored from the
//! articles directory.

use crate::config::Config;
use crate::util::{self, at, PathError};
use regex::Regex;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Extension of article sources, which are never mirrored.
pub const SOURCE_EXTENSION: &str = "rst";

pub const FAVICON: &str = "favicon.ico";

static CSS_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static CSS_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s\s+").unwrap());
static CSS_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?([;:{},+>])\s?").unwrap());

/// Where the static sources live and where they go.
pub struct Assets<'a> {
    pub css_directory: &'a Path,
    pub js_directory: &'a Path,
    pub templates_directory: &'a Path,
    pub articles_directory: &'a Path,
    pub build_directory: &'a Path,
}

impl<'a> Assets<'a> {
    /// The static file locations of a project.
    pub fn new(config: &'a Config) -> Assets<'a> {
        Assets {
            css_directory: &config.css_directory,
            js_directory: &config.js_directory,
            templates_directory: &config.templates_directory,
            articles_directory: &config.articles_directory,
            build_directory: &config.build_directory,
        }
    }

    /// Creates the build directory with `images/`, `css/` and `js/` when it
    /// doesn't exist yet, minifying the stylesheets. A missing stylesheet or
    /// script directory is an error. An existing build directory is left
    /// alone. Returns whether it was created.
    pub fn seed_build_directory(&self) -> Result<bool> {
        if self.build_directory.exists() {
            return Ok(false);
        }

        let images = self.build_directory.join("images");
        at(&images, fs::create_dir_all(&images))?;

        for (source, name) in [(self.css_directory, "css"), (self.js_directory, "js")] {
            util::copy_dir(source, &self.build_directory.join(name))?;
        }

        for path in util::entries(&self.build_directory.join("css"))? {
            if path.extension().map_or(false, |ext| ext == "css") {
                minify_file(&path)?;
            }
        }
        Ok(true)
    }

    /// Copies `favicon.ico` from the templates directory into `images/`.
    pub fn copy_favicon(&self) -> Result<()> {
        let source = self.templates_directory.join(FAVICON);
        if !source.is_file() {
            log::warn!("No '{}', skipping", source.display());
            return Ok(());
        }
        let images = self.build_directory.join("images");
        at(&images, fs::create_dir_all(&images))?;
        at(&source, fs::copy(&source, images.join(FAVICON)))?;
        Ok(())
    }

    /// Mirrors everything in the articles directory except article sources
    /// into the build directory. Directories are removed and copied again
    /// wholesale; files are replaced one by one. Files deleted from the
    /// source are not removed from the output.
    pub fn mirror(&self) -> Result<()> {
        for source in util::entries(self.articles_directory)? {
            if source.extension().map_or(false, |ext| ext == SOURCE_EXTENSION) {
                continue;
            }
            let name = match source.file_name() {
                Some(name) => name,
                None => continue,
            };
            let target = self.build_directory.join(name);
            log::debug!("Mirroring '{}'", source.display());
            util::remove(&target)?;
            if source.is_dir() {
                util::copy_dir(&source, &target)?;
            } else {
                at(&source, fs::copy(&source, &target))?;
            }
        }
        Ok(())
    }
}

/// Strips comments and redundant whitespace from a stylesheet.
pub fn minify_css(css: &str) -> String {
    let css = CSS_COMMENT.replace_all(css, "");
    let css = CSS_WHITESPACE.replace_all(&css, " ");
    let css = CSS_PUNCTUATION.replace_all(&css, "$1");
    css.replace(";}", "}").trim().to_owned()
}

fn minify_file(path: &Path) -> Result<()> {
    let css = at(path, fs::read_to_string(path))?;
    at(path, fs::write(path, minify_css(&css)))?;
    Ok(())
}

/// The result of an asset operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem copying static files.
#[derive(Debug)]
pub enum Error {
    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "Copying '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
        }
    }
}

impl From<PathError> for Error {
    fn from((path, err): PathError) -> Error {
        Error::Io { path, err }
    }
}
