//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: reading the articles
//! ([`crate::article`]), indexing their tags and words ([`crate::tag`],
//! [`crate::search`]), rendering every page ([`crate::write`]), mirroring the
//! static files ([`crate::assets`]) and generating the RSS feed
//! ([`crate::feed`]).

use crate::article::{self, Article};
use crate::assets::{self, Assets};
use crate::config::Config;
use crate::converter::{self, MarkupConverter};
use crate::date;
use crate::feed::{self, FeedBuilder, FeedItem};
use crate::search::SearchIndex;
use crate::tag::TagIndex;
use crate::template::{self, Templates};
use crate::util;
use crate::write::{self, Writer};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Maximum number of articles in the feed.
pub const FEED_ITEMS: usize = 10;

/// The source of the about page, kept out of the article list.
pub const ABOUT_SOURCE: &str = "about.rst";

pub const SEARCH_FILE: &str = "search.json";
pub const SEARCH_TEMPLATES_FILE: &str = "templates.json";
pub const FEED_FILE: &str = "rss.xml";

/// Builds the site described by `config`, converting sources with
/// `converter`. The stages run strictly one after another; a failure aborts
/// the build and leaves whatever was already written in place.
pub fn build_site(config: &Config, converter: &dyn MarkupConverter) -> Result<()> {
    let dates = config.dates()?;
    let site_url = config.site_url()?;
    let templates = Templates::new(&config.templates_directory, config.template_defaults());
    let assets = Assets::new(config);

    log::info!("Preparing '{}'", config.build_directory.display());
    if assets.seed_build_directory()? {
        log::info!("Created '{}'", config.build_directory.display());
    }

    log::info!("Gathering articles");
    let Sources { articles, about } = walk(&config.articles_directory, converter, &dates)?;
    log::info!("Articles found: {}", articles.len());

    let tags = index_tags(&articles);
    let tag_cloud = tags.cloud(&templates)?;

    let writer = Writer {
        templates: &templates,
        tag_cloud: &tag_cloud,
        output_directory: &config.build_directory,
    };

    log::info!("Writing json data files");
    write_search_templates(config)?;
    write_search_index(&writer, &articles, &config.build_directory)?;

    match about {
        Some(path) => {
            log::info!("Generating about page");
            let source = read(&path)?;
            let converted = converter
                .convert(&source)
                .map_err(|err| Error::Converter { path, err })?;
            writer.write_about(&converted.body)?;
        }
        None => log::warn!("No about page found"),
    }

    log::info!("Saving articles");
    for article in &articles {
        writer.write_article(article)?;
    }

    log::info!("Mirroring static files");
    assets.mirror()?;
    assets.copy_favicon()?;

    log::info!("Creating tag pages");
    writer.write_tag_pages(&tags, &articles)?;
    log::info!("Creating index and archive");
    writer.write_index(&articles)?;
    writer.write_archive(&articles)?;

    if articles.is_empty() {
        log::info!("No articles, skipping the feed");
    } else {
        log::info!("Writing RSS feed");
        let recent = &articles[..articles.len().min(FEED_ITEMS)];
        let path = config.build_directory.join(FEED_FILE);
        write_file(&path, &render_feed(&templates, &site_url, recent)?)?;
    }

    log::info!("All done");
    Ok(())
}

/// The article sources of a project.
struct Sources {
    /// Newest first.
    articles: Vec<Article>,
    about: Option<PathBuf>,
}

/// Reads every `.rst` file directly inside `directory` except the about
/// page. Articles are ordered by creation time, newest first; ties keep
/// file name order.
fn walk(
    directory: &Path,
    converter: &dyn MarkupConverter,
    dates: &date::Dates,
) -> Result<Sources> {
    let paths = util::entries(directory).map_err(|(path, err)| Error::Io { path, err })?;

    let mut about = None;
    let mut articles = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.to_string_lossy().ends_with(".rst") {
            continue;
        }
        if path.file_name().map_or(false, |name| name == ABOUT_SOURCE) {
            about = Some(path);
            continue;
        }
        log::debug!("Processing '{}'", path.display());
        articles.push(Article::read(&path, converter, dates)?);
    }
    articles.sort_by(|a, b| b.created().cmp(a.created()));

    Ok(Sources { articles, about })
}

/// Registers every article under each of its tags.
fn index_tags(articles: &[Article]) -> TagIndex {
    let mut tags = TagIndex::new();
    for article in articles {
        for tag in article.tags() {
            tags.register(tag, article.path());
        }
    }
    tags
}

/// UI strings for the search script. `{sp}` is left in for the script to
/// fill in.
#[derive(Debug, Serialize)]
struct SearchTemplates {
    /// Shown while searching.
    w: String,
    /// Heading of the results.
    r: String,
    /// Document title while showing results.
    t: String,
    /// Shown when nothing matches.
    n: String,
}

fn write_search_templates(config: &Config) -> Result<()> {
    let templates = SearchTemplates {
        w: format!("<h1>{}</h1>", config.i18n("search_progress")),
        r: format!("<h1>{}</h1>", config.i18n("search_results")),
        t: format!(
            "{} - {}",
            config.i18n("search_results_title"),
            config.site.site_name
        ),
        n: format!("<h1>{}</h1>", config.i18n("search_not_found")),
    };
    let path = config.build_directory.join(SEARCH_TEMPLATES_FILE);
    write_file(&path, &serde_json::to_string(&templates)?)
}

/// Indexes `articles` in order; the ordinal of an article in the index is
/// its position in the slice.
fn write_search_index(
    writer: &Writer,
    articles: &[Article],
    build_directory: &Path,
) -> Result<()> {
    let mut index = SearchIndex::new();
    for article in articles {
        index.add(writer.headline(article)?, article.body());
    }
    write_file(&build_directory.join(SEARCH_FILE), &index.to_json()?)
}

/// Renders the feed of `articles`, in the given order.
fn render_feed(
    templates: &Templates,
    site_url: &url::Url,
    articles: &[Article],
) -> Result<String> {
    let mut feed = FeedBuilder::new(templates);
    for article in articles {
        let link = site_url.join(article.file_name())?;
        let pub_date = article.created_rfc822();
        feed.add(&FeedItem::from_article(article, &link, &pub_date))?;
    }
    Ok(feed.get()?)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    log::debug!("Writing '{}'", path.display());
    std::fs::write(path, contents).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })
}

/// The result of a build.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from reading
/// articles, rendering templates, writing pages and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for invalid date settings.
    Date(date::Error),

    /// Returned when the site URL can't be assembled or joined.
    Url(url::ParseError),

    /// Returned for I/O problems outside the other stages.
    Io { path: PathBuf, err: io::Error },

    /// Returned for errors reading articles.
    Article(article::Error),

    /// Returned when the about page can't be converted.
    Converter {
        path: PathBuf,
        err: converter::Error,
    },

    /// Returned for errors rendering the tag cloud.
    Template(template::Error),

    /// Returned for errors writing pages.
    Write(write::Error),

    /// Returned for errors building the feed.
    Feed(feed::Error),

    /// Returned for errors copying static files.
    Assets(assets::Error),

    /// Returned for errors serializing the search data.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Date(err) => write!(f, "{}", err),
            Error::Url(err) => write!(f, "Building site URL: {}", err),
            Error::Io { path, err } => write!(f, "'{}': {}", path.display(), err),
            Error::Article(err) => write!(f, "{}", err),
            Error::Converter { path, err } => {
                write!(f, "Converting '{}': {}", path.display(), err)
            }
            Error::Template(err) => write!(f, "{}", err),
            Error::Write(err) => write!(f, "{}", err),
            Error::Feed(err) => write!(f, "{}", err),
            Error::Assets(err) => write!(f, "{}", err),
            Error::Json(err) => write!(f, "Serializing search data: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Date(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::Io { err, .. } => Some(err),
            Error::Article(err) => Some(err),
            Error::Converter { err, .. } => Some(err),
            Error::Template(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Assets(err) => Some(err),
            Error::Json(err) => Some(err),
        }
    }
}

impl From<date::Error> for Error {
    fn from(err: date::Error) -> Error {
        Error::Date(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl From<article::Error> for Error {
    /// Converts [`article::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: article::Error) -> Error {
        Error::Article(err)
    }
}

impl From<template::Error> for Error {
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl From<write::Error> for Error {
    /// Converts [`write::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: write::Error) -> Error {
        Error::Write(err)
    }
}

impl From<feed::Error> for Error {
    /// Converts [`feed::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: feed::Error) -> Error {
        Error::Feed(err)
    }
}

impl From<assets::Error> for Error {
    fn from(err: assets::Error) -> Error {
        Error::Assets(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}
