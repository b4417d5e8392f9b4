//! Composes and writes the HTML pages of the site.
//!
//! Every page is the `main` template filled with a [`Page`]. The fragments
//! that go into a page (headlines, teasers, article headers and footers,
//! tag links) are rendered here as well.

use crate::article::Article;
use crate::slug::{transliterate, HTML_EXTENSION};
use crate::tag::TagIndex;
use crate::template::{self, Context, Templates};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Number of teasers on the front page; older articles go to the archive.
pub const INDEX_ARTICLES: usize = 5;

pub const INDEX_FILE: &str = "index.html";
pub const ARCHIVE_FILE: &str = "archives.html";
pub const ABOUT_FILE: &str = "about.html";

/// The navigation entry a page is shown under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nav {
    Index,
    Archive,
    About,
}

/// The typed context of the `main` template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Page-specific part of `<title>`; empty for the front page.
    pub title: String,
    pub header: String,
    pub body: String,
    pub footer: String,
    pub nav: Option<Nav>,
}

impl Page {
    /// Converts a [`Page`] into a [`Context`]. The navigation entry becomes
    /// `class_index`, `class_arch` and `class_about`, of which the current
    /// one is `current` and the others are empty.
    fn to_context(&self, tag_cloud: &str) -> Context {
        let class = |nav| if self.nav == Some(nav) { "current" } else { "" };
        let title = if self.title.is_empty() {
            String::new()
        } else {
            format!("{} - ", self.title)
        };
        Context::new()
            .with("title", title)
            .with("header", self.header.as_str())
            .with("body", self.body.as_str())
            .with("footer", self.footer.as_str())
            .with("tag_cloud", tag_cloud)
            .with("class_index", class(Nav::Index))
            .with("class_arch", class(Nav::Archive))
            .with("class_about", class(Nav::About))
    }
}

/// Responsible for templating and writing HTML pages to disk from
/// [`Article`] sources.
pub struct Writer<'a> {
    /// The templates; their defaults carry the site settings.
    pub templates: &'a Templates,

    /// The rendered tag cloud, shown on every page.
    pub tag_cloud: &'a str,

    /// The directory pages are written to.
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, file_name: &str, page: &Page) -> Result<()> {
        let html = self
            .templates
            .render("main", &page.to_context(self.tag_cloud))?;
        let path = self.output_directory.join(file_name);
        log::debug!("Writing '{}'", path.display());
        std::fs::write(&path, html).map_err(|err| Error::Io { path, err })
    }

    /// A UI string from the template defaults.
    fn text(&self, key: &str) -> &str {
        self.templates.defaults().get(key).unwrap_or_default()
    }

    fn header(&self, title: &str) -> Result<String> {
        Ok(self
            .templates
            .render("header", &Context::new().with("title", title))?)
    }

    /// Renders each tag through `article_tag`, joined by `", "`.
    pub fn join_tags(&self, tags: &[String]) -> Result<String> {
        let mut links = Vec::with_capacity(tags.len());
        for tag in tags {
            let data = Context::new()
                .with("tag", tag.as_str())
                .with("tag_url", transliterate(tag));
            links.push(self.templates.render("article_tag", &data)?);
        }
        Ok(links.join(", "))
    }

    /// The fields shared by headlines and teasers.
    fn article_fields(&self, article: &Article) -> Result<Context> {
        Ok(Context::new()
            .with("article_url", article.file_name())
            .with("title", article.title())
            .with("datetime", article.created_rfc3339())
            .with("human_date", article.created_short())
            .with("tags", self.join_tags(article.tags())?))
    }

    /// The `headline` fragment of `article`, as used on listing pages and in
    /// the search index.
    pub fn headline(&self, article: &Article) -> Result<String> {
        Ok(self
            .templates
            .render("headline", &self.article_fields(article)?)?)
    }

    /// Writes the page of one article.
    pub fn write_article(&self, article: &Article) -> Result<()> {
        let header = self.templates.render(
            "article_header",
            &Context::new()
                .with("title", article.title())
                .with("datetime", article.created_rfc3339())
                .with("human_date", article.created_short()),
        )?;
        let footer = self.templates.render(
            "article_footer",
            &Context::new()
                .with("rfc_date", article.created_rfc3339())
                .with("datetime", article.created_detailed())
                .with("human_date", article.created_detailed())
                .with("tags", self.join_tags(article.tags())?),
        )?;
        self.write_page(
            article.file_name(),
            &Page {
                title: article.title().to_owned(),
                header,
                body: article.body().to_owned(),
                footer,
                nav: Some(Nav::Index),
            },
        )
    }

    /// Writes the front page: teasers of the first [`INDEX_ARTICLES`]
    /// articles.
    pub fn write_index(&self, articles: &[Article]) -> Result<()> {
        let mut teasers = Vec::with_capacity(INDEX_ARTICLES);
        for article in articles.iter().take(INDEX_ARTICLES) {
            let mut data = self.article_fields(article)?;
            data.insert("short_body", article.short_body());
            teasers.push(self.templates.render("article_short", &data)?);
        }
        self.write_page(
            INDEX_FILE,
            &Page {
                body: teasers.join(" "),
                nav: Some(Nav::Index),
                ..Page::default()
            },
        )
    }

    /// Writes the archive: headlines of every article not on the front page.
    pub fn write_archive(&self, articles: &[Article]) -> Result<()> {
        let rest = articles.get(INDEX_ARTICLES..).unwrap_or(&[]);
        let title = self.text("i18n_archives");
        self.write_page(
            ARCHIVE_FILE,
            &Page {
                title: title.to_owned(),
                header: self.header(title)?,
                body: self.headlines(rest.iter())?,
                footer: String::new(),
                nav: Some(Nav::Archive),
            },
        )
    }

    /// Writes one `tag-<tag>.html` page per tag, listing its members in
    /// registration order. Members missing from `articles` are skipped.
    pub fn write_tag_pages(&self, tags: &TagIndex, articles: &[Article]) -> Result<()> {
        let by_path: HashMap<&Path, &Article> = articles
            .iter()
            .map(|article| (article.path(), article))
            .collect();

        for (tag, members) in tags.iter() {
            let members = members
                .iter()
                .filter_map(|path| by_path.get(path.as_path()).copied());
            let title = self.text("i18n_art_tags").replace("%s", tag);
            self.write_page(
                &tag_file_name(tag),
                &Page {
                    header: self.header(&title)?,
                    title,
                    body: self.headlines(members)?,
                    footer: String::new(),
                    nav: Some(Nav::Index),
                },
            )?;
        }
        Ok(())
    }

    /// Writes the about page from its converted body.
    pub fn write_about(&self, body: &str) -> Result<()> {
        let title = self.text("i18n_about");
        self.write_page(
            ABOUT_FILE,
            &Page {
                title: title.to_owned(),
                header: self.header(title)?,
                body: body.to_owned(),
                footer: String::new(),
                nav: Some(Nav::About),
            },
        )
    }

    fn headlines<'b>(&self, articles: impl Iterator<Item = &'b Article>) -> Result<String> {
        let mut headlines = Vec::new();
        for article in articles {
            headlines.push(self.headline(article)?);
        }
        Ok(headlines.join(" "))
    }
}

/// `tag-<transliterated tag>.html`
pub fn tag_file_name(tag: &str) -> String {
    format!("tag-{}{}", transliterate(tag), HTML_EXTENSION)
}

/// The result of writing pages.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error writing a page.
#[derive(Debug)]
pub enum Error {
    /// Returned when a page can't be written.
    Io { path: PathBuf, err: io::Error },

    /// Returned when a page or fragment template fails to render.
    Template(template::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "Writing '{}': {}", path.display(), err),
            Error::Template(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
            Error::Template(err) => Some(err),
        }
    }
}

impl From<template::Error> for Error {
    /// Converts a [`template::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for template rendering.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}
