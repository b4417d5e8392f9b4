//! Support for creating the RSS feed from a list of articles.
//!
//! The feed is assembled from two templates: `rss_item` is rendered once per
//! item and `rss_main` wraps the items (`%(items)s`) in the channel
//! envelope. The builder neither sorts nor truncates; callers pass the
//! articles they want in the order they want them.

use crate::article::Article;
use crate::template::{self, Context, Templates};
use pulldown_cmark::escape::escape_html;
use std::fmt;
use url::Url;

/// The fields of one feed item. Text fields are XML-escaped when rendered.
#[derive(Debug, Clone, Copy)]
pub struct FeedItem<'a> {
    pub title: &'a str,
    pub link: &'a Url,
    pub description: &'a str,
    /// An RFC 822 date.
    pub pub_date: &'a str,
}

impl<'a> FeedItem<'a> {
    /// Describes `article`, published at `link`, by its teaser.
    pub fn from_article(article: &'a Article, link: &'a Url, pub_date: &'a str) -> FeedItem<'a> {
        FeedItem {
            title: article.title(),
            link,
            description: article.short_body(),
            pub_date,
        }
    }
}

/// Accumulates rendered items in insertion order.
pub struct FeedBuilder<'t> {
    templates: &'t Templates,
    items: Vec<String>,
}

impl<'t> FeedBuilder<'t> {
    pub fn new(templates: &'t Templates) -> FeedBuilder<'t> {
        FeedBuilder {
            templates,
            items: Vec::new(),
        }
    }

    /// Renders `item` through `rss_item` and appends it. An item without a
    /// title, description or publication date is rejected.
    pub fn add(&mut self, item: &FeedItem) -> Result<()> {
        let required = [
            ("title", item.title),
            ("description", item.description),
            ("pub_date", item.pub_date),
        ];
        let missing = required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());
        if let Some((field, _)) = missing {
            return Err(Error::MissingField {
                field,
                link: item.link.to_string(),
            });
        }

        let data = Context::new()
            .with("article_title", escape(item.title))
            .with("article_link", escape(item.link.as_str()))
            .with("item_desc", escape(item.description))
            .with("pub_date", escape(item.pub_date));
        self.items.push(self.templates.render("rss_item", &data)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Renders the whole document through `rss_main`.
    pub fn get(&self) -> Result<String> {
        let data = Context::new().with("items", self.items.join("\n"));
        Ok(self.templates.render("rss_main", &data)?)
    }
}

/// Escapes the XML special characters of text content.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // writing to a String can't fail
    let _ = escape_html(&mut out, s);
    out
}

/// The result of a fallible feed operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building the feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when an item lacks a required field.
    MissingField { field: &'static str, link: String },

    /// Returned when a feed template fails to render.
    Template(template::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingField { field, link } => {
                write!(f, "Feed item for '{}' has no {}", link, field)
            }
            Error::Template(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingField { .. } => None,
            Error::Template(err) => Some(err),
        }
    }
}

impl From<template::Error> for Error {
    /// Converts a [`template::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator when rendering.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}
