//! Project configuration: the site settings from `kiroku.yaml` and the
//! layout of the project directory.

use crate::date::{self, Dates};
use crate::template::Context;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Name of the optional settings file at the project root.
pub const PROJECT_FILE: &str = "kiroku.yaml";

/// Built-in English UI strings. Exposed to templates with an `i18n_`
/// prefix; `{sp}` is filled in by the search script.
pub const I18N: &[(&str, &str)] = &[
    ("art_tags", "Articles with tag: %s"),
    ("tags", "Tags"),
    ("about", "About me"),
    ("archives", "Archives"),
    ("main", "Blog"),
    ("rss_feed", "RSS feed"),
    (
        "noscript",
        "Please, enable JavaScript in order to use searching feature.",
    ),
    ("search", "Search"),
    ("search_placeholder", "Search…"),
    ("search_results_title", "Search results"),
    ("search_progress", "Search in progress. Please wait."),
    ("search_results", "Results for phrase \"{sp}\""),
    ("search_not_found", "No results for phrase \"{sp}\""),
    ("subscribe", "Subscribe"),
    ("subscribe_desc", "Subscribe via RSS"),
];

/// The settings a project may override. Anything left out keeps its
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Site {
    pub server_name: String,
    pub server_root: String,
    pub server_protocol: String,
    pub site_name: String,
    pub site_desc: String,
    pub site_footer: String,

    /// A locale name such as `pl_PL.UTF-8`; empty for POSIX names.
    pub locale: String,

    /// A fixed UTC offset such as `+02:00`.
    pub timezone: String,

    /// Overrides for entries of [`I18N`], keyed with or without the
    /// `i18n_` prefix.
    pub i18n: BTreeMap<String, String>,
}

impl Default for Site {
    fn default() -> Self {
        Site {
            server_name: "localhost".to_owned(),
            server_root: "/".to_owned(),
            server_protocol: "http".to_owned(),
            site_name: "Kiroku".to_owned(),
            site_desc: "Yet another blog".to_owned(),
            site_footer: "The footer".to_owned(),
            locale: String::new(),
            timezone: "+00:00".to_owned(),
            i18n: BTreeMap::new(),
        }
    }
}

/// Everything a build needs to know about a project.
#[derive(Debug, Clone)]
pub struct Config {
    pub site: Site,
    pub root_directory: PathBuf,
    pub articles_directory: PathBuf,
    pub templates_directory: PathBuf,
    pub css_directory: PathBuf,
    pub js_directory: PathBuf,
    pub build_directory: PathBuf,
}

impl Config {
    /// Loads the project rooted at `dir`, reading [`PROJECT_FILE`] when it
    /// exists.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        let site = if path.exists() {
            Config::read_site(&path)?
        } else {
            log::debug!("No `{}` in '{}', using defaults", PROJECT_FILE, dir.display());
            Site::default()
        };
        Ok(Config::with_site(dir, site))
    }

    fn read_site(path: &Path) -> Result<Site> {
        use crate::util::open;
        serde_yaml::from_reader(open(path, "project")?)
            .map_err(|e| anyhow!("Loading configuration '{}': {}", path.display(), e))
    }

    /// Lays out a project at `root` with the given settings.
    pub fn with_site(root: &Path, mut site: Site) -> Config {
        site.server_root = normalize_root(&site.server_root);
        Config {
            site,
            root_directory: root.to_owned(),
            articles_directory: root.join("articles"),
            templates_directory: root.join(".templates"),
            css_directory: root.join(".css"),
            js_directory: root.join(".js"),
            build_directory: root.join("build"),
        }
    }

    /// The UI string `key` (without the `i18n_` prefix), overridden or
    /// built in.
    pub fn i18n(&self, key: &str) -> &str {
        self.site
            .i18n
            .get(key)
            .or_else(|| self.site.i18n.get(&format!("i18n_{}", key)))
            .map(String::as_str)
            .or_else(|| {
                I18N.iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| *value)
            })
            .unwrap_or_default()
    }

    /// The default layer of every template: the site settings and all
    /// `i18n_*` strings.
    pub fn template_defaults(&self) -> Context {
        let site = &self.site;
        let mut defaults = Context::new()
            .with("server_name", site.server_name.as_str())
            .with("server_root", site.server_root.as_str())
            .with("server_protocol", site.server_protocol.as_str())
            .with("site_name", site.site_name.as_str())
            .with("site_desc", site.site_desc.as_str())
            .with("site_footer", site.site_footer.as_str())
            .with("locale", site.locale.as_str())
            .with("timezone", site.timezone.as_str());

        for (key, _) in I18N {
            defaults.insert(format!("i18n_{}", key), self.i18n(key));
        }
        for (key, value) in &site.i18n {
            let key = match key.strip_prefix("i18n_") {
                Some(_) => key.clone(),
                None => format!("i18n_{}", key),
            };
            defaults.insert(key, value.as_str());
        }
        defaults
    }

    /// The absolute URL of the site root, e.g. `http://localhost/blog/`.
    pub fn site_url(&self) -> std::result::Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}://{}{}",
            self.site.server_protocol, self.site.server_name, self.site.server_root
        ))
    }

    /// The date settings for articles.
    pub fn dates(&self) -> std::result::Result<Dates, date::Error> {
        Dates::new(&self.site.timezone, &self.site.locale)
    }
}

/// Makes `root` start and end with a slash.
fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", trimmed)
    }
}
