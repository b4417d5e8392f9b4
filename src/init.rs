//! Scaffolding of new projects. The files of a fresh project are compiled
//! into the binary.

use crate::util::{self, at, PathError};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Every file of a new project, relative to its root.
pub const SCAFFOLD: &[(&str, &str)] = &[
    (
        "articles/2024-01-01_Hello_world.rst",
        include_str!("../data/articles/2024-01-01_Hello_world.rst"),
    ),
    ("articles/about.rst", include_str!("../data/articles/about.rst")),
    (".css/style.css", include_str!("../data/css/style.css")),
    (".js/search.js", include_str!("../data/js/search.js")),
    (
        ".templates/main.html",
        include_str!("../data/templates/main.html"),
    ),
    (
        ".templates/header.html",
        include_str!("../data/templates/header.html"),
    ),
    (
        ".templates/headline.html",
        include_str!("../data/templates/headline.html"),
    ),
    (
        ".templates/article_short.html",
        include_str!("../data/templates/article_short.html"),
    ),
    (
        ".templates/article_header.html",
        include_str!("../data/templates/article_header.html"),
    ),
    (
        ".templates/article_footer.html",
        include_str!("../data/templates/article_footer.html"),
    ),
    (
        ".templates/article_tag.html",
        include_str!("../data/templates/article_tag.html"),
    ),
    (".templates/tag.html", include_str!("../data/templates/tag.html")),
    (
        ".templates/rss_item.xml",
        include_str!("../data/templates/rss_item.xml"),
    ),
    (
        ".templates/rss_main.xml",
        include_str!("../data/templates/rss_main.xml"),
    ),
    ("kiroku.yaml.example", include_str!("../data/kiroku.yaml.example")),
];

/// Creates a project at `target`. An existing `target` is an error unless
/// `force` is set, in which case it is removed first.
pub fn init(target: &Path, force: bool) -> Result<()> {
    if fs::symlink_metadata(target).is_ok() {
        if !force {
            return Err(Error::Exists(target.to_owned()));
        }
        log::warn!("Removing existing '{}'", target.display());
        util::remove(target)?;
    }

    log::info!("Initializing '{}'", target.display());
    for (relative, contents) in SCAFFOLD {
        let path = target.join(relative);
        if let Some(parent) = path.parent() {
            at(parent, fs::create_dir_all(parent))?;
        }
        log::debug!("Writing '{}'", path.display());
        at(&path, fs::write(&path, contents))?;
    }
    Ok(())
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Returned when the target exists and removing it wasn't asked for.
    Exists(PathBuf),

    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Exists(path) => write!(
                f,
                "'{}' already exists, use --force to replace it",
                path.display()
            ),
            Error::Io { path, err } => write!(f, "'{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Exists(_) => None,
            Error::Io { err, .. } => Some(err),
        }
    }
}

impl From<PathError> for Error {
    fn from((path, err): PathError) -> Error {
        Error::Io { path, err }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::build::build_site;
    use crate::config::Config;
    use crate::converter::RestConverter;
    use tempfile::TempDir;

    #[test]
    fn test_init() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("blog");
        init(&target, false).unwrap();
        for (relative, contents) in SCAFFOLD {
            assert_eq!(&fs::read_to_string(target.join(relative)).unwrap(), contents);
        }
    }

    #[test]
    fn test_init_existing_target() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stray.txt"), "stray").unwrap();

        match init(dir.path(), false) {
            Err(Error::Exists(path)) => assert_eq!(path, dir.path()),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(dir.path().join("stray.txt").exists());

        init(dir.path(), true).unwrap();
        assert!(!dir.path().join("stray.txt").exists());
        assert!(dir.path().join(".templates/main.html").is_file());
    }

    #[test]
    fn test_search_script_escapes_phrase() {
        let (_, script) = SCAFFOLD
            .iter()
            .find(|(relative, _)| *relative == ".js/search.js")
            .unwrap();
        assert!(script.contains("values = {sp: escapeHtml(phrase)}"));
        assert!(!script.contains("{sp: phrase}"));
        for (raw, escaped) in [("&", "&amp;"), ("<", "&lt;"), (">", "&gt;"), ("\"", "&quot;")] {
            assert!(script.contains(&format!("\"{}\")", escaped)), "{} is not escaped", raw);
        }
    }

    #[test]
    fn test_scaffold_builds() {
        let dir = TempDir::new().unwrap();
        init(dir.path(), true).unwrap();
        let config = Config::from_directory(dir.path()).unwrap();
        build_site(&config, &RestConverter).unwrap();

        let build = dir.path().join("build");
        for name in [
            "index.html",
            "Hello-world.html",
            "about.html",
            "archives.html",
            "tag-kiroku.html",
            "tag-meta.html",
            "rss.xml",
            "search.json",
            "templates.json",
            "css/style.css",
            "js/search.js",
        ] {
            assert!(build.join(name).is_file(), "{} is missing", name);
        }

        let index = fs::read_to_string(build.join("index.html")).unwrap();
        assert!(index.contains(r#"<a href="/Hello-world.html">Hello world</a>"#));
        assert!(index.contains(r#"<li class="current">"#));
        assert!(!index.contains("Articles are plain"));
    }
}
