//! A small template engine for page fragments.
//!
//! Templates live in one directory as `<name>.html` or `<name>.xml`. They
//! are read the first time they are asked for, stripped of HTML comments
//! and blank lines, and cached for the lifetime of the [`Templates`]
//! value. Placeholders are written `%(key)s` (`%(key)d` is accepted too)
//! and `%%` produces a literal percent sign. A placeholder whose key is in
//! neither the per-call [`Context`] nor the defaults is an error, never an
//! empty string.

use regex::Regex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Key/value data substituted into a template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context(BTreeMap<String, String>);

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    /// Builder-style [`Context::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Context {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Context {
        Context(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Loads, caches and renders named templates. The defaults layer (site
/// configuration) is fixed at construction time.
pub struct Templates {
    directory: PathBuf,
    defaults: Context,
    cache: RefCell<HashMap<String, Rc<str>>>,
}

impl Templates {
    /// Creates an engine reading templates from `directory`. Nothing is
    /// read until the first [`Templates::render`] call.
    pub fn new(directory: impl Into<PathBuf>, defaults: Context) -> Templates {
        Templates {
            directory: directory.into(),
            defaults,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn defaults(&self) -> &Context {
        &self.defaults
    }

    /// Renders the template `name` with `data` layered over the defaults;
    /// keys in `data` win.
    pub fn render(&self, name: &str, data: &Context) -> Result<String> {
        let source = self.source(name)?;
        substitute(name, &source, &self.defaults, data)
    }

    /// Returns the cleaned template text, reading it on first use.
    fn source(&self, name: &str) -> Result<Rc<str>> {
        if let Some(source) = self.cache.borrow().get(name) {
            return Ok(Rc::clone(source));
        }
        let source: Rc<str> = clean(&self.read(name)?).into();
        self.cache
            .borrow_mut()
            .insert(name.to_owned(), Rc::clone(&source));
        Ok(source)
    }

    fn read(&self, name: &str) -> Result<String> {
        for extension in ["html", "xml"] {
            let path = self.directory.join(format!("{}.{}", name, extension));
            match std::fs::read_to_string(&path) {
                Ok(contents) => return Ok(contents),
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(Error::Io { path, err }),
            }
        }
        Err(Error::NotFound {
            name: name.to_owned(),
            directory: self.directory.clone(),
        })
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

/// Drops HTML comments, blank lines and surrounding whitespace.
pub fn clean(raw: &str) -> String {
    let without_comments = COMMENT.replace_all(raw, "");
    without_comments
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Fills the placeholders of `source`. `template` only names the template
/// in errors.
pub fn substitute(
    template: &str,
    source: &str,
    defaults: &Context,
    data: &Context,
) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(i) = rest.find('%') {
        out.push_str(&rest[..i]);
        let after = &rest[i + 1..];

        if let Some(after) = after.strip_prefix('%') {
            out.push('%');
            rest = after;
        } else if let Some(placeholder) = after.strip_prefix('(') {
            let malformed = || Error::MalformedPlaceholder {
                template: template.to_owned(),
                offset: source.len() - rest.len() + i,
            };
            let close = placeholder.find(')').ok_or_else(malformed)?;
            let key = &placeholder[..close];
            match placeholder[close + 1..].chars().next() {
                Some('s') | Some('d') => {}
                _ => return Err(malformed()),
            }
            let value = data
                .get(key)
                .or_else(|| defaults.get(key))
                .ok_or_else(|| Error::MissingPlaceholder {
                    template: template.to_owned(),
                    key: key.to_owned(),
                })?;
            out.push_str(value);
            rest = &placeholder[close + 2..];
        } else {
            // a lone `%` (e.g. `width: 100%`) is kept verbatim
            out.push('%');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or rendering a template.
#[derive(Debug)]
pub enum Error {
    /// Returned when neither `<name>.html` nor `<name>.xml` exists.
    NotFound { name: String, directory: PathBuf },

    /// Returned for other I/O problems reading a template file.
    Io { path: PathBuf, err: io::Error },

    /// Returned when a placeholder key is in neither the data nor the
    /// defaults.
    MissingPlaceholder { template: String, key: String },

    /// Returned for a `%(` without a closing `)s`.
    MalformedPlaceholder { template: String, offset: usize },
}

impl Error {
    /// The template directory or file the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::NotFound { directory, .. } => Some(directory),
            Error::Io { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound { name, directory } => write!(
                f,
                "template `{}` not found in '{}'",
                name,
                directory.display()
            ),
            Error::Io { path, err } => {
                write!(f, "Reading template file '{}': {}", path.display(), err)
            }
            Error::MissingPlaceholder { template, key } => write!(
                f,
                "template `{}` references `{}`, which has no value",
                template, key
            ),
            Error::MalformedPlaceholder { template, offset } => write!(
                f,
                "template `{}` has a malformed placeholder at byte {}",
                template, offset
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("foo.html"), "<span>foo</span>").unwrap();
        std::fs::write(
            dir.path().join("bar.xml"),
            "<?xml version=\"1.0\"?>\n<bar>bar</bar>\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("baz.html"),
            "\n\n\n   <p>baz</p>       \n  <!-- comment\n comment 2nd line -->\n            \n\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("title.html"), "<h1>%(title)s</h1> %(site_name)s").unwrap();
        dir
    }

    #[test]
    fn test_render_loads_and_caches() {
        let dir = fixture();
        let templates = Templates::new(dir.path(), Context::new());

        assert_eq!(templates.render("foo", &Context::new()).unwrap(), "<span>foo</span>");
        assert_eq!(templates.cached(), 1);
        assert_eq!(
            templates.render("bar", &Context::new()).unwrap(),
            "<?xml version=\"1.0\"?>\n<bar>bar</bar>"
        );
        assert_eq!(templates.render("baz", &Context::new()).unwrap(), "<p>baz</p>");
        assert_eq!(templates.cached(), 3);

        // served from the cache even after the file disappears
        std::fs::remove_file(dir.path().join("foo.html")).unwrap();
        assert_eq!(templates.render("foo", &Context::new()).unwrap(), "<span>foo</span>");
        assert_eq!(templates.cached(), 3);
    }

    #[test]
    fn test_render_unknown_template() {
        let dir = fixture();
        let templates = Templates::new(dir.path(), Context::new());
        match templates.render("nope", &Context::new()) {
            Err(Error::NotFound { name, .. }) => assert_eq!(name, "nope"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_render_layers_defaults() {
        let dir = fixture();
        let defaults = Context::new().with("site_name", "Kiroku").with("title", "default");
        let templates = Templates::new(dir.path(), defaults);

        assert_eq!(
            templates.render("title", &Context::new()).unwrap(),
            "<h1>default</h1> Kiroku"
        );
        let data = Context::new().with("title", "Hello").with("unused", "x");
        let first = templates.render("title", &data).unwrap();
        assert_eq!(first, "<h1>Hello</h1> Kiroku");
        assert_eq!(templates.render("title", &data).unwrap(), first);
    }

    #[test]
    fn test_substitute() {
        let none = Context::new();
        assert_eq!(substitute("t", "blah", &none, &none).unwrap(), "blah");
        assert_eq!(
            substitute("t", "100%% of %(n)d", &none, &Context::new().with("n", "3")).unwrap(),
            "100% of 3"
        );
        assert_eq!(substitute("t", "width: 50%;", &none, &none).unwrap(), "width: 50%;");

        let defaults = Context::new().with("bar", "2");
        assert_eq!(
            substitute("t", "blah %(foo)s, %(bar)s", &defaults, &Context::new().with("foo", "1"))
                .unwrap(),
            "blah 1, 2"
        );
        assert_eq!(
            substitute(
                "t",
                "blah %(foo)s, %(bar)s",
                &defaults,
                &Context::new().with("foo", "1").with("bar", "3")
            )
            .unwrap(),
            "blah 1, 3"
        );
    }

    #[test]
    fn test_substitute_missing_key() {
        let none = Context::new();
        match substitute("page", "blah %(foo)s, %(bar)s", &none, &Context::new().with("foo", "1")) {
            Err(Error::MissingPlaceholder { template, key }) => {
                assert_eq!(template, "page");
                assert_eq!(key, "bar");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_substitute_malformed() {
        let none = Context::new();
        assert!(matches!(
            substitute("t", "a %(foo", &none, &none),
            Err(Error::MalformedPlaceholder { offset: 2, .. })
        ));
        assert!(matches!(
            substitute("t", "%(foo)x", &none, &Context::new().with("foo", "1")),
            Err(Error::MalformedPlaceholder { .. })
        ));
    }
}
