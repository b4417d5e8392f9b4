//! URL-safe names for articles and tags.
//!
//! The transliteration table is fixed: changing it changes every published
//! URL, so it covers a closed set of Polish diacritics and punctuation and
//! leaves everything else alone.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Extension of every rendered page.
pub const HTML_EXTENSION: &str = ".html";

/// Separator produced for whitespace and quotes. It becomes a hyphen in
/// article file names, but stays as-is in tag URLs.
const SEPARATOR: char = '_';

static DATED_STEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}_(.*)$").unwrap());

/// Maps `s` through the transliteration table. Diacritics become plain
/// ASCII letters, spaces and quotes become `_`, `&` becomes `and`, other
/// punctuation in the table is dropped.
pub fn transliterate(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'ą' => out.push('a'),
            'ć' => out.push('c'),
            'ę' => out.push('e'),
            'ł' => out.push('l'),
            'ń' => out.push('n'),
            'ó' => out.push('o'),
            'ś' => out.push('s'),
            'ź' | 'ż' => out.push('z'),
            'Ą' => out.push('A'),
            'Ć' => out.push('C'),
            'Ę' => out.push('E'),
            'Ł' => out.push('L'),
            'Ń' => out.push('N'),
            'Ó' => out.push('O'),
            'Ś' => out.push('S'),
            'Ź' | 'Ż' => out.push('Z'),
            ' ' | '\'' | '"' => out.push(SEPARATOR),
            '&' => out.push_str("and"),
            '!' | '#' | '$' | '%' | '(' | ')' | '*' | '+' | ',' | '.' | '/' | ':' | ';' | '<'
            | '=' | '>' | '?' | '@' | '[' | '\\' | ']' | '^' | '`' | '{' | '|' | '}' | '~' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Derives the output file name (slug + `.html`) for an article source
/// path. A `YYYY-MM-DD_` prefix on the file stem is discarded.
///
/// ```
/// use std::path::Path;
/// assert_eq!(
///     kiroku::slug::file_name(Path::new("articles/2000-04-01_This is a joke.rst")),
///     "This-is-a-joke.html",
/// );
/// ```
pub fn file_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    let name = transliterate(&stem);

    let slug = match DATED_STEM.captures(&name).and_then(|c| c.get(1)) {
        Some(rest) => rest.as_str(),
        None => name.as_str(),
    };

    let mut file_name = slug.replace(SEPARATOR, "-");
    file_name.push_str(HTML_EXTENSION);
    file_name
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transliterate_tag() {
        assert_eq!(transliterate("bar baz"), "bar_baz");
        assert_eq!(transliterate("Zażółć gęślą jaźń"), "Zazolc_gesla_jazn");
        assert_eq!(transliterate("rock & roll"), "rock_and_roll");
        assert_eq!(transliterate("C++"), "C");
    }

    #[test]
    fn test_file_name_plain() {
        assert_eq!(file_name(Path::new("foobar")), "foobar.html");
        assert_eq!(file_name(Path::new("foobar?")), "foobar.html");
        assert_eq!(file_name(Path::new("some_name.rst")), "some-name.html");
    }

    #[test]
    fn test_file_name_punctuation() {
        assert_eq!(
            file_name(Path::new("~fo'o'bar. Oto smok!!!.txt")),
            "fo-o-bar-Oto-smok.html"
        );
        assert_eq!(
            file_name(Path::new(
                "\\who is using such silly names?. żółty smok%.article"
            )),
            "who-is-using-such-silly-names-zolty-smok.html"
        );
    }

    #[test]
    fn test_file_name_dated() {
        assert_eq!(
            file_name(Path::new("2000-04-01_This is a joke.rst")),
            "This-is-a-joke.html"
        );
        assert_eq!(
            file_name(Path::new("articles/2013-09-08_first_post.rst")),
            "first-post.html"
        );
        // not a full date, kept whole
        assert_eq!(file_name(Path::new("2013-09_post.rst")), "2013-09-post.html");
    }
}
