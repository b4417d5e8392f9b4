//! Builds the word index the client-side search runs against.
//!
//! Rendered article bodies are tokenized as HTML, every word is weighted by
//! the innermost open element around it (headings and links count more
//! than running text) and the per-article sums are collected into posting
//! lists keyed by word. No stemming or other lexical analysis is done.
//!
//! The tokenizer is deliberately forgiving: article HTML comes out of a
//! converter we don't control, so unbalanced or half-written markup must
//! never fail indexing.

use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// One lexical unit of an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `<name ...>`; `self_closing` is set for `<name ... />`.
    Start { name: String, self_closing: bool },

    /// `</name>`
    End(String),

    /// Character data with entities decoded.
    Text(Cow<'a, str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    /// Just after a `<`.
    TagOpen,
    StartTagName,
    /// Inside a start tag, after its name.
    Attributes,
    Quoted(char),
    /// Just after `</`.
    EndTagOpen,
    EndTagName,
    /// Inside an end tag, after its name.
    EndTagRest,
    /// `<!...>` or `<?...>`, skipped.
    Declaration,
    /// `<!-- ... -->`, skipped.
    Comment,
}

/// A finite-state HTML tokenizer. Comments, doctypes and processing
/// instructions are skipped, a `<` that can't start markup is text, and
/// markup left unterminated at the end of input is dropped.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Tokenizer<'a> {
        Tokenizer { input, pos: 0 }
    }

    fn text(&self, from: usize, to: usize) -> Token<'a> {
        Token::Text(decode_entities(&self.input[from..to]))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let input = self.input;
        let start = self.pos;
        let mut text_start = start;
        let mut tag_start = start;
        let mut state = State::Data;
        let mut name = String::new();
        let mut last = '\0';

        for (offset, c) in input[start..].char_indices() {
            let i = start + offset;
            match state {
                State::Data => {
                    if c == '<' {
                        tag_start = i;
                        state = State::TagOpen;
                    }
                }
                State::TagOpen => {
                    let markup = match c {
                        '/' => Some(State::EndTagOpen),
                        '!' | '?' => Some(State::Declaration),
                        c if c.is_ascii_alphabetic() => {
                            name.push(c.to_ascii_lowercase());
                            Some(State::StartTagName)
                        }
                        _ => None,
                    };
                    match markup {
                        // flush the pending text first, markup is rescanned
                        // on the next call
                        Some(_) if tag_start > text_start => {
                            self.pos = tag_start;
                            return Some(self.text(text_start, tag_start));
                        }
                        Some(next) => state = next,
                        None if c == '<' => tag_start = i,
                        None => state = State::Data,
                    }
                }
                State::StartTagName => match c {
                    '>' => {
                        self.pos = i + 1;
                        return Some(Token::Start {
                            name,
                            self_closing: false,
                        });
                    }
                    c if c.is_whitespace() || c == '/' => state = State::Attributes,
                    c => name.push(c.to_ascii_lowercase()),
                },
                State::Attributes => match c {
                    '"' | '\'' => state = State::Quoted(c),
                    '>' => {
                        self.pos = i + 1;
                        return Some(Token::Start {
                            name,
                            self_closing: last == '/',
                        });
                    }
                    _ => {}
                },
                State::Quoted(quote) => {
                    if c == quote {
                        state = State::Attributes;
                    }
                }
                State::EndTagOpen => match c {
                    c if c.is_ascii_alphabetic() => {
                        name.push(c.to_ascii_lowercase());
                        state = State::EndTagName;
                    }
                    '>' => {
                        text_start = i + 1;
                        state = State::Data;
                    }
                    _ => state = State::Declaration,
                },
                State::EndTagName => match c {
                    '>' => {
                        self.pos = i + 1;
                        return Some(Token::End(name));
                    }
                    c if c.is_whitespace() || c == '/' => state = State::EndTagRest,
                    c => name.push(c.to_ascii_lowercase()),
                },
                State::EndTagRest => {
                    if c == '>' {
                        self.pos = i + 1;
                        return Some(Token::End(name));
                    }
                }
                State::Declaration => {
                    if i == tag_start + 2 && input[tag_start..].starts_with("<!--") {
                        state = State::Comment;
                    } else if c == '>' {
                        text_start = i + 1;
                        state = State::Data;
                    }
                }
                State::Comment => {
                    if c == '>' && i >= tag_start + 6 && input[..i].ends_with("--") {
                        text_start = i + 1;
                        state = State::Data;
                    }
                }
            }
            last = c;
        }

        self.pos = input.len();
        match state {
            State::Data | State::TagOpen if text_start < input.len() => {
                Some(self.text(text_start, input.len()))
            }
            _ => None,
        }
    }
}

/// Decodes named and numeric character references. Unknown names are kept
/// as is.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(s)
}

/// Elements that never have content and so are never pushed on the stack.
fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "param" | "source" | "track" | "wbr"
    )
}

/// Weight of a word whose innermost enclosing element is `element`.
pub fn element_weight(element: Option<&str>) -> u32 {
    match element {
        Some("h1" | "h2" | "h3") => 4,
        Some("h4" | "h5" | "h6" | "a") => 3,
        Some("b" | "strong" | "i" | "em") => 2,
        _ => 1,
    }
}

/// Splits on anything that isn't a letter, digit or underscore and
/// lowercases the pieces.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Sums the weights of every word of `html`. Words of a single character
/// are left out.
pub fn word_weights(html: &str) -> BTreeMap<String, u32> {
    let mut stack: Vec<String> = Vec::new();
    let mut weights: BTreeMap<String, u32> = BTreeMap::new();

    for token in Tokenizer::new(html) {
        match token {
            Token::Start { name, self_closing } => {
                if !self_closing && !is_void(&name) {
                    stack.push(name);
                }
            }
            // any end tag closes the innermost element, whatever its name
            Token::End(name) => {
                if stack.pop().is_none() {
                    log::trace!("ignoring unmatched `</{}>`", name);
                }
            }
            Token::Text(text) => {
                let weight = element_weight(stack.last().map(String::as_str));
                for word in words(&text) {
                    *weights.entry(word).or_insert(0) += weight;
                }
            }
        }
    }

    weights.retain(|word, _| word.chars().count() > 1);
    weights
}

/// An `(article ordinal, weight)` pair. Serializes as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Posting(pub usize, pub u32);

/// The `search.json` document: `a` holds one rendered headline per article
/// in the order they were added, `w` maps each word to its postings.
#[derive(Debug, Default, Serialize)]
pub struct SearchIndex {
    #[serde(rename = "a")]
    headlines: Vec<String>,

    #[serde(rename = "w")]
    words: BTreeMap<String, Vec<Posting>>,
}

impl SearchIndex {
    pub fn new() -> SearchIndex {
        SearchIndex::default()
    }

    /// Indexes one article and returns its ordinal. Each word gets at most
    /// one posting per article, carrying the article's summed weight.
    pub fn add(&mut self, headline: String, body_html: &str) -> usize {
        let ordinal = self.headlines.len();
        self.headlines.push(headline);
        for (word, weight) in word_weights(body_html) {
            self.words
                .entry(word)
                .or_default()
                .push(Posting(ordinal, weight));
        }
        ordinal
    }

    pub fn len(&self) -> usize {
        self.headlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headlines.is_empty()
    }

    pub fn postings(&self, word: &str) -> &[Posting] {
        self.words.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(html: &str) -> Vec<Token<'_>> {
        Tokenizer::new(html).collect()
    }

    fn start(name: &str) -> Token<'static> {
        Token::Start {
            name: name.to_owned(),
            self_closing: false,
        }
    }

    fn text(s: &str) -> Token<'_> {
        Token::Text(Cow::Borrowed(s))
    }

    #[test]
    fn test_tokenizer() {
        assert_eq!(
            tokens("<h1 class=\"a>b\">Foo</H1><!-- x > y --><p>1 &lt; 2<br/></p>"),
            vec![
                start("h1"),
                text("Foo"),
                Token::End("h1".to_owned()),
                start("p"),
                Token::Text(Cow::Owned("1 < 2".to_owned())),
                Token::Start {
                    name: "br".to_owned(),
                    self_closing: true
                },
                Token::End("p".to_owned()),
            ]
        );
    }

    #[test]
    fn test_tokenizer_stray_angle_brackets() {
        assert_eq!(tokens("a < b <"), vec![text("a < b <")]);
        assert_eq!(tokens("x</>y"), vec![text("x"), text("y")]);
        assert_eq!(tokens("<p>unterminated <b"), vec![start("p"), text("unterminated ")]);
        assert_eq!(tokens("<!DOCTYPE html>z"), vec![text("z")]);
    }

    #[test]
    fn test_word_weights_by_element() {
        let weights = word_weights("<h1>Foo</h1><p>foo bar</p>");
        assert_eq!(weights.get("foo"), Some(&5));
        assert_eq!(weights.get("bar"), Some(&1));
        assert_eq!(weights.len(), 2);
    }

    #[test]
    fn test_word_weights_skip_single_characters() {
        let weights = word_weights("<p>a b cd 1 23 é</p>");
        assert_eq!(weights.keys().collect::<Vec<_>>(), vec!["23", "cd"]);
    }

    #[test]
    fn test_word_weights_decode_named_entities() {
        let weights = word_weights("<p>foo&mdash;bar caf&eacute; wait&hellip; it&rsquo;s &#x41;bc</p>");
        assert_eq!(
            weights.keys().collect::<Vec<_>>(),
            vec!["abc", "bar", "café", "foo", "it", "wait"]
        );
        assert_eq!(decode_entities("&eacute;&hellip;&unknown;"), "é…&unknown;");
    }

    #[test]
    fn test_word_weights_tolerate_underflow() {
        let weights = word_weights("</p></div>text <h2>head</h2></h2></h2> tail");
        assert_eq!(weights.get("text"), Some(&1));
        assert_eq!(weights.get("head"), Some(&4));
        assert_eq!(weights.get("tail"), Some(&1));
    }

    #[test]
    fn test_word_weights_malformed_document() {
        let html = "<h2>articletitle</h2>
<p>This is an article about <b>Articletitle</b></p>
<p>How about <i>some</i> <i><b>nested</b></i> content?</p>
<p>And what about 喜六 i18n stuff? zażółć gęślą jaźń</p>
<pre
<div class=\"highlight\"><pre><span class=\"gp\"> code </span> <span
class=\"nv\">SOME_MORE_CODE</span>
</pre></div>
<p>Or, the <code>inline_code</code><p>";

        let wanted: BTreeMap<String, u32> = [
            ("and", 1),
            ("code", 1),
            ("zażółć", 1),
            ("is", 1),
            ("some", 2),
            ("inline_code", 1),
            ("an", 1),
            ("i18n", 1),
            ("gęślą", 1),
            ("articletitle", 6),
            ("article", 1),
            ("nested", 2),
            ("what", 1),
            ("this", 1),
            ("or", 1),
            ("content", 1),
            ("how", 1),
            ("stuff", 1),
            ("jaźń", 1),
            ("about", 3),
            ("the", 1),
            ("喜六", 1),
            ("some_more_code", 1),
        ]
        .into_iter()
        .map(|(word, weight)| (word.to_owned(), weight))
        .collect();

        assert_eq!(word_weights(html), wanted);
    }

    #[test]
    fn test_search_index_postings() {
        let mut index = SearchIndex::new();
        assert_eq!(index.to_json().unwrap(), r#"{"a":[],"w":{}}"#);

        assert_eq!(index.add("<p>foo</p>".to_owned(), "foo common"), 0);
        assert_eq!(index.add("<p>bar</p>".to_owned(), "<h3>bar</h3> common common"), 1);

        assert_eq!(index.postings("foo"), &[Posting(0, 1)]);
        assert_eq!(index.postings("bar"), &[Posting(1, 4)]);
        assert_eq!(index.postings("common"), &[Posting(0, 1), Posting(1, 2)]);
        assert_eq!(
            index.to_json().unwrap(),
            r#"{"a":["<p>foo</p>","<p>bar</p>"],"w":{"bar":[[1,4]],"common":[[0,1],[1,2]],"foo":[[0,1]]}}"#
        );
    }
}
