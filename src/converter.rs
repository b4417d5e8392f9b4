//! Converts article sources to HTML.
//!
//! The build only depends on the [`MarkupConverter`] trait; [`RestConverter`]
//! is the shipped implementation. It understands the part of
//! reStructuredText blog posts actually use, translates it line by line to
//! CommonMark and renders that with `pulldown-cmark`.

use pulldown_cmark::{html, Event, Options, Parser, Tag};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Separates an article's teaser from the rest of its body.
pub const MORE_MARKER: &str = "<!-- more -->";

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([^:\s][^:]*):(?:\s+(.*))?$").unwrap());

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][\w-]*)::(?:\s+(.*))?$").unwrap());

static OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+:([A-Za-z][\w-]*):(?:\s+(.*))?$").unwrap());

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-*+]|\d+\.|#\.)\s+").unwrap());

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`<]*?)\s*<([^>`]+)>`__?").unwrap());

/// The output of a conversion: the body HTML and the document's metadata
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Converted {
    pub body: String,

    /// Field names are lowercased; fields with empty values are left out.
    pub attributes: HashMap<String, String>,
}

/// Turns the text of an article source into HTML plus metadata.
pub trait MarkupConverter {
    fn convert(&self, source: &str) -> Result<Converted>;
}

/// Converts reStructuredText.
///
/// The leading field list (`:Title: ...`) becomes the attributes. Section
/// titles are numbered by order of first appearance of their adornment
/// style, the first style rendering as `<h2>`. The `.. more` comment
/// becomes [`MORE_MARKER`] on a line of its own, other comments are
/// dropped, and raw HTML in the source is escaped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestConverter;

impl MarkupConverter for RestConverter {
    fn convert(&self, source: &str) -> Result<Converted> {
        let lines: Vec<&str> = source.lines().collect();
        let (attributes, start) = docinfo(&lines);
        let markdown = Translator::new(&lines[start..], start).run()?;

        let event_converter = EventConverter;
        let mut html = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(
            &mut html,
            Parser::new_ext(&markdown, Options::empty()).map(|ev| event_converter.convert(ev)),
        );

        let marker_line = format!("\n{}\n", MORE_MARKER);
        Ok(Converted {
            body: html.trim().replace(MORE_MARKER, &marker_line),
            attributes,
        })
    }
}

/// Collects the field list at the top of the document. Returns the fields
/// and the index of the first line after them.
fn docinfo(lines: &[&str]) -> (HashMap<String, String>, usize) {
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut pos = lines.iter().take_while(|line| line.trim().is_empty()).count();

    while let Some(line) = lines.get(pos) {
        if let Some(caps) = FIELD.captures(line) {
            let value = caps.get(2).map_or("", |m| m.as_str());
            fields.push((caps[1].trim().to_lowercase(), value.trim().to_owned()));
        } else if is_indented(line) && !line.trim().is_empty() {
            match fields.last_mut() {
                Some((_, value)) => {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(line.trim());
                }
                None => break,
            }
        } else {
            break;
        }
        pos += 1;
    }

    let attributes = fields
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    (attributes, pos)
}

fn is_indented(line: &str) -> bool {
    line.starts_with(char::is_whitespace)
}

/// The character of a section adornment line (`-----`, `=====`, ...).
fn adornment(line: &str) -> Option<char> {
    let line = line.trim_end();
    let c = line.chars().next()?;
    if line.chars().count() < 3 || !c.is_ascii_punctuation() || line.chars().any(|x| x != c) {
        return None;
    }
    Some(c)
}

/// Removes the common leading whitespace and any leading blank lines.
fn dedent(lines: &[&str]) -> Vec<String> {
    let lines: Vec<&str> = lines
        .iter()
        .copied()
        .skip_while(|line| line.trim().is_empty())
        .collect();
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| match line.get(indent..) {
            Some(rest) => rest.trim_end().to_owned(),
            None => line.trim().to_owned(),
        })
        .collect()
}

/// Converts inline reST that CommonMark spells differently and escapes
/// what CommonMark would read as block syntax.
fn inline(line: &str) -> String {
    let line = LINK.replace_all(line, |caps: &Captures| {
        let url = &caps[2];
        let text = if caps[1].is_empty() { url } else { &caps[1] };
        format!("[{}]({})", text, url)
    });
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    match body.chars().next() {
        Some('#') | Some('>') => format!("{}\\{}", indent, body),
        _ => line.into_owned(),
    }
}

/// Translates reST body lines into CommonMark.
struct Translator<'a> {
    lines: &'a [&'a str],
    /// Source line number of `lines[0]`, for error messages.
    offset: usize,
    pos: usize,
    out: Vec<String>,
    /// Adornment styles in order of first appearance: (character, overlined).
    styles: Vec<(char, bool)>,
    in_list: bool,
}

impl<'a> Translator<'a> {
    fn new(lines: &'a [&'a str], offset: usize) -> Translator<'a> {
        Translator {
            lines,
            offset,
            pos: 0,
            out: Vec::new(),
            styles: Vec::new(),
            in_list: false,
        }
    }

    fn run(mut self) -> Result<String> {
        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.trim().is_empty() {
                self.blank();
                self.pos += 1;
            } else if let Some(rest) = explicit_markup(line) {
                self.directive(rest)?;
            } else if self.title() {
                self.in_list = false;
            } else if let Some(c) = adornment(line).filter(|_| self.after_blank()) {
                // a transition
                log::trace!("transition `{}` on line {}", c, self.line_number());
                self.out.push("***".to_owned());
                self.pos += 1;
            } else if is_indented(line) && !self.in_list && self.after_blank() {
                self.block_quote();
            } else {
                self.text(line);
            }
        }

        let mut markdown = self.out.join("\n");
        markdown.push('\n');
        Ok(markdown)
    }

    fn line_number(&self) -> usize {
        self.offset + self.pos + 1
    }

    fn after_blank(&self) -> bool {
        self.out.last().map_or(true, |line| line.is_empty())
    }

    fn blank(&mut self) {
        if !self.after_blank() {
            self.out.push(String::new());
        }
    }

    /// Emits a section title starting at the current line, if there is one.
    fn title(&mut self) -> bool {
        let line = self.lines[self.pos];
        let next = self.lines.get(self.pos + 1).copied().unwrap_or("");
        let after = self.lines.get(self.pos + 2).copied().unwrap_or("");

        let (text, style, consumed) = match adornment(line) {
            Some(c) if !next.trim().is_empty() && adornment(after) == Some(c) => {
                (next.trim(), (c, true), 3)
            }
            Some(_) => return false,
            None => match adornment(next) {
                Some(c) if !is_indented(line) => (line.trim(), (c, false), 2),
                _ => return false,
            },
        };

        let level = match self.styles.iter().position(|s| *s == style) {
            Some(i) => i + 1,
            None => {
                self.styles.push(style);
                self.styles.len()
            }
        };
        self.blank();
        self.out
            .push(format!("{} {}", "#".repeat(level.min(6)), inline(text)));
        self.out.push(String::new());
        self.pos += consumed;
        true
    }

    /// Handles a `..` construct; `rest` is what follows the dots.
    fn directive(&mut self, rest: &str) -> Result<()> {
        let line = self.line_number();
        self.pos += 1;

        if rest == "more" {
            self.skip_block();
            self.blank();
            self.out.push(MORE_MARKER.to_owned());
            self.out.push(String::new());
            return Ok(());
        }

        let caps = match DIRECTIVE.captures(rest) {
            Some(caps) => caps,
            None => {
                // a comment or a hyperlink target
                self.skip_block();
                return Ok(());
            }
        };
        let name = &caps[1];
        let argument = caps.get(2).map_or("", |m| m.as_str().trim());

        match name {
            "code-block" | "sourcecode" | "code" => {
                let (_, body) = self.block(true);
                self.fence(argument, &body);
            }
            "image" => {
                if argument.is_empty() {
                    return Err(Error::Directive {
                        line,
                        name: name.to_owned(),
                        message: "an image URI is required".to_owned(),
                    });
                }
                let (options, _) = self.block(true);
                let alt = options.get("alt").map(String::as_str).unwrap_or("");
                self.blank();
                self.out.push(format!("![{}]({})", alt, argument));
                self.out.push(String::new());
            }
            _ => {
                log::debug!("skipping unsupported directive `{}` on line {}", name, line);
                self.skip_block();
            }
        }
        Ok(())
    }

    /// Consumes the indented block following the current line. With
    /// `options`, leading `:name: value` lines are split off.
    fn block(&mut self, options: bool) -> (HashMap<String, String>, Vec<String>) {
        let start = self.pos;
        let mut end = start;
        let mut pos = start;
        while let Some(line) = self.lines.get(pos) {
            if line.trim().is_empty() {
                pos += 1;
            } else if is_indented(line) {
                pos += 1;
                end = pos;
            } else {
                break;
            }
        }
        self.pos = end;

        let block = &self.lines[start..end];
        let mut parsed = HashMap::new();
        let mut body_start = 0;
        if options {
            for line in block {
                match OPTION.captures(line) {
                    Some(caps) => {
                        let value = caps.get(2).map_or("", |m| m.as_str());
                        parsed.insert(caps[1].to_owned(), value.trim().to_owned());
                        body_start += 1;
                    }
                    None => break,
                }
            }
        }
        (parsed, dedent(&block[body_start..]))
    }

    fn skip_block(&mut self) {
        self.block(false);
    }

    fn fence(&mut self, language: &str, body: &[String]) {
        let longest = body
            .iter()
            .map(|line| line.chars().take_while(|c| *c == '`').count())
            .max()
            .unwrap_or(0);
        let fence = "`".repeat(longest.max(2) + 1);

        self.blank();
        self.out.push(format!("{}{}", fence, language));
        self.out.extend(body.iter().cloned());
        self.out.push(fence);
        self.out.push(String::new());
    }

    fn block_quote(&mut self) {
        let (_, body) = self.block(false);
        for line in body {
            if line.is_empty() {
                self.out.push(">".to_owned());
            } else {
                self.out.push(format!("> {}", inline(&line)));
            }
        }
        self.out.push(String::new());
    }

    fn text(&mut self, line: &str) {
        self.pos += 1;
        let list_item = LIST_ITEM.is_match(line);
        self.in_list = list_item || (self.in_list && is_indented(line));

        let mut line = line.trim_end().to_owned();
        if list_item && line.starts_with("#.") {
            line.replace_range(..2, "1.");
        }

        let literal = line.ends_with("::");
        if literal {
            let content = line[..line.len() - 2].to_owned();
            line = if content.trim().is_empty() || content.ends_with(char::is_whitespace) {
                content.trim_end().to_owned()
            } else {
                format!("{}:", content)
            };
        }
        if !line.trim().is_empty() {
            self.out.push(inline(&line));
        }

        if literal {
            let next = self.lines[self.pos..]
                .iter()
                .find(|line| !line.trim().is_empty());
            if next.map_or(false, |line| is_indented(line)) {
                let (_, body) = self.block(false);
                self.fence("", &body);
            }
        }
    }
}

/// The text after `..` for an explicit markup line.
fn explicit_markup(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("..")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

struct EventConverter;

impl EventConverter {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Tag<'b> {
        match tag {
            // The page title is the h1, so article sections start at h2.
            Tag::Heading(level) => Tag::Heading((level + 1).min(6)),
            _ => tag,
        }
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Event<'b> {
        match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)),
            Event::End(tag) => Event::End(self.convert_tag(tag)),
            Event::Html(html) if html.trim() == MORE_MARKER => Event::Html(html),
            // raw HTML in an article is shown, not interpreted
            Event::Html(html) => Event::Text(html),
            _ => ev,
        }
    }
}

/// The result of a fallible conversion.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem converting an article source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Returned for a directive that can't be rendered as written.
    Directive {
        line: usize,
        name: String,
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Directive {
                line,
                name,
                message,
            } => write!(f, "line {}: directive `{}`: {}", line, name, message),
        }
    }
}

impl std::error::Error for Error {}
