//! Lightweight HTML inspection helpers
//!
//! Pages are analysed with a handful of regular expressions rather than a
//! full DOM; the stages only need counts, headings and a few attributes.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static META: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").unwrap());
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap()
});
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").unwrap());
static NOSCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript\s*>").unwrap());
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static OPENING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<([a-zA-Z][a-zA-Z0-9-]*)\b([^>]*)>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// An opening tag with its raw attribute string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attributes: String,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<String> {
        attribute(&self.attributes, name)
    }
}

pub fn title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|c| normalize(&strip_tags(&c[1])))
        .filter(|t| !t.is_empty())
}

pub fn headings(html: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(html)
        .filter_map(|c| {
            let level = c[1].parse().ok()?;
            let text = normalize(&strip_tags(&c[2]));
            (!text.is_empty()).then_some(Heading { level, text })
        })
        .collect()
}

/// Content of `<meta name=.. content=..>` or `<meta property=.. content=..>`
pub fn meta(html: &str, key: &str) -> Option<String> {
    META.captures_iter(html).find_map(|c| {
        let attrs = &c[1];
        let matches_key = attribute(attrs, "name")
            .or_else(|| attribute(attrs, "property"))
            .is_some_and(|name| name.eq_ignore_ascii_case(key));
        if matches_key {
            attribute(attrs, "content").map(|content| normalize(&content))
        } else {
            None
        }
    })
}

/// Value of a single attribute inside a raw attribute string
pub fn attribute(attributes: &str, name: &str) -> Option<String> {
    ATTRIBUTE.captures_iter(attributes).find_map(|c| {
        if !c[1].eq_ignore_ascii_case(name) {
            return None;
        }
        c.get(2)
            .or_else(|| c.get(3))
            .or_else(|| c.get(4))
            .map(|m| m.as_str().trim().to_string())
    })
}

/// Every opening tag with the given name (case-insensitive)
pub fn tags<'a>(html: &'a str, name: &'a str) -> impl Iterator<Item = Tag> + 'a {
    OPENING_TAG.captures_iter(html).filter_map(move |c| {
        c[1].eq_ignore_ascii_case(name).then(|| Tag {
            name: c[1].to_ascii_lowercase(),
            attributes: c[2].to_string(),
        })
    })
}

pub fn count_tags(html: &str, name: &str) -> usize {
    tags(html, name).count()
}

/// Number of opening tags of any kind
pub fn count_elements(html: &str) -> usize {
    OPENING_TAG.find_iter(html).count()
}

/// Values of every inline `style` attribute
pub fn style_attributes(html: &str) -> Vec<String> {
    OPENING_TAG
        .captures_iter(html)
        .filter_map(|c| attribute(&c[2], "style"))
        .collect()
}

/// Bodies of every `<style>` block
pub fn style_blocks(html: &str) -> Vec<String> {
    STYLE_BLOCK
        .captures_iter(html)
        .map(|c| c[1].trim().to_string())
        .collect()
}

/// Bodies of inline `<script>` blocks (those without `src`)
pub fn inline_scripts(html: &str) -> Vec<String> {
    SCRIPT_BLOCK
        .captures_iter(html)
        .filter(|c| attribute(&c[1], "src").is_none())
        .map(|c| c[2].trim().to_string())
        .filter(|body| !body.is_empty())
        .collect()
}

/// Human-visible text with markup, scripts and styles removed
pub fn visible_text(html: &str) -> String {
    let without_comments = COMMENT.replace_all(html, " ");
    let without_scripts = SCRIPT_BLOCK.replace_all(&without_comments, " ");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, " ");
    let without_noscript = NOSCRIPT_BLOCK.replace_all(&without_styles, " ");
    normalize(&strip_tags(&without_noscript))
}

pub fn strip_tags(html: &str) -> String {
    decode_entities(&TAG.replace_all(html, " "))
}

/// Collapses runs of whitespace and trims
pub fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Minimal escaping for text placed back into markup
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
