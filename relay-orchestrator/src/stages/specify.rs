//! Structured technical description of a page

use async_trait::async_trait;
use regex::Regex;
use relay_core::domain::stage::StageName;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::stages::html::{self, Heading};
use crate::stages::{Stage, StageContext, StageError, StageOutput};

const MAX_PALETTE: usize = 8;
const MAX_OUTLINE: usize = 24;
const LANDMARKS: &[&str] = &["header", "nav", "main", "aside", "section", "article", "footer"];

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").unwrap());
static FONT_FAMILY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)font-family\s*:\s*([^;}]+)").unwrap());
static FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form\s*>").unwrap());

/// Markers that identify common front-end stacks
const FRAMEWORK_MARKERS: &[(&str, &[&str])] = &[
    ("react", &["data-reactroot", "react-dom", "__react"]),
    ("next.js", &["__next_data__", "/_next/"]),
    ("vue", &["data-v-", "vue.js", "vue.min.js", "__vue__"]),
    ("nuxt", &["__nuxt", "/_nuxt/"]),
    ("angular", &["ng-version", "ng-app", "angular.js"]),
    ("svelte", &["svelte-"]),
    ("jquery", &["jquery"]),
    ("bootstrap", &["bootstrap.min.css", "bootstrap.css", "bootstrap.bundle"]),
    ("tailwind", &["tailwind"]),
    ("wordpress", &["wp-content", "wp-includes"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupCounts {
    pub elements: usize,
    pub divs: usize,
    pub sections: usize,
    pub links: usize,
    pub images: usize,
    pub lists: usize,
    pub tables: usize,
    pub buttons: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleProfile {
    pub stylesheets: Vec<String>,
    pub inline_blocks: usize,
    pub palette: Vec<String>,
    pub fonts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptProfile {
    pub external: Vec<String>,
    pub inline_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSpec {
    pub action: Option<String>,
    pub method: String,
    pub fields: usize,
}

pub struct SpecifyStage;

#[async_trait]
impl Stage for SpecifyStage {
    fn name(&self) -> StageName {
        StageName::Specify
    }

    fn requires(&self) -> &'static [StageName] {
        &[StageName::Capture]
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let capture = ctx.require_output(StageName::Capture)?;
        let document = ctx.document().await?;
        let page = &document.body;

        if !document.is_html() {
            return Err(StageError::Processing(format!(
                "{} is not an HTML document ({})",
                document.url,
                document.content_type.as_deref().unwrap_or("unknown content type")
            )));
        }

        let title = html::title(page)
            .or_else(|| capture["title"].as_str().map(str::to_string))
            .unwrap_or_else(|| document.url.clone());
        let description = html::meta(page, "description")
            .or_else(|| html::meta(page, "og:description"));
        let language = html::tags(page, "html")
            .next()
            .and_then(|tag| tag.attr("lang"));
        let outline: Vec<Heading> = html::headings(page).into_iter().take(MAX_OUTLINE).collect();
        let landmarks: Vec<&str> = LANDMARKS
            .iter()
            .copied()
            .filter(|name| html::count_tags(page, name) > 0)
            .collect();

        Ok(StageOutput::new(json!({
            "url": document.url,
            "title": title,
            "description": description,
            "language": language,
            "outline": outline,
            "landmarks": landmarks,
            "markup": markup_counts(page),
            "styles": style_profile(page),
            "scripts": script_profile(page),
            "frameworks": frameworks(page),
            "forms": forms(page),
        })))
    }
}

fn markup_counts(page: &str) -> MarkupCounts {
    MarkupCounts {
        elements: html::count_elements(page),
        divs: html::count_tags(page, "div"),
        sections: html::count_tags(page, "section"),
        links: html::count_tags(page, "a"),
        images: html::count_tags(page, "img"),
        lists: html::count_tags(page, "ul") + html::count_tags(page, "ol"),
        tables: html::count_tags(page, "table"),
        buttons: html::count_tags(page, "button"),
    }
}

fn style_profile(page: &str) -> StyleProfile {
    let stylesheets = html::tags(page, "link")
        .filter(|tag| {
            tag.attr("rel")
                .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"))
        })
        .filter_map(|tag| tag.attr("href"))
        .collect();

    let blocks = html::style_blocks(page);
    let inline_attributes = html::style_attributes(page);
    let css: Vec<&str> = blocks
        .iter()
        .chain(inline_attributes.iter())
        .map(String::as_str)
        .collect();

    let mut palette: Vec<String> = Vec::new();
    for color in css.iter().flat_map(|c| HEX_COLOR.find_iter(c)) {
        let color = color.as_str().to_lowercase();
        if !palette.contains(&color) && palette.len() < MAX_PALETTE {
            palette.push(color);
        }
    }

    let mut fonts: Vec<String> = Vec::new();
    for declaration in css.iter().flat_map(|c| FONT_FAMILY.captures_iter(c)) {
        let family = declaration[1].trim().trim_end_matches("!important").trim().to_string();
        if !family.is_empty() && !fonts.contains(&family) {
            fonts.push(family);
        }
    }

    StyleProfile {
        stylesheets,
        inline_blocks: blocks.len(),
        palette,
        fonts,
    }
}

fn script_profile(page: &str) -> ScriptProfile {
    ScriptProfile {
        external: html::tags(page, "script")
            .filter_map(|tag| tag.attr("src"))
            .collect(),
        inline_count: html::inline_scripts(page).len(),
    }
}

fn frameworks(page: &str) -> Vec<String> {
    let haystack = page.to_lowercase();
    let found: BTreeSet<&str> = FRAMEWORK_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| haystack.contains(m)))
        .map(|(name, _)| *name)
        .collect();
    found.into_iter().map(str::to_string).collect()
}

fn forms(page: &str) -> Vec<FormSpec> {
    FORM.captures_iter(page)
        .map(|c| FormSpec {
            action: html::attribute(&c[1], "action"),
            method: html::attribute(&c[1], "method")
                .map(|m| m.to_uppercase())
                .unwrap_or_else(|| "GET".to_string()),
            fields: ["input", "select", "textarea"]
                .iter()
                .map(|name| html::count_tags(&c[2], name))
                .sum(),
        })
        .collect()
}
