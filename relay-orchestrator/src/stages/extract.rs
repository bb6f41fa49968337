//! Content extraction from the fetched page

use async_trait::async_trait;
use regex::Regex;
use relay_core::domain::stage::StageName;
use relay_core::domain::task::SummaryStyle;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::resilience::Summarizer;
use crate::stages::html;
use crate::stages::{Stage, StageContext, StageError, StageOutput};

const MAX_TOPICS: usize = 8;
const MAX_KEY_POINTS: usize = 6;
const WORDS_PER_MINUTE: usize = 200;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{6,}\d").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]+").unwrap());

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "because", "been", "before", "being", "below",
    "between", "both", "could", "does", "doing", "down", "during", "each", "even", "every",
    "from", "further", "have", "having", "here", "into", "just", "like", "more", "most", "much",
    "only", "other", "over", "same", "should", "some", "such", "than", "that", "their", "them",
    "then", "there", "these", "they", "this", "those", "through", "under", "until", "very",
    "were", "what", "when", "where", "which", "while", "will", "with", "would", "your", "yours",
    "shall", "cookie", "cookies", "click", "here's", "it's",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contacts {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub link_count: usize,
    pub image_count: usize,
    pub heading_count: usize,
    pub reading_time_minutes: usize,
}

/// Derives topics, key points, contacts and metrics from the page
pub struct ExtractStage {
    summarizer: Option<Arc<Summarizer>>,
}

impl ExtractStage {
    pub fn new(summarizer: Option<Arc<Summarizer>>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> StageName {
        StageName::Extract
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let document = ctx.document().await?;
        let page = &document.body;

        let text = html::visible_text(page);
        if text.is_empty() {
            return Err(StageError::Processing(format!(
                "{} has no readable text",
                document.url
            )));
        }

        let headings = html::headings(page);
        let sentences = sentences(&text);
        let title = html::title(page).or_else(|| headings.first().map(|h| h.text.clone()));

        let metrics = ContentMetrics {
            word_count: text.split_whitespace().count(),
            sentence_count: sentences.len(),
            link_count: html::count_tags(page, "a"),
            image_count: html::count_tags(page, "img"),
            heading_count: headings.len(),
            reading_time_minutes: text.split_whitespace().count().div_ceil(WORDS_PER_MINUTE),
        };

        let mut key_points: Vec<String> = headings
            .iter()
            .filter(|h| h.level <= 3)
            .map(|h| h.text.clone())
            .take(MAX_KEY_POINTS)
            .collect();
        for sentence in sentences.iter().filter(|s| s.len() >= 24) {
            if key_points.len() >= MAX_KEY_POINTS {
                break;
            }
            if !key_points.contains(sentence) {
                key_points.push(sentence.clone());
            }
        }

        let mut payload = json!({
            "url": document.url,
            "title": title,
            "topics": topics(&text, MAX_TOPICS),
            "key_points": key_points,
            "contacts": contacts(page, &text),
            "metrics": metrics,
            "summary": null,
        });

        let mut fallback = false;
        if let Some(summarizer) = self
            .summarizer
            .as_ref()
            .filter(|s| s.client().is_configured())
        {
            let serviced = summarizer.summarize(&text, SummaryStyle::Detailed).await;
            fallback = serviced.is_fallback();
            payload["summary"] = json!({
                "text": serviced.value(),
                "fallback": fallback,
            });
        } else {
            debug!("No inference client configured, skipping page summary");
        }

        Ok(StageOutput::new(payload).with_fallback(fallback))
    }
}

/// Sentences of visible text, terminators kept
fn sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().any(char::is_alphabetic))
        .map(str::to_string)
        .collect()
}

/// Most frequent meaningful words, ties broken alphabetically
fn topics(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in WORD.find_iter(text) {
        let word = word.as_str().to_lowercase();
        if word.len() < 4 || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(word).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

fn contacts(page: &str, text: &str) -> Contacts {
    let emails: BTreeSet<String> = EMAIL
        .find_iter(page)
        .map(|m| m.as_str().trim_end_matches('.').to_lowercase())
        .filter(|email| !email.ends_with(".png") && !email.ends_with(".jpg"))
        .collect();

    let phones: BTreeSet<String> = PHONE
        .find_iter(text)
        .map(|m| html::normalize(m.as_str()))
        .filter(|phone| {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            (8..=15).contains(&digits)
        })
        .collect();

    Contacts {
        emails: emails.into_iter().collect(),
        phones: phones.into_iter().collect(),
    }
}
