//! Generation of a starter site from the page description

use async_trait::async_trait;
use relay_core::domain::stage::StageName;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::stages::html::escape;
use crate::stages::{Stage, StageContext, StageError, StageOutput};

pub const INDEX_HTML: &str = "index.html";
pub const STYLES_CSS: &str = "styles.css";
pub const SCRIPT_JS: &str = "script.js";
pub const README_MD: &str = "README.md";

const DEFAULT_ACCENT: &str = "#2563eb";
const DEFAULT_TEXT: &str = "#1f2933";
const DEFAULT_FONT: &str = "system-ui, -apple-system, \"Segoe UI\", sans-serif";

pub struct SynthesizeStage;

#[async_trait]
impl Stage for SynthesizeStage {
    fn name(&self) -> StageName {
        StageName::Synthesize
    }

    fn requires(&self) -> &'static [StageName] {
        &[StageName::Specify]
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let spec = ctx.require_output(StageName::Specify)?;
        let key_points: Vec<String> = ctx
            .output(StageName::Extract)
            .and_then(|extract| extract.get("key_points"))
            .and_then(Value::as_array)
            .map(|points| {
                points
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let site = SiteModel::from_spec(spec, key_points)?;

        let files = BTreeMap::from([
            (INDEX_HTML.to_string(), site.index_html()),
            (STYLES_CSS.to_string(), site.styles_css()),
            (SCRIPT_JS.to_string(), site.script_js()),
            (README_MD.to_string(), site.readme()),
        ]);

        let listing: Vec<Value> = files
            .iter()
            .map(|(name, content)| json!({ "name": name, "bytes": content.len() }))
            .collect();

        Ok(StageOutput::new(json!({
            "source_url": site.source_url,
            "title": site.title,
            "files": listing,
        }))
        .with_artifacts(files))
    }
}

/// The parts of a page description the generator uses
struct SiteModel {
    source_url: String,
    title: String,
    description: Option<String>,
    language: String,
    sections: Vec<String>,
    key_points: Vec<String>,
    accent: String,
    text_color: String,
    font: String,
    frameworks: Vec<String>,
    has_nav: bool,
    forms: usize,
}

impl SiteModel {
    fn from_spec(spec: &Value, key_points: Vec<String>) -> Result<Self, StageError> {
        let title = spec["title"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| StageError::Processing("page description has no title".to_string()))?
            .to_string();

        let strings = |value: &Value| -> Vec<String> {
            value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        let sections: Vec<String> = spec["outline"]
            .as_array()
            .map(|outline| {
                outline
                    .iter()
                    .filter(|h| h["level"].as_u64().is_some_and(|level| level == 2))
                    .filter_map(|h| h["text"].as_str())
                    .map(str::to_string)
                    .take(6)
                    .collect()
            })
            .unwrap_or_default();

        let palette = strings(&spec["styles"]["palette"]);
        let fonts = strings(&spec["styles"]["fonts"]);
        let landmarks = strings(&spec["landmarks"]);

        Ok(Self {
            source_url: spec["url"].as_str().unwrap_or_default().to_string(),
            title,
            description: spec["description"].as_str().map(str::to_string),
            language: spec["language"].as_str().unwrap_or("en").to_string(),
            sections,
            key_points,
            text_color: palette.first().cloned().unwrap_or_else(|| DEFAULT_TEXT.to_string()),
            accent: palette
                .iter()
                .skip(1)
                .find(|c| !is_neutral(c))
                .cloned()
                .unwrap_or_else(|| DEFAULT_ACCENT.to_string()),
            font: fonts.first().cloned().unwrap_or_else(|| DEFAULT_FONT.to_string()),
            frameworks: strings(&spec["frameworks"]),
            has_nav: landmarks.iter().any(|l| l == "nav"),
            forms: spec["forms"].as_array().map(Vec::len).unwrap_or(0),
        })
    }

    fn anchor(index: usize) -> String {
        format!("section-{}", index + 1)
    }

    fn index_html(&self) -> String {
        let mut out = String::new();
        let title = escape(&self.title);

        let _ = writeln!(out, "<!DOCTYPE html>");
        let _ = writeln!(out, "<html lang=\"{}\">", escape(&self.language));
        let _ = writeln!(out, "<head>");
        let _ = writeln!(out, "  <meta charset=\"utf-8\">");
        let _ = writeln!(
            out,
            "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"
        );
        let _ = writeln!(out, "  <title>{}</title>", title);
        if let Some(description) = &self.description {
            let _ = writeln!(
                out,
                "  <meta name=\"description\" content=\"{}\">",
                escape(description)
            );
        }
        let _ = writeln!(out, "  <link rel=\"stylesheet\" href=\"{}\">", STYLES_CSS);
        let _ = writeln!(out, "</head>");
        let _ = writeln!(out, "<body>");
        let _ = writeln!(out, "  <header class=\"site-header\">");
        let _ = writeln!(out, "    <a class=\"brand\" href=\"#top\">{}</a>", title);
        if self.has_nav || !self.sections.is_empty() {
            let _ = writeln!(
                out,
                "    <button class=\"nav-toggle\" aria-expanded=\"false\" aria-controls=\"site-nav\">Menu</button>"
            );
            let _ = writeln!(out, "    <nav id=\"site-nav\">");
            for (i, section) in self.sections.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "      <a href=\"#{}\">{}</a>",
                    Self::anchor(i),
                    escape(section)
                );
            }
            let _ = writeln!(out, "    </nav>");
        }
        let _ = writeln!(out, "  </header>");
        let _ = writeln!(out, "  <main id=\"top\">");
        let _ = writeln!(out, "    <section class=\"hero\">");
        let _ = writeln!(out, "      <h1>{}</h1>", title);
        if let Some(description) = &self.description {
            let _ = writeln!(out, "      <p class=\"lead\">{}</p>", escape(description));
        }
        let _ = writeln!(out, "    </section>");

        if !self.key_points.is_empty() {
            let _ = writeln!(out, "    <section class=\"highlights\">");
            let _ = writeln!(out, "      <h2>Highlights</h2>");
            let _ = writeln!(out, "      <ul>");
            for point in &self.key_points {
                let _ = writeln!(out, "        <li>{}</li>", escape(point));
            }
            let _ = writeln!(out, "      </ul>");
            let _ = writeln!(out, "    </section>");
        }

        for (i, section) in self.sections.iter().enumerate() {
            let _ = writeln!(out, "    <section id=\"{}\" class=\"content\">", Self::anchor(i));
            let _ = writeln!(out, "      <h2>{}</h2>", escape(section));
            let _ = writeln!(out, "      <p>Content for this section.</p>");
            let _ = writeln!(out, "    </section>");
        }

        if self.forms > 0 {
            let _ = writeln!(out, "    <section class=\"contact\">");
            let _ = writeln!(out, "      <h2>Get in touch</h2>");
            let _ = writeln!(out, "      <form class=\"contact-form\">");
            let _ = writeln!(
                out,
                "        <input type=\"email\" name=\"email\" placeholder=\"you@example.com\" required>"
            );
            let _ = writeln!(out, "        <button type=\"submit\">Send</button>");
            let _ = writeln!(out, "      </form>");
            let _ = writeln!(out, "    </section>");
        }

        let _ = writeln!(out, "  </main>");
        let _ = writeln!(out, "  <footer class=\"site-footer\">");
        let _ = writeln!(
            out,
            "    <p>Generated from <a href=\"{0}\">{0}</a></p>",
            escape(&self.source_url)
        );
        let _ = writeln!(out, "  </footer>");
        let _ = writeln!(out, "  <script src=\"{}\"></script>", SCRIPT_JS);
        let _ = writeln!(out, "</body>");
        let _ = writeln!(out, "</html>");
        out
    }

    fn styles_css(&self) -> String {
        format!(
            r#":root {{
  --text: {text};
  --accent: {accent};
  --font: {font};
}}

* {{ box-sizing: border-box; }}

body {{
  margin: 0;
  font-family: var(--font);
  color: var(--text);
  line-height: 1.6;
}}

.site-header {{
  display: flex;
  align-items: center;
  justify-content: space-between;
  padding: 1rem 2rem;
  border-bottom: 1px solid #e5e7eb;
}}

.brand {{ font-weight: 700; color: var(--text); text-decoration: none; }}

nav a {{ margin-left: 1.25rem; color: var(--accent); text-decoration: none; }}

.nav-toggle {{ display: none; }}

main {{ max-width: 960px; margin: 0 auto; padding: 2rem; }}

.hero h1 {{ font-size: 2.5rem; margin-bottom: 0.5rem; }}

.lead {{ font-size: 1.25rem; opacity: 0.85; }}

.highlights li {{ margin-bottom: 0.5rem; }}

.contact-form {{ display: flex; gap: 0.5rem; }}

button {{
  background: var(--accent);
  color: #fff;
  border: 0;
  padding: 0.5rem 1rem;
  border-radius: 4px;
  cursor: pointer;
}}

.site-footer {{ padding: 2rem; text-align: center; font-size: 0.875rem; }}

@media (max-width: 640px) {{
  .nav-toggle {{ display: inline-block; }}
  nav {{ display: none; }}
  nav.open {{ display: flex; flex-direction: column; }}
}}
"#,
            text = self.text_color,
            accent = self.accent,
            font = self.font,
        )
    }

    fn script_js(&self) -> String {
        r##"document.addEventListener("DOMContentLoaded", () => {
  const toggle = document.querySelector(".nav-toggle");
  const nav = document.getElementById("site-nav");

  if (toggle && nav) {
    toggle.addEventListener("click", () => {
      const open = nav.classList.toggle("open");
      toggle.setAttribute("aria-expanded", String(open));
    });
  }

  document.querySelectorAll('a[href^="#"]').forEach((link) => {
    link.addEventListener("click", (event) => {
      const target = document.querySelector(link.getAttribute("href"));
      if (target) {
        event.preventDefault();
        target.scrollIntoView({ behavior: "smooth" });
      }
    });
  });

  const form = document.querySelector(".contact-form");
  if (form) {
    form.addEventListener("submit", (event) => {
      event.preventDefault();
      form.reset();
    });
  }
});
"##
        .to_string()
    }

    fn readme(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", self.title);
        let _ = writeln!(out);
        let _ = writeln!(out, "Static starter site generated from {}.", self.source_url);
        let _ = writeln!(out);
        let _ = writeln!(out, "## Files");
        let _ = writeln!(out);
        let _ = writeln!(out, "- `{}`: page markup", INDEX_HTML);
        let _ = writeln!(out, "- `{}`: layout, palette and typography", STYLES_CSS);
        let _ = writeln!(out, "- `{}`: navigation toggle and smooth scrolling", SCRIPT_JS);
        let _ = writeln!(out);
        let _ = writeln!(out, "## Source page");
        let _ = writeln!(out);
        let _ = writeln!(out, "- Sections: {}", self.sections.len());
        let _ = writeln!(out, "- Accent color: `{}`", self.accent);
        let _ = writeln!(out, "- Font: `{}`", self.font);
        if self.frameworks.is_empty() {
            let _ = writeln!(out, "- Detected frameworks: none");
        } else {
            let _ = writeln!(out, "- Detected frameworks: {}", self.frameworks.join(", "));
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Open `{}` in a browser to preview.", INDEX_HTML);
        out
    }
}

/// Greys, black and white make poor accent colors
fn is_neutral(color: &str) -> bool {
    let hex = color.trim_start_matches('#');
    let expanded: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };
    if expanded.len() != 6 {
        return true;
    }
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).unwrap_or(0);
    let (r, g, b) = (channel(0), channel(2), channel(4));
    r.max(g).max(b) - r.min(g).min(b) < 24
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::run_stage;
    use crate::stages::testing::{StaticFetcher, website_context};

    fn spec() -> Value {
        json!({
            "url": "https://woodshop.example",
            "title": "Woodshop <Berlin>",
            "description": "Handmade furniture",
            "language": "de",
            "outline": [
                { "level": 1, "text": "Woodshop" },
                { "level": 2, "text": "Tables" },
                { "level": 2, "text": "Chairs" },
                { "level": 3, "text": "Oak" }
            ],
            "landmarks": ["header", "nav", "main"],
            "styles": { "palette": ["#1a1a1a", "#ffffff", "#ff6600"], "fonts": ["\"Inter\", sans-serif"] },
            "frameworks": ["bootstrap"],
            "forms": [{ "action": "/subscribe", "method": "POST", "fields": 1 }]
        })
    }

    #[tokio::test]
    async fn test_generates_four_artifacts() {
        let mut ctx = website_context(StaticFetcher::html(""));
        ctx.record_output(StageName::Specify, spec());
        ctx.record_output(
            StageName::Extract,
            json!({ "key_points": ["Solid oak since 1990"] }),
        );

        let output = SynthesizeStage.execute(&ctx).await.unwrap();

        let names: Vec<&str> = output.artifacts.keys().map(String::as_str).collect();
        assert_eq!(names, vec![README_MD, INDEX_HTML, SCRIPT_JS, STYLES_CSS]);
        assert_eq!(output.payload["files"].as_array().unwrap().len(), 4);

        let index = &output.artifacts[INDEX_HTML];
        assert!(index.contains("<html lang=\"de\">"));
        assert!(index.contains("<title>Woodshop &lt;Berlin&gt;</title>"));
        assert!(index.contains("<li>Solid oak since 1990</li>"));
        assert!(index.contains("<h2>Tables</h2>"));
        assert!(index.contains("<h2>Chairs</h2>"));
        assert!(!index.contains("<h2>Oak</h2>"));
        assert!(index.contains("contact-form"));

        let css = &output.artifacts[STYLES_CSS];
        assert!(css.contains("--accent: #ff6600;"));
        assert!(css.contains("--text: #1a1a1a;"));

        assert!(output.artifacts[README_MD].contains("Detected frameworks: bootstrap"));
    }

    #[test]
    fn test_script_keeps_anchor_selector_and_form_handler() {
        let script = SiteModel::from_spec(&spec(), Vec::new()).unwrap().script_js();

        assert!(script.contains(r##"document.querySelectorAll('a[href^="#"]')"##));
        assert!(script.contains("querySelector(\".contact-form\")"));
        assert!(script.trim_end().ends_with("});"));
    }

    #[tokio::test]
    async fn test_works_without_extract() {
        let mut ctx = website_context(StaticFetcher::html(""));
        ctx.record_output(StageName::Specify, json!({ "title": "Plain", "url": "https://plain.example" }));

        let output = SynthesizeStage.execute(&ctx).await.unwrap();
        let index = &output.artifacts[INDEX_HTML];

        assert!(!index.contains("Highlights"));
        assert!(output.artifacts[STYLES_CSS].contains(DEFAULT_ACCENT));
    }

    #[tokio::test]
    async fn test_requires_specify_output() {
        let ctx = website_context(StaticFetcher::html(""));
        let run = run_stage(&SynthesizeStage, &ctx).await;

        assert!(!run.result.success);
        assert!(run.artifacts.is_empty());
    }

    #[test]
    fn test_neutral_colors() {
        assert!(is_neutral("#fff"));
        assert!(is_neutral("#1a1a1a"));
        assert!(!is_neutral("#ff6600"));
        assert!(!is_neutral("#2563eb"));
    }
}
