// src/ingest/mod.rs
//! Article ingestion from the JSON dataset.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::Article;

/// Upper bound for stored titles/descriptions.
pub const MAX_FIELD_CHARS: usize = 1500;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_articles_total", "Articles parsed from the dataset.");
        describe_counter!(
            "ingest_skipped_total",
            "Articles dropped (duplicate id, bad date or empty title)."
        );
    });
}

/// Decode entities, strip tags, normalize curly quotes, collapse whitespace,
/// and cap at `max_chars` characters.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Dataset record. Dates are naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC),
/// categories come as a list.
#[derive(Debug, Deserialize)]
struct RawArticle {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    publication_date: String,
    #[serde(default)]
    source_name: String,
    #[serde(default)]
    category: Categories,
    #[serde(default)]
    relevance_score: f64,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum Categories {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl Categories {
    fn joined(self) -> String {
        match self {
            Categories::None => String::new(),
            Categories::One(s) => s.trim().to_string(),
            Categories::Many(v) => v
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|n| n.and_utc())
}

/// Parse a JSON array of articles. Records with duplicate ids, unparseable
/// dates or blank titles are skipped; the first occurrence of an id wins.
pub fn parse_articles_json(data: &str) -> anyhow::Result<Vec<Article>> {
    ensure_metrics_described();
    let raw: Vec<RawArticle> = serde_json::from_str(data).context("article dataset is not a JSON array")?;

    let mut seen = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());
    let mut skipped = 0u64;

    for r in raw {
        let Some(publication_date) = parse_date(&r.publication_date) else {
            warn!(target: "ingest", id = %r.id, "unparseable publication_date, skipping");
            skipped += 1;
            continue;
        };
        let title = normalize_text(&r.title, MAX_FIELD_CHARS);
        if title.is_empty() || !seen.insert(r.id.clone()) {
            skipped += 1;
            continue;
        }
        out.push(Article {
            id: r.id,
            title,
            description: normalize_text(&r.description, MAX_FIELD_CHARS),
            url: r.url.trim().to_string(),
            publication_date,
            source_name: r.source_name.trim().to_string(),
            category: r.category.joined(),
            relevance_score: if r.relevance_score.is_finite() {
                r.relevance_score.clamp(0.0, 1.0)
            } else {
                0.0
            },
            latitude: r.latitude,
            longitude: r.longitude,
            llm_summary: None,
            distance: None,
        });
    }

    counter!("ingest_articles_total").increment(out.len() as u64);
    counter!("ingest_skipped_total").increment(skipped);
    Ok(out)
}

/// Load the dataset at `path`. A missing file yields an empty list.
pub fn load_articles_from(path: &Path) -> anyhow::Result<Vec<Article>> {
    if !path.exists() {
        warn!(target: "ingest", path = %path.display(), "article dataset not found, starting empty");
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read article dataset at {}", path.display()))?;
    let articles = parse_articles_json(&data)?;
    info!(target: "ingest", path = %path.display(), count = articles.len(), "articles loaded");
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_basic() {
        let s = "  <p>Hello&nbsp;&amp;   “world”</p>  ";
        assert_eq!(normalize_text(s, 100), "Hello & \"world\"");
    }

    #[test]
    fn normalize_caps_by_chars() {
        let s = "é".repeat(50);
        assert_eq!(normalize_text(&s, 10).chars().count(), 10);
    }

    #[test]
    fn parses_dataset_records() {
        let data = r#"[
          {"id":"a1","title":"Tech <b>boom</b>","description":"Chips","url":"https://x/a1",
           "publication_date":"2025-03-24T11:19:40","source_name":"Reuters",
           "category":["Technology","Business"],"relevance_score":0.83,
           "latitude":37.77,"longitude":-122.41},
          {"id":"a1","title":"dup","publication_date":"2025-03-24T11:19:40","latitude":0,"longitude":0},
          {"id":"a2","title":"Bad date","publication_date":"yesterday","latitude":0,"longitude":0},
          {"id":"a3","title":"Score out of range","publication_date":"2025-03-24T11:19:40Z",
           "category":"Sports","relevance_score":3.0,"latitude":0,"longitude":0}
        ]"#;
        let arts = parse_articles_json(data).unwrap();
        assert_eq!(arts.len(), 2);
        assert_eq!(arts[0].title, "Tech boom");
        assert_eq!(arts[0].category, "Technology,Business");
        assert_eq!(arts[0].publication_date.to_rfc3339(), "2025-03-24T11:19:40+00:00");
        assert_eq!(arts[1].category, "Sports");
        assert_eq!(arts[1].relevance_score, 1.0);
    }

    #[test]
    fn not_an_array_is_an_error() {
        assert!(parse_articles_json(r#"{"id":"x"}"#).is_err());
    }

    #[test]
    fn missing_file_is_empty() {
        let arts = load_articles_from(Path::new("/definitely/not/here.json")).unwrap();
        assert!(arts.is_empty());
    }
}
