// src/store/mod.rs
//! Storage seams. Services only see these traits; the process wires the
//! in-memory implementations from [`memory`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Article, InteractionEvent, NewEvent};

pub use memory::{MemoryArticleStore, MemoryEventStore};

/// Retrieval predicates. All set fields must hold; an empty filter returns
/// everything. `latest` orders by date (newest first) and keeps N.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
    /// Case-insensitive match against any comma-separated category.
    pub category: Option<String>,
    /// Case-insensitive equality on `source_name`.
    pub source: Option<String>,
    pub min_score: Option<f64>,
    /// Case-insensitive substring of title or description.
    pub text: Option<String>,
    pub latest: Option<usize>,
}

impl ArticleFilter {
    pub fn category(c: impl Into<String>) -> Self {
        Self {
            category: Some(c.into()),
            ..Self::default()
        }
    }

    pub fn source(s: impl Into<String>) -> Self {
        Self {
            source: Some(s.into()),
            ..Self::default()
        }
    }

    pub fn min_score(t: f64) -> Self {
        Self {
            min_score: Some(t),
            ..Self::default()
        }
    }

    pub fn text(q: impl Into<String>) -> Self {
        Self {
            text: Some(q.into()),
            ..Self::default()
        }
    }

    pub fn latest(n: usize) -> Self {
        Self {
            latest: Some(n),
            ..Self::default()
        }
    }

    pub fn matches(&self, a: &Article) -> bool {
        if let Some(c) = self.category.as_deref().map(str::trim) {
            if !a.category.split(',').any(|x| x.trim().eq_ignore_ascii_case(c)) {
                return false;
            }
        }
        if let Some(s) = self.source.as_deref().map(str::trim) {
            if !a.source_name.trim().eq_ignore_ascii_case(s) {
                return false;
            }
        }
        if let Some(t) = self.min_score {
            if a.relevance_score < t {
                return false;
            }
        }
        if let Some(q) = self.text.as_deref().map(|q| q.trim().to_lowercase()) {
            if !q.is_empty()
                && !a.title.to_lowercase().contains(&q)
                && !a.description.to_lowercase().contains(&q)
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArticleStats {
    pub total_articles: usize,
    pub unique_categories: usize,
    pub unique_sources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_article: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_article: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub total_events: usize,
    pub unique_articles: usize,
    pub unique_users: usize,
    pub views: usize,
    pub clicks: usize,
    pub shares: usize,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn find_articles(&self, filter: &ArticleFilter) -> anyhow::Result<Vec<Article>>;
    async fn get_article(&self, id: &str) -> anyhow::Result<Option<Article>>;
    async fn all_articles(&self) -> anyhow::Result<Vec<Article>> {
        self.find_articles(&ArticleFilter::default()).await
    }
    async fn article_stats(&self) -> anyhow::Result<ArticleStats>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append and return the stored event with its assigned id.
    async fn append(&self, event: NewEvent) -> anyhow::Result<InteractionEvent>;
    /// Events with `timestamp >= since`.
    async fn events_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<InteractionEvent>>;
    async fn event_counts(&self) -> anyhow::Result<EventCounts>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::fixtures::article;

    #[test]
    fn category_matches_any_component() {
        let mut a = article("a", "t", "d", 0.5, 0.0, 0.0);
        a.category = "Technology,Business".into();
        assert!(ArticleFilter::category("business").matches(&a));
        assert!(!ArticleFilter::category("Sports").matches(&a));
    }

    #[test]
    fn combined_predicates_all_apply() {
        let a = article("a", "Climate report", "data", 0.8, 0.0, 0.0);
        let f = ArticleFilter {
            source: Some("reuters".into()),
            min_score: Some(0.7),
            text: Some("CLIMATE".into()),
            ..Default::default()
        };
        assert!(f.matches(&a));
        let f = ArticleFilter {
            min_score: Some(0.9),
            ..f
        };
        assert!(!f.matches(&a));
    }

    #[test]
    fn blank_text_matches_everything() {
        let a = article("a", "x", "y", 0.1, 0.0, 0.0);
        assert!(ArticleFilter::text("   ").matches(&a));
    }
}
