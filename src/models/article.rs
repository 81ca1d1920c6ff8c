// src/models/article.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, Locatable};

/// A news article as stored. Only `llm_summary` (memoized enrichment) and
/// `distance` (per-request annotation) ever change after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub url: String,
    pub publication_date: DateTime<Utc>,
    pub source_name: String,
    pub category: String,
    /// Base relevance in [0, 1].
    pub relevance_score: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Fields the ranker needs, shared by plain articles and trending results.
pub trait Scored {
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn relevance_score(&self) -> f64;
    fn published_at(&self) -> DateTime<Utc>;
    fn distance(&self) -> Option<f64>;
}

impl Scored for Article {
    fn title(&self) -> &str {
        &self.title
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn relevance_score(&self) -> f64 {
        self.relevance_score
    }
    fn published_at(&self) -> DateTime<Utc> {
        self.publication_date
    }
    fn distance(&self) -> Option<f64> {
        self.distance
    }
}

impl Locatable for Article {
    fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
    fn set_distance(&mut self, km: f64) {
        self.distance = Some(km);
    }
}

/// Outward shape used by the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub publication_date: DateTime<Utc>,
    pub source_name: String,
    pub category: String,
    pub relevance_score: f64,
    pub llm_summary: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl From<&Article> for ArticleResponse {
    fn from(a: &Article) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            description: a.description.clone(),
            url: a.url.clone(),
            publication_date: a.publication_date,
            source_name: a.source_name.clone(),
            category: a.category.clone(),
            relevance_score: a.relevance_score,
            llm_summary: a.llm_summary.clone().unwrap_or_default(),
            latitude: a.latitude,
            longitude: a.longitude,
            distance: a.distance,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::article;
    use super::*;

    #[test]
    fn response_carries_empty_summary_when_missing() {
        let a = article("a1", "T", "D", 0.5, 1.0, 2.0);
        let r = ArticleResponse::from(&a);
        assert_eq!(r.llm_summary, "");
        assert_eq!(r.id, "a1");
    }

    #[test]
    fn summary_is_skipped_in_json_when_absent() {
        let a = article("a1", "T", "D", 0.5, 1.0, 2.0);
        let v = serde_json::to_value(&a).unwrap();
        assert!(v.get("llm_summary").is_none());
        assert!(v.get("distance").is_none());
    }
}
