// src/models/event.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::article::{Article, Scored};
use crate::error::NewsError;
use crate::geo::{GeoPoint, Locatable};

/// Kind of user interaction. Anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    View,
    Click,
    Share,
}

impl EventKind {
    /// Multiplier applied before recency decay.
    pub fn weight(self) -> f64 {
        match self {
            EventKind::View => 1.0,
            EventKind::Click => 2.0,
            EventKind::Share => 3.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Click => "click",
            EventKind::Share => "share",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(EventKind::View),
            "click" => Ok(EventKind::Click),
            "share" => Ok(EventKind::Share),
            other => Err(NewsError::invalid(format!(
                "invalid event type: {other} (expected view, click or share)"
            ))),
        }
    }
}

/// Append-only interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: u64,
    pub article_id: String,
    pub user_id: String,
    pub kind: EventKind,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// An event before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub article_id: String,
    pub user_id: String,
    pub kind: EventKind,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// Article decorated with its trending score. `event_count == 0` marks a
/// relevance-fallback entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingResult {
    #[serde(flatten)]
    pub article: Article,
    pub trending_score: f64,
    pub event_count: usize,
}

impl Scored for TrendingResult {
    fn title(&self) -> &str {
        &self.article.title
    }
    fn description(&self) -> &str {
        &self.article.description
    }
    fn relevance_score(&self) -> f64 {
        self.article.relevance_score
    }
    fn published_at(&self) -> DateTime<Utc> {
        self.article.publication_date
    }
    fn distance(&self) -> Option<f64> {
        self.article.distance
    }
}

impl Locatable for TrendingResult {
    fn point(&self) -> GeoPoint {
        self.article.point()
    }
    fn set_distance(&mut self, km: f64) {
        self.article.set_distance(km);
    }
}
