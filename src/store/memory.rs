// src/store/memory.rs
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ArticleFilter, ArticleStats, ArticleStore, EventCounts, EventStore};
use crate::models::{Article, EventKind, InteractionEvent, NewEvent};
use crate::ranking::sort_by_date_desc;

#[derive(Debug, Default)]
struct ArticleTable {
    rows: Vec<Article>,
    by_id: HashMap<String, usize>,
}

/// Articles held in memory for the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    inner: RwLock<ArticleTable>,
}

impl MemoryArticleStore {
    pub fn new(articles: Vec<Article>) -> Self {
        let store = Self::default();
        for a in articles {
            store.upsert(a);
        }
        store
    }

    /// Insert or replace by id.
    pub fn upsert(&self, article: Article) {
        let mut t = self.inner.write().expect("article store lock poisoned");
        match t.by_id.get(&article.id).copied() {
            Some(i) => t.rows[i] = article,
            None => {
                let i = t.rows.len();
                t.by_id.insert(article.id.clone(), i);
                t.rows.push(article);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("article store lock poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn find_articles(&self, filter: &ArticleFilter) -> anyhow::Result<Vec<Article>> {
        let mut out: Vec<Article> = {
            let t = self.inner.read().expect("article store lock poisoned");
            t.rows.iter().filter(|a| filter.matches(a)).cloned().collect()
        };
        if let Some(n) = filter.latest {
            sort_by_date_desc(&mut out);
            out.truncate(n);
        }
        Ok(out)
    }

    async fn get_article(&self, id: &str) -> anyhow::Result<Option<Article>> {
        let t = self.inner.read().expect("article store lock poisoned");
        Ok(t.by_id.get(id).map(|&i| t.rows[i].clone()))
    }

    async fn article_stats(&self) -> anyhow::Result<ArticleStats> {
        let t = self.inner.read().expect("article store lock poisoned");
        let categories: HashSet<String> = t
            .rows
            .iter()
            .flat_map(|a| a.category.split(','))
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        let sources: HashSet<String> = t
            .rows
            .iter()
            .map(|a| a.source_name.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(ArticleStats {
            total_articles: t.rows.len(),
            unique_categories: categories.len(),
            unique_sources: sources.len(),
            oldest_article: t.rows.iter().map(|a| a.publication_date).min(),
            newest_article: t.rows.iter().map(|a| a.publication_date).max(),
        })
    }
}

#[derive(Debug, Default)]
struct EventLog {
    rows: Vec<InteractionEvent>,
    next_id: u64,
}

/// Append-only event log; ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: RwLock<EventLog>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("event store lock poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewEvent) -> anyhow::Result<InteractionEvent> {
        let mut log = self.inner.write().expect("event store lock poisoned");
        log.next_id += 1;
        let stored = InteractionEvent {
            id: log.next_id,
            article_id: event.article_id,
            user_id: event.user_id,
            kind: event.kind,
            latitude: event.latitude,
            longitude: event.longitude,
            timestamp: event.timestamp,
        };
        log.rows.push(stored.clone());
        Ok(stored)
    }

    async fn events_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<InteractionEvent>> {
        let log = self.inner.read().expect("event store lock poisoned");
        Ok(log
            .rows
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn event_counts(&self) -> anyhow::Result<EventCounts> {
        let log = self.inner.read().expect("event store lock poisoned");
        let mut counts = EventCounts {
            total_events: log.rows.len(),
            ..EventCounts::default()
        };
        let mut articles = HashSet::new();
        let mut users = HashSet::new();
        for e in &log.rows {
            articles.insert(e.article_id.as_str());
            users.insert(e.user_id.as_str());
            match e.kind {
                EventKind::View => counts.views += 1,
                EventKind::Click => counts.clicks += 1,
                EventKind::Share => counts.shares += 1,
            }
        }
        counts.unique_articles = articles.len();
        counts.unique_users = users.len();
        Ok(counts)
    }
}
