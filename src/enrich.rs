// src/enrich.rs
//! Bounded-concurrency article summaries.
//!
//! At most `concurrency` external calls are in flight at once (semaphore),
//! each bounded by `call_timeout`. Summaries are memoized per article id for
//! the lifetime of the enricher; failures substitute [`SUMMARY_UNAVAILABLE`]
//! for that article only and are not memoized, so a later request retries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::ingest::normalize_text;
use crate::llm::DynSummarizer;
use crate::models::{Article, TrendingResult};

pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable.";
pub const SUMMARY_INSUFFICIENT: &str = "Summary unavailable - insufficient content.";

/// Below this many characters the text is not worth summarizing.
pub const MIN_INPUT_CHARS: usize = 20;
/// Input is truncated to this many characters before the call.
pub const MAX_INPUT_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnricherSettings {
    pub concurrency: usize,
    pub call_timeout: Duration,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            call_timeout: Duration::from_secs(10),
        }
    }
}

pub struct SummaryEnricher {
    summarizer: DynSummarizer,
    permits: Arc<Semaphore>,
    memo: RwLock<HashMap<String, String>>,
    settings: EnricherSettings,
}

impl SummaryEnricher {
    pub fn new(summarizer: DynSummarizer, settings: EnricherSettings) -> Self {
        let width = settings.concurrency.max(1);
        Self {
            summarizer,
            permits: Arc::new(Semaphore::new(width)),
            memo: RwLock::new(HashMap::new()),
            settings: EnricherSettings {
                concurrency: width,
                ..settings
            },
        }
    }

    pub fn settings(&self) -> EnricherSettings {
        self.settings
    }

    pub fn memoized(&self, article_id: &str) -> Option<String> {
        self.memo
            .read()
            .expect("summary memo lock poisoned")
            .get(article_id)
            .cloned()
    }

    pub fn memo_len(&self) -> usize {
        self.memo.read().expect("summary memo lock poisoned").len()
    }

    /// Summary for one article: memo lookup, then a gated, timeout-bounded call.
    pub async fn summarize_one(&self, article_id: &str, text: &str) -> String {
        if let Some(hit) = self.memoized(article_id) {
            counter!("summary_memo_hits_total").increment(1);
            return hit;
        }

        let input = normalize_text(text, MAX_INPUT_CHARS);
        if input.chars().count() < MIN_INPUT_CHARS {
            return SUMMARY_INSUFFICIENT.to_string();
        }

        // Closed only if the enricher is being torn down.
        let Ok(_permit) = self.permits.acquire().await else {
            return SUMMARY_UNAVAILABLE.to_string();
        };
        counter!("summary_requests_total").increment(1);

        let call = self.summarizer.summarize(article_id, &input);
        match tokio::time::timeout(self.settings.call_timeout, call).await {
            Ok(Ok(summary)) => {
                let mut memo = self.memo.write().expect("summary memo lock poisoned");
                // A concurrent request may have won; keep the first value.
                memo.entry(article_id.to_string())
                    .or_insert(summary)
                    .clone()
            }
            Ok(Err(e)) => {
                counter!("summary_failures_total").increment(1);
                warn!(target: "enrich", article_id, error = %e, "summary call failed");
                SUMMARY_UNAVAILABLE.to_string()
            }
            Err(_) => {
                counter!("summary_failures_total").increment(1);
                warn!(
                    target: "enrich",
                    article_id,
                    timeout_ms = self.settings.call_timeout.as_millis() as u64,
                    "summary call timed out"
                );
                SUMMARY_UNAVAILABLE.to_string()
            }
        }
    }

    /// Fill `llm_summary` for every article that lacks one. Order is preserved;
    /// a failure for one article never fails the batch.
    pub async fn enrich(self: &Arc<Self>, mut articles: Vec<Article>) -> Vec<Article> {
        let mut tasks = JoinSet::new();
        for (idx, a) in articles.iter().enumerate() {
            if a.llm_summary.is_some() {
                continue;
            }
            let this = Arc::clone(self);
            let id = a.id.clone();
            let text = a.description.clone();
            tasks.spawn(async move { (idx, this.summarize_one(&id, &text).await) });
        }

        let pending = tasks.len();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, summary)) => articles[idx].llm_summary = Some(summary),
                Err(e) => warn!(target: "enrich", error = %e, "summary task aborted"),
            }
        }
        // Anything left unset lost its task; give it the sentinel.
        for a in articles.iter_mut().filter(|a| a.llm_summary.is_none()) {
            a.llm_summary = Some(SUMMARY_UNAVAILABLE.to_string());
        }
        debug!(target: "enrich", total = articles.len(), fetched = pending, "enrichment joined");
        articles
    }

    pub async fn enrich_trending(self: &Arc<Self>, results: Vec<TrendingResult>) -> Vec<TrendingResult> {
        let (articles, meta): (Vec<Article>, Vec<(f64, usize)>) = results
            .into_iter()
            .map(|r| (r.article, (r.trending_score, r.event_count)))
            .unzip();
        self.enrich(articles)
            .await
            .into_iter()
            .zip(meta)
            .map(|(article, (trending_score, event_count))| TrendingResult {
                article,
                trending_score,
                event_count,
            })
            .collect()
    }
}
