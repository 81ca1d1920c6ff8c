// src/news.rs
//! Intent-driven article retrieval.
//!
//! Each intent maps to one retrieval strategy and one ordering:
//! category/source → filter, newest first; score → threshold, highest first;
//! nearby → radius (+ optional text), nearest first; search → text filter,
//! composite relevance. Blank category/source/search fall back to the latest
//! articles. Results are cut to `max_articles` with the pre-cut total kept.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::enrich::SummaryEnricher;
use crate::error::{NewsError, NewsResult};
use crate::geo::{filter_within, validate_location, GeoPoint};
use crate::llm::DynIntentParser;
use crate::models::{Article, Entities, Intent, IntentResponse, NamedEntities};
use crate::ranking::{sort_by_date_desc, sort_by_distance_from, sort_by_score_desc, RelevanceRanker};
use crate::store::{ArticleFilter, ArticleStats, ArticleStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewsSettings {
    pub default_radius_km: f64,
    pub max_articles: usize,
    pub score_threshold: f64,
    pub intent_timeout: Duration,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            default_radius_km: 10.0,
            max_articles: 5,
            score_threshold: 0.7,
            intent_timeout: Duration::from_secs(10),
        }
    }
}

/// What to fetch and how to order it.
#[derive(Debug, Clone, Default)]
pub struct FetchParams {
    pub intent: Option<Intent>,
    pub entities: Entities,
    pub named_entities: Option<NamedEntities>,
    pub center: Option<GeoPoint>,
    pub radius_km: f64,
}

impl FetchParams {
    pub fn new(intent: Intent, entities: Entities) -> Self {
        Self {
            intent: Some(intent),
            entities,
            ..Self::default()
        }
    }

    pub fn near(mut self, center: GeoPoint, radius_km: f64) -> Self {
        self.center = Some(center);
        self.radius_km = radius_km;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub articles: Vec<Article>,
    /// Matches before the `max_articles` cut.
    pub total_available: usize,
}

pub struct NewsService {
    articles: Arc<dyn ArticleStore>,
    intent: DynIntentParser,
    enricher: Arc<SummaryEnricher>,
    ranker: RelevanceRanker,
    settings: NewsSettings,
}

impl NewsService {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        intent: DynIntentParser,
        enricher: Arc<SummaryEnricher>,
        ranker: RelevanceRanker,
        settings: NewsSettings,
    ) -> Self {
        Self {
            articles,
            intent,
            enricher,
            ranker,
            settings,
        }
    }

    pub fn settings(&self) -> &NewsSettings {
        &self.settings
    }

    /// Intent for `query`, never failing: errors, timeouts and unusable output
    /// all become the search fallback.
    pub async fn parse_intent(&self, query: &str) -> IntentResponse {
        let qid = crate::anon_hash(query);
        match tokio::time::timeout(self.settings.intent_timeout, self.intent.parse_intent(query)).await {
            Ok(Ok(resp)) => {
                debug!(target: "search", %qid, intent = %resp.intent, "intent parsed");
                resp
            }
            Ok(Err(e)) => {
                counter!("intent_fallback_total").increment(1);
                warn!(target: "llm", %qid, error = %e, "intent parse failed, using search");
                IntentResponse::fallback(query)
            }
            Err(_) => {
                counter!("intent_fallback_total").increment(1);
                warn!(target: "llm", %qid, "intent parse timed out, using search");
                IntentResponse::fallback(query)
            }
        }
    }

    /// Retrieve, order and cut. No enrichment.
    pub async fn fetch(&self, params: &FetchParams) -> NewsResult<FetchResult> {
        let mut articles = match params.intent {
            Some(Intent::Category) => {
                let mut v = match params.entities.category_text() {
                    Some(c) => self.articles.find_articles(&ArticleFilter::category(c)).await?,
                    None => self.latest().await?,
                };
                sort_by_date_desc(&mut v);
                v
            }
            Some(Intent::Source) => {
                let mut v = match params.entities.source_text() {
                    Some(s) => self.articles.find_articles(&ArticleFilter::source(s)).await?,
                    None => self.latest().await?,
                };
                sort_by_date_desc(&mut v);
                v
            }
            Some(Intent::Score) => {
                let mut v = self
                    .articles
                    .find_articles(&ArticleFilter::min_score(self.settings.score_threshold))
                    .await?;
                sort_by_score_desc(&mut v);
                v
            }
            Some(Intent::Nearby) => match params.center {
                Some(center) => self.nearby(center, params.radius_km, params.entities.query_text()).await?,
                None => {
                    debug!(target: "search", "nearby intent without coordinates, searching instead");
                    self.search(&params.entities, params.named_entities.as_ref()).await?
                }
            },
            Some(Intent::Search) => self.search(&params.entities, params.named_entities.as_ref()).await?,
            None => {
                let mut v = self.search_candidates(params.entities.query_text()).await?;
                sort_by_date_desc(&mut v);
                v
            }
        };

        let total_available = articles.len();
        articles.truncate(self.settings.max_articles);
        Ok(FetchResult {
            articles,
            total_available,
        })
    }

    async fn latest(&self) -> NewsResult<Vec<Article>> {
        Ok(self
            .articles
            .find_articles(&ArticleFilter::latest(self.settings.max_articles))
            .await?)
    }

    async fn search_candidates(&self, query: Option<&str>) -> NewsResult<Vec<Article>> {
        match query {
            Some(q) => Ok(self.articles.find_articles(&ArticleFilter::text(q)).await?),
            None => self.latest().await,
        }
    }

    async fn search(&self, entities: &Entities, named: Option<&NamedEntities>) -> NewsResult<Vec<Article>> {
        let query = entities.query_text();
        let candidates = self.search_candidates(query).await?;
        Ok(self
            .ranker
            .rank_by_search_relevance(candidates, query.unwrap_or(""), named))
    }

    async fn nearby(&self, center: GeoPoint, radius_km: f64, query: Option<&str>) -> NewsResult<Vec<Article>> {
        validate_location(center.lat, center.lon)?;
        let radius = if radius_km > 0.0 && radius_km.is_finite() {
            radius_km
        } else {
            self.settings.default_radius_km
        };
        let pool = match query {
            Some(q) => self.articles.find_articles(&ArticleFilter::text(q)).await?,
            None => self.articles.all_articles().await?,
        };
        let mut v = filter_within(pool, center, radius, |_| true);
        sort_by_distance_from(&mut v, center);
        Ok(v)
    }

    /// Fetch then enrich with summaries.
    pub async fn fetch_enriched(&self, params: &FetchParams) -> NewsResult<FetchResult> {
        let mut res = self.fetch(params).await?;
        res.articles = self.enricher.enrich(res.articles).await;
        Ok(res)
    }

    /// Free-form query: parse intent, run its strategy, enrich.
    pub async fn query_with_intent(
        &self,
        query: &str,
        center: Option<GeoPoint>,
        radius_km: f64,
    ) -> NewsResult<(FetchResult, IntentResponse)> {
        if query.trim().is_empty() {
            return Err(NewsError::invalid("query is required"));
        }
        let intent = self.parse_intent(query).await;
        let mut params = FetchParams::new(intent.intent, intent.entities.clone());
        params.named_entities = intent.named_entities.clone();
        if let Some(c) = center {
            params = params.near(c, radius_km);
        }
        let res = self.fetch_enriched(&params).await?;
        info!(
            target: "search",
            qid = %crate::anon_hash(query),
            intent = %intent.intent,
            count = res.articles.len(),
            total = res.total_available,
            "query served"
        );
        Ok((res, intent))
    }

    /// Text search on the raw query, ranked with any named entities the
    /// intent parser found.
    pub async fn search_with_intent(&self, query: &str) -> NewsResult<(FetchResult, IntentResponse)> {
        if query.trim().is_empty() {
            return Err(NewsError::invalid("query is required"));
        }
        let intent = self.parse_intent(query).await;
        let params = FetchParams {
            intent: Some(Intent::Search),
            entities: Entities::with_query(query),
            named_entities: intent.named_entities.clone(),
            ..FetchParams::default()
        };
        let res = self.fetch_enriched(&params).await?;
        Ok((res, intent))
    }

    pub async fn get_article(&self, id: &str) -> NewsResult<Article> {
        self.articles
            .get_article(id)
            .await?
            .ok_or_else(|| NewsError::not_found(format!("article {id} not found")))
    }

    pub async fn get_article_with_summary(&self, id: &str) -> NewsResult<Article> {
        let mut article = self.get_article(id).await?;
        if article.llm_summary.is_none() {
            let summary = self
                .enricher
                .summarize_one(&article.id, &article.description)
                .await;
            article.llm_summary = Some(summary);
        }
        Ok(article)
    }

    pub async fn article_stats(&self) -> NewsResult<ArticleStats> {
        Ok(self.articles.article_stats().await?)
    }
}
