// src/config/service.rs
//! Service tunables: TOML file with env overrides on top.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::ranking::RankingWeights;

pub const DEFAULT_NEWS_CONFIG_PATH: &str = "config/news.toml";
pub const ENV_NEWS_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
/// One year; longer windows only push the event cutoff past chrono's range.
pub const MAX_TRENDING_WINDOW_HOURS: u32 = 24 * 365;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub default_radius_km: f64,
    pub max_articles: usize,
    /// Minimum base relevance for the `score` strategy and the trending fallback.
    pub score_threshold: f64,
    pub trending_cache_ttl_secs: u64,
    pub trending_radius_km: f64,
    pub trending_window_hours: u32,
    pub summary_concurrency: usize,
    pub summary_timeout_ms: u64,
    pub intent_timeout_ms: u64,
    pub data_path: PathBuf,
    pub ranking: RankingWeights,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 10.0,
            max_articles: 5,
            score_threshold: 0.7,
            trending_cache_ttl_secs: 300,
            trending_radius_km: 50.0,
            trending_window_hours: 24,
            summary_concurrency: 5,
            summary_timeout_ms: 10_000,
            intent_timeout_ms: 10_000,
            data_path: PathBuf::from("data/news_data.json"),
            ranking: RankingWeights::default(),
        }
    }
}

impl ServiceConfig {
    /// Read `NEWS_CONFIG_PATH` (or `config/news.toml`); a missing file means
    /// defaults. Env overrides are applied afterwards either way.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_NEWS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_NEWS_CONFIG_PATH));

        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("Failed to read news config at {}: {}", path.display(), e)
            })?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: ServiceConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Overrides from `DEFAULT_RADIUS`, `MAX_ARTICLES`, `SCORE_THRESHOLD`,
    /// `TRENDING_CACHE_TTL`, `TRENDING_RADIUS`, `TRENDING_TIME_WINDOW`,
    /// `SUMMARY_CONCURRENCY` and `NEWS_DATA_PATH`. Unparseable values are ignored.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_env::<f64>(get("DEFAULT_RADIUS")) {
            self.default_radius_km = v;
        }
        if let Some(v) = parse_env::<usize>(get("MAX_ARTICLES")) {
            self.max_articles = v;
        }
        if let Some(v) = parse_env::<f64>(get("SCORE_THRESHOLD")) {
            self.score_threshold = v;
        }
        if let Some(v) = parse_env::<u64>(get("TRENDING_CACHE_TTL")) {
            self.trending_cache_ttl_secs = v;
        }
        if let Some(v) = parse_env::<f64>(get("TRENDING_RADIUS")) {
            self.trending_radius_km = v;
        }
        if let Some(v) = parse_env::<u32>(get("TRENDING_TIME_WINDOW")) {
            self.trending_window_hours = v;
        }
        if let Some(v) = parse_env::<usize>(get("SUMMARY_CONCURRENCY")) {
            self.summary_concurrency = v;
        }
        if let Some(p) = get("NEWS_DATA_PATH").filter(|p| !p.trim().is_empty()) {
            self.data_path = PathBuf::from(p);
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        let d = Self::default();
        if !self.score_threshold.is_finite() {
            self.score_threshold = d.score_threshold;
        }
        self.score_threshold = self.score_threshold.clamp(0.0, 1.0);
        if !self.default_radius_km.is_finite() || self.default_radius_km <= 0.0 {
            self.default_radius_km = d.default_radius_km;
        }
        if !self.trending_radius_km.is_finite() || self.trending_radius_km <= 0.0 {
            self.trending_radius_km = d.trending_radius_km;
        }
        if self.max_articles == 0 {
            self.max_articles = d.max_articles;
        }
        if self.summary_concurrency == 0 {
            self.summary_concurrency = 1;
        }
        self.trending_window_hours = self.trending_window_hours.min(MAX_TRENDING_WINDOW_HOURS);
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.trending_cache_ttl_secs)
    }

    pub fn summary_timeout(&self) -> Duration {
        Duration::from_millis(self.summary_timeout_ms)
    }

    pub fn intent_timeout(&self) -> Duration {
        Duration::from_millis(self.intent_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
}
