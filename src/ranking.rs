//! Search relevance ranking.
//!
//! Composite score = `text_weight * text_side + relevance_weight * base_relevance`
//! where `text_side` is the phrase/word match strength of the query against
//! title and description, optionally lifted by named-entity hits.
//!
//! Also hosts the plain orderings used by the retrieval strategies
//! (date, base score, distance).

use serde::{Deserialize, Serialize};

use crate::geo::{distance_km, GeoPoint, Locatable};
use crate::models::{NamedEntities, Scored};

/// Tunable weights for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    /// Whole query phrase found in the title.
    pub title_match: f64,
    /// Whole query phrase found in the description.
    pub description_match: f64,
    /// Scaled by the share of query words found in either field.
    pub word_match: f64,
    /// Scaled by the share of named-entity terms found in either field.
    pub entity_match: f64,
    pub text: f64,
    pub relevance: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            title_match: 0.5,
            description_match: 0.3,
            word_match: 0.2,
            entity_match: 0.2,
            text: 0.6,
            relevance: 0.4,
        }
    }
}

/// An item paired with its composite score; only used for ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate<T> {
    pub item: T,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceRanker {
    weights: RankingWeights,
}

impl RelevanceRanker {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    /// Phrase and word match strength in [0, 1]. Blank query scores 0.
    pub fn text_score<T: Scored>(&self, item: &T, query: &str) -> f64 {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return 0.0;
        }
        let title = item.title().to_lowercase();
        let desc = item.description().to_lowercase();

        let mut score = 0.0;
        if title.contains(&q) {
            score += self.weights.title_match;
        }
        if desc.contains(&q) {
            score += self.weights.description_match;
        }

        let words: Vec<&str> = q.split_whitespace().collect();
        if !words.is_empty() {
            let matched = words
                .iter()
                .filter(|w| title.contains(*w) || desc.contains(*w))
                .count();
            score += self.weights.word_match * matched as f64 / words.len() as f64;
        }
        score
    }

    /// Share of entity terms present in title or description.
    pub fn entity_fraction<T: Scored>(&self, item: &T, named: &NamedEntities) -> f64 {
        let terms: Vec<String> = named.terms().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return 0.0;
        }
        let title = item.title().to_lowercase();
        let desc = item.description().to_lowercase();
        let hits = terms
            .iter()
            .filter(|t| title.contains(t.as_str()) || desc.contains(t.as_str()))
            .count();
        hits as f64 / terms.len() as f64
    }

    /// Composite score in [0, 1] for weights that sum to 1.
    pub fn score<T: Scored>(&self, item: &T, query: &str, named: Option<&NamedEntities>) -> f64 {
        let mut text_side = self.text_score(item, query);
        if let Some(ne) = named {
            text_side += self.weights.entity_match * self.entity_fraction(item, ne);
        }
        let text_side = text_side.min(1.0);
        self.weights.text * text_side + self.weights.relevance * item.relevance_score()
    }

    /// Score every item and order descending. Stable: ties keep input order.
    pub fn rank<T: Scored>(
        &self,
        items: Vec<T>,
        query: &str,
        named: Option<&NamedEntities>,
    ) -> Vec<RankedCandidate<T>> {
        let mut ranked: Vec<RankedCandidate<T>> = items
            .into_iter()
            .map(|item| {
                let score = self.score(&item, query, named);
                RankedCandidate { item, score }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Convenience over [`RelevanceRanker::rank`] that drops the scores.
    pub fn rank_by_search_relevance<T: Scored>(
        &self,
        items: Vec<T>,
        query: &str,
        named: Option<&NamedEntities>,
    ) -> Vec<T> {
        self.rank(items, query, named)
            .into_iter()
            .map(|c| c.item)
            .collect()
    }
}

/// Newest first.
pub fn sort_by_date_desc<T: Scored>(items: &mut [T]) {
    items.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
}

/// Highest base relevance first.
pub fn sort_by_score_desc<T: Scored>(items: &mut [T]) {
    items.sort_by(|a, b| b.relevance_score().total_cmp(&a.relevance_score()));
}

/// Nearest first. Items without a distance annotation get one computed.
pub fn sort_by_distance_from<T: Scored + Locatable>(items: &mut [T], center: GeoPoint) {
    for it in items.iter_mut() {
        if it.distance().is_none() {
            let d = distance_km(center, it.point());
            it.set_distance(d);
        }
    }
    items.sort_by(|a, b| {
        let da = a.distance().unwrap_or(f64::INFINITY);
        let db = b.distance().unwrap_or(f64::INFINITY);
        da.total_cmp(&db)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::fixtures::article;

    #[test]
    fn dual_field_match_beats_base_score_gap() {
        let a = article("A", "Markets rally", "Stocks up", 0.9, 0.0, 0.0);
        let b = article("B", "Climate summit opens", "Leaders meet", 0.5, 0.0, 0.0);
        let c = article("C", "Climate report", "New climate data", 0.3, 0.0, 0.0);

        let ranker = RelevanceRanker::default();
        let ids: Vec<String> = ranker
            .rank_by_search_relevance(vec![a, b, c], "climate", None)
            .into_iter()
            .map(|x| x.id)
            .collect();
        let pos = |id: &str| ids.iter().position(|x| x == id).unwrap();
        assert!(pos("C") < pos("A"));
        assert!(pos("C") < pos("B"));
    }

    #[test]
    fn text_score_components_add_up() {
        let ranker = RelevanceRanker::default();
        let a = article("x", "Climate change now", "climate change policy", 0.0, 0.0, 0.0);
        let s = ranker.text_score(&a, "Climate Change");
        assert!((s - 1.0).abs() < 1e-9, "got {s}");

        let half_words = article("y", "climate", "nothing", 0.0, 0.0, 0.0);
        let s = ranker.text_score(&half_words, "climate change");
        assert!((s - 0.1).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn empty_query_orders_by_base_relevance() {
        let ranker = RelevanceRanker::default();
        let items = vec![
            article("low", "a", "b", 0.2, 0.0, 0.0),
            article("high", "a", "b", 0.8, 0.0, 0.0),
            article("mid", "a", "b", 0.5, 0.0, 0.0),
        ];
        let ranked = ranker.rank(items, "   ", None);
        let ids: Vec<&str> = ranked.iter().map(|c| c.item.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        assert!((ranked[0].score - 0.32).abs() < 1e-9);
    }

    #[test]
    fn named_entities_lift_text_side() {
        let ranker = RelevanceRanker::default();
        let a = article("a", "Apple earnings beat", "Cupertino firm", 0.5, 0.0, 0.0);
        let ne = NamedEntities {
            organizations: vec!["Apple".into(), "Microsoft".into()],
            ..Default::default()
        };
        let without = ranker.score(&a, "", None);
        let with = ranker.score(&a, "", Some(&ne));
        assert!((with - without - 0.6 * 0.2 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn text_side_is_capped() {
        let ranker = RelevanceRanker::default();
        let a = article("a", "apple", "apple", 0.0, 0.0, 0.0);
        let ne = NamedEntities {
            organizations: vec!["apple".into()],
            ..Default::default()
        };
        let s = ranker.score(&a, "apple", Some(&ne));
        assert!((s - 0.6).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn distance_sort_annotates() {
        let mut items = vec![
            article("far", "t", "d", 0.5, 34.05, -118.24),
            article("near", "t", "d", 0.5, 37.78, -122.42),
        ];
        sort_by_distance_from(&mut items, GeoPoint::new(37.7749, -122.4194));
        assert_eq!(items[0].id, "near");
        assert!(items.iter().all(|a| a.distance.is_some()));
    }
}
