// src/trending/score.rs
//! Trending score arithmetic.
//!
//! Each event contributes `kind_weight * exp(-hours / 12)`; the decay is
//! applied once, per event. The aggregate is a decayed weighted count that
//! is then boosted by base relevance and proximity.

use chrono::{DateTime, Utc};

use crate::models::InteractionEvent;

/// Decay constant in hours (half-life ≈ 8.3h).
pub const DECAY_HOURS: f64 = 12.0;
/// `score *= 1 + RELEVANCE_BOOST * relevance`.
pub const RELEVANCE_BOOST: f64 = 0.2;
/// Articles closer than this to the query center get [`LOCAL_MULTIPLIER`].
pub const LOCAL_RADIUS_KM: f64 = 10.0;
pub const LOCAL_MULTIPLIER: f64 = 1.5;
/// Fallback entries score `relevance * FALLBACK_MULTIPLIER`.
pub const FALLBACK_MULTIPLIER: f64 = 10.0;

/// `exp(-hours / 12)`. Events stamped in the future count as fresh.
pub fn recency_factor(hours_ago: f64) -> f64 {
    (-hours_ago.max(0.0) / DECAY_HOURS).exp()
}

/// `count * (total_weight / count) * recency`, and 0 for no events.
pub fn compute_trending_score(event_count: usize, total_weight: f64, recency: f64) -> f64 {
    if event_count == 0 {
        return 0.0;
    }
    let avg = total_weight / event_count as f64;
    event_count as f64 * avg * recency
}

/// Decayed weight of a single event as seen at `now`.
pub fn event_weight(event: &InteractionEvent, now: DateTime<Utc>) -> f64 {
    let hours = (now - event.timestamp).num_milliseconds() as f64 / 3_600_000.0;
    event.kind.weight() * recency_factor(hours)
}

/// Apply relevance and proximity boosts to a raw score.
pub fn boosted_score(raw: f64, relevance: f64, distance_km: f64) -> f64 {
    let mut s = raw * (1.0 + RELEVANCE_BOOST * relevance);
    if distance_km < LOCAL_RADIUS_KM {
        s *= LOCAL_MULTIPLIER;
    }
    s
}

/// Raw (unboosted) score for one article's contributing events.
pub fn raw_score(events: &[InteractionEvent], now: DateTime<Utc>) -> f64 {
    let total: f64 = events.iter().map(|e| event_weight(e, now)).sum();
    compute_trending_score(events.len(), total, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;
    use chrono::Duration;

    fn ev(kind: EventKind, at: DateTime<Utc>) -> InteractionEvent {
        InteractionEvent {
            id: 1,
            article_id: "a".into(),
            user_id: "u".into(),
            kind,
            latitude: 0.0,
            longitude: 0.0,
            timestamp: at,
        }
    }

    #[test]
    fn recency_points() {
        assert!((recency_factor(0.0) - 1.0).abs() < 1e-12);
        assert!((recency_factor(12.0) - 0.368).abs() < 0.02);
        let mut prev = recency_factor(0.0);
        for h in 1..72 {
            let cur = recency_factor(h as f64);
            assert!(cur < prev);
            prev = cur;
        }
    }

    #[test]
    fn future_events_do_not_exceed_one() {
        assert_eq!(recency_factor(-5.0), 1.0);
    }

    #[test]
    fn trending_score_points() {
        assert_eq!(compute_trending_score(0, 5.0, 1.0), 0.0);
        assert!((compute_trending_score(10, 20.0, 1.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn boosts() {
        assert!((boosted_score(10.0, 0.5, 50.0) - 11.0).abs() < 1e-12);
        assert!((boosted_score(10.0, 0.5, 2.0) - 16.5).abs() < 1e-12);
        // exactly at the boundary is not "local"
        assert!((boosted_score(10.0, 0.0, 10.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn decay_is_applied_once() {
        let now = Utc::now();
        let events = vec![
            ev(EventKind::Share, now - Duration::hours(12)),
            ev(EventKind::View, now),
        ];
        let expected = 3.0 * (-1.0f64).exp() + 1.0;
        assert!((raw_score(&events, now) - expected).abs() < 1e-9);
    }
}
