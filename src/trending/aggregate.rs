// src/trending/aggregate.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::geo::{within_radius, GeoPoint};
use crate::models::InteractionEvent;

/// Group events by article, keeping those at or after `since` and inside
/// the radius. Articles with no qualifying event are absent from the map.
pub fn aggregate<I>(
    events: I,
    center: GeoPoint,
    radius_km: f64,
    since: DateTime<Utc>,
) -> HashMap<String, Vec<InteractionEvent>>
where
    I: IntoIterator<Item = InteractionEvent>,
{
    let mut by_article: HashMap<String, Vec<InteractionEvent>> = HashMap::new();
    for ev in events {
        if ev.timestamp < since || !within_radius(center, ev.point(), radius_km) {
            continue;
        }
        by_article.entry(ev.article_id.clone()).or_default().push(ev);
    }
    by_article
}
