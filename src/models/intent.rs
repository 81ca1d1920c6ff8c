// src/models/intent.rs
//! Typed result of intent parsing.
//!
//! The LLM answers with loose JSON (`{"intent": ..., "entities": {...}}`); this
//! module turns it into explicit optional fields and applies the fallback
//! rules: unknown intent → `search`, missing query → the original query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Category,
    Source,
    Search,
    Nearby,
    Score,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Category => "category",
            Intent::Source => "source",
            Intent::Search => "search",
            Intent::Nearby => "nearby",
            Intent::Score => "score",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(Intent::Category),
            "source" => Ok(Intent::Source),
            "search" => Ok(Intent::Search),
            "nearby" => Ok(Intent::Nearby),
            "score" => Ok(Intent::Score),
            _ => Err(()),
        }
    }
}

/// Scalar entities that drive retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "source_name")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Entities {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Query text if present and non-blank.
    pub fn query_text(&self) -> Option<&str> {
        non_blank(self.query.as_deref())
    }

    pub fn category_text(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    pub fn source_text(&self) -> Option<&str> {
        non_blank(self.source.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// People/organizations/locations/events extracted upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl NamedEntities {
    pub fn is_empty(&self) -> bool {
        self.terms().next().is_none()
    }

    /// All non-blank terms across the four groups.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.people
            .iter()
            .chain(&self.organizations)
            .chain(&self.locations)
            .chain(&self.events)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentResponse {
    pub intent: Intent,
    pub entities: Entities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_entities: Option<NamedEntities>,
}

impl IntentResponse {
    /// Used whenever the parser is unavailable or its answer is unusable.
    pub fn fallback(query: &str) -> Self {
        Self {
            intent: Intent::Search,
            entities: Entities::with_query(query),
            named_entities: None,
        }
    }

    /// Interpret raw model output. Returns `None` when it is not a JSON object
    /// at all; the caller then uses [`IntentResponse::fallback`].
    pub fn from_model_output(content: &str, query: &str) -> Option<Self> {
        let cleaned = strip_code_fence(content);
        let root: Value = serde_json::from_str(cleaned).ok()?;
        let obj = root.as_object()?;

        let intent = obj
            .get("intent")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Intent>().ok())
            .unwrap_or_else(|| {
                tracing::warn!(target: "llm", "unknown intent from model, defaulting to search");
                Intent::Search
            });

        let empty = Map::new();
        let raw = obj
            .get("entities")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let mut entities = Entities {
            query: string_field(raw, "query"),
            category: string_field(raw, "category"),
            source: string_field(raw, "source").or_else(|| string_field(raw, "source_name")),
            location: string_field(raw, "location"),
        };
        if entities.query.is_none() {
            entities.query = Some(query.to_string());
        }

        let named = NamedEntities {
            people: list_field(raw, "people"),
            organizations: list_field(raw, "organizations"),
            locations: list_field(raw, "locations"),
            events: list_field(raw, "events"),
        };

        Some(Self {
            intent,
            entities,
            named_entities: (!named.is_empty()).then_some(named),
        })
    }
}

/// Models like to wrap JSON in ```json fences.
fn strip_code_fence(content: &str) -> &str {
    let s = content.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
