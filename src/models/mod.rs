// src/models/mod.rs
//! Domain records: articles, interaction events, trending results and the
//! typed intent/entity structure returned by the intent parser.

pub mod article;
pub mod event;
pub mod intent;

pub use article::{Article, ArticleResponse, Scored};
pub use event::{EventKind, InteractionEvent, NewEvent, TrendingResult};
pub use intent::{Entities, Intent, IntentResponse, NamedEntities};
