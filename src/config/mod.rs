// src/config/mod.rs
pub mod llm;
pub mod service;

pub use llm::LlmConfig;
pub use service::ServiceConfig;
