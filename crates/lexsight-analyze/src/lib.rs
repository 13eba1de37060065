//! LexSight Analyze: structured document analysis via a generative model.
//!
//! The remote model sits behind [`GenerativeClient`]. Every entry point has
//! a local fallback, so callers always get a usable answer: the
//! [`ContentAnalyzer`] falls back to [`fallback`], the risk and chat
//! assistants to their keyword heuristics. [`RelevanceRanker`] ranks a
//! whole collection without the model.

pub mod analyzer;
pub mod chat;
pub mod client;
pub mod config;
pub mod fallback;
pub mod prompt;
pub mod ranker;
pub mod rate_limit;
pub mod response;
pub mod risk;

pub use analyzer::ContentAnalyzer;
pub use chat::{ChatAssistant, ChatReply, ChatRequest};
pub use client::{GeminiClient, GenerationParams, GenerativeClient};
pub use config::AnalyzerConfig;
pub use ranker::{PersonaProfile, RankerConfig, RelevanceRanker};
pub use rate_limit::RateLimiter;
pub use risk::{Risk, RiskAnalyzer, RiskCategory, RiskLevel, RiskReport};
