//! LexSight server: HTTP API over the document analysis pipeline.

pub mod jobs;
pub mod routes;
pub mod state;

pub use state::AppState;
