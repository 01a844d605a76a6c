//! Service layer: shared state and the thin facades over it.

pub mod app_state;
pub mod llm;
pub mod queries;
pub mod session;

pub use app_state::AppState;
