//! Builders to construct runtime components from configuration.

pub mod context_builder;

pub use context_builder::{build_context, build_timer_service, build_worker_pool};
