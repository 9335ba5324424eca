//! Runtime context bundling the shared worker pool and timer service.

pub mod context;

pub use context::Context;
