//! The pipeline executive: demand-driven request negotiation over the graph.
//!
//! One executive record exists per node; the [`Pipeline`]
//! driver walks the graph recursively and mediates the four request kinds.
//! `update` on a terminal node negotiates metadata upstream-first, pulls the
//! minimum necessary region from each producer, then executes leaf-first.
//! Nothing runs until a consumer asks, and nothing re-runs while the held
//! data still covers the request.

mod cache;
mod executive;
pub(crate) mod streaming;

pub use cache::{CacheStats, RequestKey};
pub use executive::Pipeline;
