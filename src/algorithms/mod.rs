//! Stock algorithms.
//!
//! These are ordinary `Algorithm` implementations with no special standing;
//! they exercise the request protocol end to end (source, padded filter,
//! pass-through, unstructured source, multi-pass accumulation) and are what
//! the integration tests and the demo binary are built from.

mod accumulate;
mod dilate;
mod function_source;
mod pass_through;
mod piece_source;

pub use accumulate::AccumulateFilter;
pub use dilate::DilateFilter;
pub use function_source::FunctionSource;
pub use pass_through::PassThrough;
pub use piece_source::PieceSource;
