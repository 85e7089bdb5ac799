//! Data objects: opaque payloads produced by nodes.
//!
//! The executive never looks inside a payload; it only needs the attached
//! [`DataInformation`] (the extent actually realized plus a monotonic
//! production stamp). Downstream consumers receive data objects behind an
//! `Arc` and may not mutate them; a producer replaces its output wholesale on
//! the next execution.

mod piece_set;
mod scalar_field;

pub use piece_set::{PieceSet, PIECE_SET};
pub use scalar_field::{ScalarField, SCALAR_FIELD};

use std::any::Any;
use std::fmt;

use serde::Serialize;

use crate::extent::Extent;

/// Metadata attached to every data object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataInformation {
    /// The extent this object actually covers. May be a superset of what was
    /// requested.
    pub realized: Extent,
    /// Pipeline tick at which the object was produced. Stamped by the
    /// executive when the producing node commits its output.
    pub produced_at: u64,
}

impl DataInformation {
    pub fn new(realized: impl Into<Extent>) -> Self {
        DataInformation {
            realized: realized.into(),
            produced_at: 0,
        }
    }
}

/// The executive-facing contract of a payload.
///
/// Concrete kinds are matched against port type tags at wiring time; nodes
/// downcast through `as_any` to reach the actual data.
pub trait DataObject: Any + fmt::Debug + Send + Sync {
    /// Type tag matched against [`crate::node::OutputPortSpec::data_type`].
    fn type_tag(&self) -> &'static str;

    fn information(&self) -> &DataInformation;

    fn information_mut(&mut self) -> &mut DataInformation;

    fn as_any(&self) -> &dyn Any;
}
