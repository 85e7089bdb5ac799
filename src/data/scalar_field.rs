//! A structured box of scalar samples, row-major over x then y then z.

use std::any::Any;

use crate::data::{DataInformation, DataObject};
use crate::extent::StructuredExtent;

pub const SCALAR_FIELD: &str = "scalar_field";

#[derive(Debug, Clone)]
pub struct ScalarField {
    info: DataInformation,
    extent: StructuredExtent,
    values: Vec<f64>,
}

impl ScalarField {
    /// `values.len()` must equal `extent.num_points()`.
    pub fn new(extent: StructuredExtent, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), extent.num_points());
        ScalarField {
            info: DataInformation::new(extent),
            extent,
            values,
        }
    }

    pub fn extent(&self) -> &StructuredExtent {
        &self.extent
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The sample at global coordinates, or `None` outside the held extent.
    pub fn value(&self, x: i32, y: i32, z: i32) -> Option<f64> {
        self.extent.linear_index(x, y, z).map(|i| self.values[i])
    }
}

impl DataObject for ScalarField {
    fn type_tag(&self) -> &'static str {
        SCALAR_FIELD
    }

    fn information(&self) -> &DataInformation {
        &self.info
    }

    fn information_mut(&mut self) -> &mut DataInformation {
        &mut self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
