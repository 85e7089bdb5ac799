//! A structured source sampling a scalar function over the requested box.

use std::any::Any;
use std::sync::Arc;

use rayon::prelude::*;

use crate::data::{ScalarField, SCALAR_FIELD};
use crate::error::PipelineError;
use crate::extent::{Extent, ExtentKind, StructuredExtent};
use crate::info::InformationBag;
use crate::node::{Algorithm, InputPortSpec, OutputPortSpec, Request};

fn ramp_x(x: f64, _y: f64, _z: f64) -> f64 {
    x
}

/// Samples `f(x, y, z)` over exactly the requested extent.
///
/// The fill fans out over z-slabs on the rayon pool; the executive sees a
/// single blocking `REQUEST_DATA` call either way.
pub struct FunctionSource {
    whole: StructuredExtent,
    function: fn(f64, f64, f64) -> f64,
    executions: u64,
}

impl FunctionSource {
    pub fn new(whole: StructuredExtent) -> Self {
        FunctionSource {
            whole,
            function: ramp_x,
            executions: 0,
        }
    }

    pub fn with_function(whole: StructuredExtent, function: fn(f64, f64, f64) -> f64) -> Self {
        FunctionSource {
            function,
            ..FunctionSource::new(whole)
        }
    }

    pub fn set_whole_extent(&mut self, whole: StructuredExtent) {
        self.whole = whole;
    }

    /// How many times `REQUEST_DATA` has run on this node.
    pub fn executions(&self) -> u64 {
        self.executions
    }
}

impl Algorithm for FunctionSource {
    fn type_name(&self) -> &'static str {
        "FunctionSource"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        Vec::new()
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("out", ExtentKind::Structured, SCALAR_FIELD)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn request_information(
        &mut self,
        _request: &mut Request,
        _inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        outputs[0].set_whole_extent(self.whole);
        // Origin and spacing; samples sit on the integer lattice.
        outputs[0].set_spatial_metadata(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &mut Request,
        _inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        let Some(Extent::Structured(extent)) = outputs[0].update_extent() else {
            return Err(PipelineError::execution(
                "FunctionSource needs a structured update extent",
            ));
        };
        let [nx, ny, _] = extent.dims();
        let plane = nx * ny;
        let mut values = vec![0.0; extent.num_points()];
        if plane > 0 {
            let e = extent.0;
            let f = self.function;
            values
                .par_chunks_mut(plane)
                .enumerate()
                .for_each(|(zi, chunk)| {
                    let z = e[4] + zi as i32;
                    for iy in 0..ny {
                        let y = e[2] + iy as i32;
                        for ix in 0..nx {
                            let x = e[0] + ix as i32;
                            chunk[iy * nx + ix] = f(x as f64, y as f64, z as f64);
                        }
                    }
                });
        }
        outputs[0].set_data_object(Arc::new(ScalarField::new(extent, values)));
        self.executions += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::RequestKind;

    #[test]
    fn fills_exactly_the_requested_extent() {
        let mut source = FunctionSource::new(StructuredExtent::line(0, 99));
        let mut outputs = vec![InformationBag::new()];
        outputs[0].set_update_extent(StructuredExtent::line(10, 14));
        let mut request = Request::new(RequestKind::Data, 0);
        source
            .request_data(&mut request, &mut [], &mut outputs)
            .unwrap();

        let data = outputs[0].data_object().unwrap();
        let field = data.as_any().downcast_ref::<ScalarField>().unwrap();
        assert_eq!(*field.extent(), StructuredExtent::line(10, 14));
        assert_eq!(field.value(12, 0, 0), Some(12.0));
        assert_eq!(source.executions(), 1);
    }
}
