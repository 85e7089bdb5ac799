//! A neighborhood filter that needs a halo: running maximum along x.

use std::any::Any;
use std::sync::Arc;

use crate::data::{ScalarField, SCALAR_FIELD};
use crate::error::PipelineError;
use crate::extent::{Extent, ExtentKind};
use crate::info::InformationBag;
use crate::node::{Algorithm, InputPortSpec, OutputPortSpec, Request};

/// Running maximum over `[x - radius, x + radius]`.
///
/// Requests a region grown by `radius` from its producer (clamped to the
/// whole extent) and realizes everything the producer handed it, so a later
/// smaller request is served without re-executing.
pub struct DilateFilter {
    radius: i32,
    executions: u64,
}

impl DilateFilter {
    pub fn new(radius: i32) -> Self {
        DilateFilter {
            radius,
            executions: 0,
        }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: i32) {
        self.radius = radius;
    }

    pub fn executions(&self) -> u64 {
        self.executions
    }
}

impl Algorithm for DilateFilter {
    fn type_name(&self) -> &'static str {
        "DilateFilter"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::required(
            "in",
            ExtentKind::Structured,
            SCALAR_FIELD,
        )]
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

    fn request_update_extent(
        &mut self,
        _request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        let Some(Extent::Structured(requested)) = outputs[0].update_extent() else {
            return Ok(());
        };
        let input = &mut inputs[0][0];
        let mut padded = requested.grown(self.radius);
        if let Some(Extent::Structured(whole)) = input.whole_extent() {
            padded = padded.intersect(&whole);
        }
        input.set_update_extent(padded);
        input.set_update_initialized(true);
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        let field = inputs[0][0]
            .data_object()
            .and_then(|d| d.as_any().downcast_ref::<ScalarField>().cloned())
            .ok_or_else(|| PipelineError::execution("DilateFilter has no input scalar field"))?;

        // Realize the full region the producer handed over, not just what
        // was asked downstream.
        let extent = *field.extent();
        let e = extent.0;
        let mut values = vec![0.0; extent.num_points()];
        for z in e[4]..=e[5] {
            for y in e[2]..=e[3] {
                for x in e[0]..=e[1] {
                    let lo = (x - self.radius).max(e[0]);
                    let hi = (x + self.radius).min(e[1]);
                    let mut max = f64::NEG_INFINITY;
                    for xx in lo..=hi {
                        if let Some(v) = field.value(xx, y, z) {
                            max = max.max(v);
                        }
                    }
                    if let Some(i) = extent.linear_index(x, y, z) {
                        values[i] = max;
                    }
                }
            }
        }
        outputs[0].set_data_object(Arc::new(ScalarField::new(extent, values)));
        self.executions += 1;
        Ok(())
    }
}
