//! A multi-pass filter: sums its input over a fixed number of passes,
//! asking to continue executing until the last one.

use std::any::Any;
use std::sync::Arc;

use crate::data::{ScalarField, SCALAR_FIELD};
use crate::error::PipelineError;
use crate::extent::ExtentKind;
use crate::info::InformationBag;
use crate::node::{Algorithm, InputPortSpec, OutputPortSpec, Request};

/// Adds the input field to an accumulator once per pass and realizes the
/// running sum. Until the final pass it sets `continue_executing`, so a
/// single `update` drives it `passes` times.
pub struct AccumulateFilter {
    passes: u32,
    current_pass: u32,
    accumulator: Vec<f64>,
    executions: u64,
}

impl AccumulateFilter {
    pub fn new(passes: u32) -> Self {
        AccumulateFilter {
            passes: passes.max(1),
            current_pass: 0,
            accumulator: Vec::new(),
            executions: 0,
        }
    }

    pub fn executions(&self) -> u64 {
        self.executions
    }
}

impl Algorithm for AccumulateFilter {
    fn type_name(&self) -> &'static str {
        "AccumulateFilter"
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

    fn request_data(
        &mut self,
        request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        let field = inputs[0][0]
            .data_object()
            .and_then(|d| d.as_any().downcast_ref::<ScalarField>().cloned())
            .ok_or_else(|| PipelineError::execution("AccumulateFilter has no input field"))?;

        if self.current_pass == 0 {
            self.accumulator = vec![0.0; field.values().len()];
        }
        for (acc, v) in self.accumulator.iter_mut().zip(field.values()) {
            *acc += v;
        }
        self.current_pass += 1;
        self.executions += 1;

        outputs[0].set_data_object(Arc::new(ScalarField::new(
            *field.extent(),
            self.accumulator.clone(),
        )));

        if self.current_pass < self.passes {
            request.continue_executing = true;
        } else {
            request.continue_executing = false;
            self.current_pass = 0;
        }
        Ok(())
    }
}
