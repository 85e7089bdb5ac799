//! Identity filter: forwards its input data object unchanged.

use std::any::Any;
use std::sync::Arc;

use crate::data::SCALAR_FIELD;
use crate::error::PipelineError;
use crate::extent::ExtentKind;
use crate::info::InformationBag;
use crate::node::{Algorithm, InputPortSpec, OutputPortSpec, Request};

/// Shares the upstream data object with its consumer. The forwarded object
/// keeps its producer's stamp and realized extent, so the superset rule
/// applies across this node transparently.
#[derive(Default)]
pub struct PassThrough {
    executions: u64,
}

impl PassThrough {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executions(&self) -> u64 {
        self.executions
    }
}

impl Algorithm for PassThrough {
    fn type_name(&self) -> &'static str {
        "PassThrough"
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
        _request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        let data = inputs[0][0]
            .data_object()
            .ok_or_else(|| PipelineError::execution("PassThrough has no input data"))?;
        outputs[0].set_data_object(Arc::clone(data));
        self.executions += 1;
        Ok(())
    }
}
