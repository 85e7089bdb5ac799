//! Base request protocol: idempotence, failure handling, cycles, multi-pass.

use std::any::Any;
use std::sync::Arc;

use pullgraph::algorithms::{AccumulateFilter, FunctionSource, PassThrough};
use pullgraph::data::{ScalarField, SCALAR_FIELD};
use pullgraph::{
    Algorithm, Extent, ExtentKind, InformationBag, InputPortSpec, OutputPortSpec, Pipeline,
    PipelineError, Request, StructuredExtent,
};

/// Pass-through that can be told to fail its next execution.
struct FlakyFilter {
    fail: bool,
    executions: u64,
}

impl FlakyFilter {
    fn new() -> Self {
        FlakyFilter {
            fail: false,
            executions: 0,
        }
    }
}

impl Algorithm for FlakyFilter {
    fn type_name(&self) -> &'static str {
        "FlakyFilter"
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

    fn request_information(
        &mut self,
        _request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        match inputs.first().and_then(|conns| conns.first()) {
            Some(upstream) => {
                let whole = upstream.whole_extent();
                if let Some(whole) = whole {
                    outputs[0].set_whole_extent(whole);
                }
            }
            // Claims a domain even while unwired, so the missing connection
            // is discovered at data time.
            None => outputs[0].set_whole_extent(StructuredExtent::line(0, 99)),
        }
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        if self.fail {
            return Err(PipelineError::execution("flaky filter told to fail"));
        }
        let data = inputs[0][0]
            .data_object()
            .ok_or_else(|| PipelineError::execution("no input"))?;
        outputs[0].set_data_object(Arc::clone(data));
        self.executions += 1;
        Ok(())
    }
}

fn source_executions(pipeline: &Pipeline, id: pullgraph::NodeId) -> u64 {
    pipeline
        .algorithm::<FunctionSource>(id)
        .expect("source node")
        .executions()
}

#[test]
fn update_is_idempotent_for_an_unchanged_request() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_node(FunctionSource::new(StructuredExtent::line(0, 99)));
    let sink = pipeline.add_node(PassThrough::new());
    pipeline.connect(source, 0, sink, 0).unwrap();

    pipeline
        .set_update_extent(sink, 0, StructuredExtent::line(10, 20))
        .unwrap();
    pipeline.update(sink).unwrap();
    pipeline.update(sink).unwrap();

    assert_eq!(source_executions(&pipeline, source), 1);
    assert_eq!(
        pipeline.algorithm::<PassThrough>(sink).unwrap().executions(),
        1
    );
}

#[test]
fn modifying_a_node_forces_downstream_reexecution_only() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_node(FunctionSource::new(StructuredExtent::line(0, 99)));
    let mid = pipeline.add_node(PassThrough::new());
    let sink = pipeline.add_node(PassThrough::new());
    pipeline.connect(source, 0, mid, 0).unwrap();
    pipeline.connect(mid, 0, sink, 0).unwrap();

    pipeline
        .set_update_extent(sink, 0, StructuredExtent::line(0, 9))
        .unwrap();
    pipeline.update(sink).unwrap();
    assert_eq!(source_executions(&pipeline, source), 1);

    // Touching the middle node leaves the source's data valid.
    pipeline.touch(mid).unwrap();
    pipeline.update(sink).unwrap();
    assert_eq!(source_executions(&pipeline, source), 1);
    assert_eq!(pipeline.algorithm::<PassThrough>(mid).unwrap().executions(), 2);
    assert_eq!(pipeline.algorithm::<PassThrough>(sink).unwrap().executions(), 2);
}

#[test]
fn failed_execution_keeps_the_previous_output() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_node(FunctionSource::new(StructuredExtent::line(0, 99)));
    let flaky = pipeline.add_node(FlakyFilter::new());
    pipeline.connect(source, 0, flaky, 0).unwrap();

    pipeline
        .set_update_extent(flaky, 0, StructuredExtent::line(0, 9))
        .unwrap();
    pipeline.update(flaky).unwrap();
    let before = pipeline.output_data(flaky, 0).unwrap();

    pipeline
        .modify::<FlakyFilter, _>(flaky, |f| f.fail = true)
        .unwrap();
    let err = pipeline.update(flaky).unwrap_err();
    assert!(matches!(err, PipelineError::ExecutionFailure(_)));

    let after = pipeline.output_data(flaky, 0).unwrap();
    assert!(
        Arc::ptr_eq(&before, &after),
        "failed REQUEST_DATA must not replace the previous output"
    );

    // Clearing the fault recovers on the next update.
    pipeline
        .modify::<FlakyFilter, _>(flaky, |f| f.fail = false)
        .unwrap();
    pipeline.update(flaky).unwrap();
}

#[test]
fn missing_required_connection_fails_at_data_time() {
    let mut pipeline = Pipeline::new();
    let lonely = pipeline.add_node(FlakyFilter::new());
    pipeline
        .set_update_extent(lonely, 0, StructuredExtent::line(0, 9))
        .unwrap();
    let err = pipeline.update(lonely).unwrap_err();
    assert!(matches!(err, PipelineError::MissingConnection { .. }));
}

#[test]
fn a_filter_with_no_metadata_rejects_the_request() {
    // A pass-through with nothing upstream never learns a whole extent, so
    // its request cannot be validated.
    let mut pipeline = Pipeline::new();
    let lonely = pipeline.add_node(PassThrough::new());
    pipeline
        .set_update_extent(lonely, 0, StructuredExtent::line(0, 9))
        .unwrap();
    let err = pipeline.update(lonely).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidExtentRequest(_)));
}

#[test]
fn a_cycle_is_detected_not_looped() {
    let mut pipeline = Pipeline::new();
    let a = pipeline.add_node(PassThrough::new());
    let b = pipeline.add_node(PassThrough::new());
    pipeline.connect(a, 0, b, 0).unwrap();
    pipeline.connect(b, 0, a, 0).unwrap();

    let err = pipeline.update(a).unwrap_err();
    assert!(matches!(err, PipelineError::ReentrantPropagation { .. }));
}

#[test]
fn continue_executing_drives_multiple_passes_in_one_update() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_node(FunctionSource::new(StructuredExtent::line(0, 9)));
    let accumulate = pipeline.add_node(AccumulateFilter::new(3));
    pipeline.connect(source, 0, accumulate, 0).unwrap();

    pipeline
        .set_update_extent(accumulate, 0, StructuredExtent::line(0, 9))
        .unwrap();
    pipeline.update(accumulate).unwrap();

    assert_eq!(
        pipeline
            .algorithm::<AccumulateFilter>(accumulate)
            .unwrap()
            .executions(),
        3
    );
    let data = pipeline.output_data(accumulate, 0).unwrap();
    let field = data.as_any().downcast_ref::<ScalarField>().unwrap();
    // Three passes of x summed.
    assert_eq!(field.value(4, 0, 0), Some(12.0));

    // The completed result is stable.
    pipeline.update(accumulate).unwrap();
    assert_eq!(
        pipeline
            .algorithm::<AccumulateFilter>(accumulate)
            .unwrap()
            .executions(),
        3
    );
}

#[test]
fn extents_roundtrip_through_json() {
    let extent = Extent::Structured(StructuredExtent::new(0, 9, -3, 3, 5, 5));
    let json = serde_json::to_string(&extent).unwrap();
    let back: Extent = serde_json::from_str(&json).unwrap();
    assert_eq!(extent, back);
}
