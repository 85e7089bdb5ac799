//! The `Algorithm` trait: the single entry point a processing node exposes to
//! the pipeline, plus the declarative port metadata it registers at
//! construction.

use std::any::Any;

use serde::Serialize;

use crate::error::PipelineError;
use crate::extent::ExtentKind;
use crate::info::{InformationBag, Key};

/// The four request kinds an executive sends through `process_request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Ensure an output data object of the right concrete kind exists.
    DataObject,
    /// Compute and propagate whole-domain metadata.
    Information,
    /// Tell each upstream connection the minimal region needed to satisfy
    /// the current downstream request.
    UpdateExtent,
    /// Execute. The only kind allowed to produce or replace output data.
    Data,
}

/// A transient request descriptor traveling along an edge. Discarded after
/// the pass completes.
#[derive(Debug)]
pub struct Request {
    pub kind: RequestKind,
    /// The output port the request was made from.
    pub from_output_port: usize,
    /// Set by a multi-pass node during `Data` to ask to be executed again
    /// before its result is considered complete.
    pub continue_executing: bool,
}

impl Request {
    pub fn new(kind: RequestKind, from_output_port: usize) -> Self {
        Request {
            kind,
            from_output_port,
            continue_executing: false,
        }
    }
}

/// Immutable input port metadata, registered once at construction.
#[derive(Debug, Clone, Serialize)]
pub struct InputPortSpec {
    pub name: &'static str,
    pub kind: ExtentKind,
    /// Required concrete data kind; `None` accepts any.
    pub data_type: Option<&'static str>,
    /// A required port with no connection fails execution with
    /// `MissingConnection`.
    pub required: bool,
    /// Whether the port accepts more than one connection.
    pub multiple: bool,
}

impl InputPortSpec {
    pub fn required(name: &'static str, kind: ExtentKind, data_type: &'static str) -> Self {
        InputPortSpec {
            name,
            kind,
            data_type: Some(data_type),
            required: true,
            multiple: false,
        }
    }

    pub fn optional(name: &'static str, kind: ExtentKind, data_type: &'static str) -> Self {
        InputPortSpec {
            data_type: Some(data_type),
            required: false,
            ..InputPortSpec::required(name, kind, data_type)
        }
    }

    pub fn repeatable(name: &'static str, kind: ExtentKind, data_type: &'static str) -> Self {
        InputPortSpec {
            multiple: true,
            ..InputPortSpec::required(name, kind, data_type)
        }
    }
}

/// Immutable output port metadata.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPortSpec {
    pub name: &'static str,
    pub kind: ExtentKind,
    pub data_type: &'static str,
}

impl OutputPortSpec {
    pub fn new(name: &'static str, kind: ExtentKind, data_type: &'static str) -> Self {
        OutputPortSpec {
            name,
            kind,
            data_type,
        }
    }
}

/// A pure processing unit with N input and M output ports.
///
/// An algorithm holds no pipeline-wide state; everything it knows about the
/// graph arrives through the information bags. `process_request` must be
/// idempotent for `Information` and `UpdateExtent` and may mutate output
/// data only for `Data`.
///
/// `inputs` is indexed `[port][connection slot]`; `outputs` is indexed
/// `[port]`. Both are transient working copies: the executive commits them
/// back only when the request succeeds, so a failing `Data` request leaves
/// the previously valid output observable.
pub trait Algorithm: Send {
    fn type_name(&self) -> &'static str;

    fn input_ports(&self) -> Vec<InputPortSpec>;

    fn output_ports(&self) -> Vec<OutputPortSpec>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn process_request(
        &mut self,
        request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        match request.kind {
            RequestKind::DataObject => self.request_data_object(request, inputs, outputs),
            RequestKind::Information => self.request_information(request, inputs, outputs),
            RequestKind::UpdateExtent => self.request_update_extent(request, inputs, outputs),
            RequestKind::Data => self.request_data(request, inputs, outputs),
        }
    }

    /// Pre-create an output data object. Most algorithms produce their
    /// object during `Data` instead, so the default is a no-op.
    fn request_data_object(
        &mut self,
        _request: &mut Request,
        _inputs: &mut [Vec<InformationBag>],
        _outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Establish whole-domain metadata on the outputs.
    ///
    /// The default forwards the first input connection's whole extent,
    /// maximum piece count, and spatial metadata to every output, which is
    /// right for any filter that does not change the domain. Sources must
    /// override this and set their own whole extent.
    fn request_information(
        &mut self,
        _request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        if let Some(first) = inputs.first().and_then(|conns| conns.first()) {
            let src = first.clone();
            for out in outputs.iter_mut() {
                out.copy_entry(&src, Key::WholeExtent);
                out.copy_entry(&src, Key::MaxPieces);
                out.copy_entry(&src, Key::SpatialMetadata);
            }
        }
        Ok(())
    }

    /// Narrow or translate the downstream request per input connection.
    ///
    /// The default copies the requesting output port's update extent to
    /// every input connection verbatim, translating across extent kinds
    /// where producer and consumer disagree. Filters that need padding or
    /// other reshaping override this.
    fn request_update_extent(
        &mut self,
        request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        let port = request.from_output_port.min(outputs.len().saturating_sub(1));
        let Some(requested) = outputs.get(port).and_then(|o| o.update_extent()) else {
            return Ok(());
        };
        let specs = self.input_ports();
        for (p, conns) in inputs.iter_mut().enumerate() {
            let Some(spec) = specs.get(p) else { continue };
            for bag in conns.iter_mut() {
                if let Some(translated) =
                    crate::pipeline::streaming::translate_request(&requested, spec.kind, bag)
                {
                    bag.set_update_extent(translated);
                    bag.set_update_initialized(true);
                }
            }
        }
        Ok(())
    }

    /// Execute. Must fully populate output data objects (with their realized
    /// extents set) or fail before touching them.
    fn request_data(
        &mut self,
        request: &mut Request,
        inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError>;
}
