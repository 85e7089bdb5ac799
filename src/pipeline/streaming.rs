//! Streaming extension: partial-update semantics on top of the base passes.
//!
//! Adds whole-domain defaulting to the information pass, request validation,
//! the dirty check that decides whether a node must run again, and the
//! upstream propagation of update extents.

use log::{debug, error};

use crate::error::PipelineError;
use crate::extent::{Extent, ExtentKind, PieceExtent};
use crate::graph::NodeId;
use crate::info::InformationBag;
use crate::node::RequestKind;
use crate::pipeline::Pipeline;

impl Pipeline {
    /// Defaults applied after a node fills its output information: a node
    /// that never customizes streaming behaves as "always compute
    /// everything".
    pub(crate) fn apply_information_defaults(&mut self, node: NodeId) -> Result<(), PipelineError> {
        let kinds: Vec<ExtentKind> = self
            .graph
            .output_specs(node)?
            .iter()
            .map(|s| s.kind)
            .collect();
        let exec = self.exec_mut(node)?;
        for (port, kind) in kinds.into_iter().enumerate() {
            let out = &mut exec.out_info[port];
            match kind {
                ExtentKind::Structured => {
                    if !out.update_initialized() {
                        if let Some(whole) = out.whole_extent() {
                            out.set_update_extent(whole);
                        }
                    }
                }
                ExtentKind::Pieces => {
                    if out.max_pieces().is_none() {
                        out.set_max_pieces(-1);
                    }
                    if !out.update_initialized() {
                        out.set_update_extent(PieceExtent::whole());
                    }
                }
            }
        }
        Ok(())
    }

    /// Validates that the request on an output port is well-formed for the
    /// port's extent kind. Violations are logged and returned as
    /// `InvalidExtentRequest`; propagation stops at this port while sibling
    /// ports are unaffected.
    pub(crate) fn verify_output_information(
        &self,
        node: NodeId,
        port: usize,
    ) -> Result<(), PipelineError> {
        let spec =
            self.graph
                .output_specs(node)?
                .get(port)
                .ok_or(PipelineError::PortOutOfRange {
                    node,
                    direction: "output",
                    port,
                })?;
        let out = &self.exec(node)?.out_info[port];
        match spec.kind {
            ExtentKind::Structured => {
                let Some(Extent::Structured(whole)) = out.whole_extent() else {
                    error!("no whole extent set on output port {port} of node {node}");
                    return Err(PipelineError::invalid_extent(format!(
                        "no whole extent on output port {port} of node {node}"
                    )));
                };
                let Some(Extent::Structured(update)) = out.update_extent() else {
                    error!("no update extent set on output port {port} of node {node}");
                    return Err(PipelineError::invalid_extent(format!(
                        "no update extent on output port {port} of node {node}"
                    )));
                };
                if !update.is_empty() && !whole.contains(&update) {
                    error!(
                        "update extent {update:?} on node {node} is outside the whole extent {whole:?}"
                    );
                    return Err(PipelineError::invalid_extent(format!(
                        "requested {update:?} lies outside the whole extent {whole:?}"
                    )));
                }
            }
            ExtentKind::Pieces => {
                if out.max_pieces().is_none() {
                    error!("no maximum piece count set on output port {port} of node {node}");
                    return Err(PipelineError::invalid_extent(format!(
                        "no maximum piece count on output port {port} of node {node}"
                    )));
                }
                let Some(Extent::Pieces(request)) = out.update_extent() else {
                    error!("no piece request set on output port {port} of node {node}");
                    return Err(PipelineError::invalid_extent(format!(
                        "no piece request on output port {port} of node {node}"
                    )));
                };
                if request.piece < 0
                    || request.num_pieces < 1
                    || request.piece >= request.num_pieces
                {
                    error!("malformed piece request {request:?} on node {node}");
                    return Err(PipelineError::invalid_extent(format!(
                        "piece {} of {} is not a valid request",
                        request.piece, request.num_pieces
                    )));
                }
            }
        }
        Ok(())
    }

    /// The dirty check: whether satisfying the current request on an output
    /// port requires running the node.
    ///
    /// A node that already holds a superset of the requested region must not
    /// re-execute; that is what lets a small request be served from a larger
    /// earlier computation with no extra bookkeeping.
    pub(crate) fn need_to_execute_data(
        &self,
        node: NodeId,
        port: usize,
    ) -> Result<bool, PipelineError> {
        let exec = self.exec(node)?;
        if exec.continue_executing {
            return Ok(true);
        }
        let Some(out) = exec.out_info.get(port) else {
            return Ok(true);
        };
        let Some(data) = out.data_object() else {
            return Ok(true);
        };
        if exec.data_time < exec.pipeline_time {
            return Ok(true);
        }
        match out.update_extent() {
            Some(Extent::Structured(requested)) => {
                if requested.is_empty() {
                    return Ok(false);
                }
                match data.information().realized {
                    Extent::Structured(held) => Ok(!held.contains(&requested)),
                    Extent::Pieces(_) => Ok(true),
                }
            }
            Some(Extent::Pieces(requested)) => match data.information().realized {
                Extent::Pieces(held) => Ok(held.num_pieces != requested.num_pieces
                    || held.ghost_level < requested.ghost_level
                    || (requested.num_pieces != 1 && held.piece != requested.piece)),
                Extent::Structured(_) => Ok(true),
            },
            None => Ok(false),
        }
    }

    /// REQUEST_UPDATE_EXTENT, downstream to upstream: validate the request,
    /// let the node narrow or translate it per input connection, hand each
    /// input's request to its producer, and recurse. Short-circuits when the
    /// held data already satisfies the request.
    pub(crate) fn propagate_update_extent(
        &mut self,
        node: NodeId,
        port: usize,
    ) -> Result<(), PipelineError> {
        {
            let exec = self.exec_mut(node)?;
            if exec.in_propagate {
                error!("re-entrant REQUEST_UPDATE_EXTENT on node {node}");
                return Err(PipelineError::ReentrantPropagation {
                    node,
                    pass: "REQUEST_UPDATE_EXTENT",
                });
            }
            exec.in_propagate = true;
        }
        let result = self.propagate_update_extent_inner(node, port);
        if let Ok(exec) = self.exec_mut(node) {
            exec.in_propagate = false;
        }
        result
    }

    fn propagate_update_extent_inner(
        &mut self,
        node: NodeId,
        port: usize,
    ) -> Result<(), PipelineError> {
        self.verify_output_information(node, port)?;
        if !self.need_to_execute_data(node, port)? {
            debug!("node {node} already holds the requested region; propagation stops");
            return Ok(());
        }

        self.run_request(node, RequestKind::UpdateExtent, port)?;

        let num_inputs = self.graph.input_specs(node)?.len();
        for input_port in 0..num_inputs {
            let upstream = self.graph.upstream_of(node, input_port);
            for (slot, (producer, producer_port)) in upstream.into_iter().enumerate() {
                let request = self
                    .exec(node)?
                    .in_info
                    .get(input_port)
                    .and_then(|slots| slots.get(slot))
                    .and_then(|bag| bag.update_extent());
                let Some(request) = request else { continue };
                {
                    let producer_exec = self.exec_mut(producer)?;
                    if let Some(out) = producer_exec.out_info.get_mut(producer_port) {
                        out.set_update_extent(request);
                        out.set_update_initialized(true);
                    }
                }
                self.propagate_update_extent(producer, producer_port)?;
            }
        }
        Ok(())
    }
}

/// Translates a downstream request onto an input connection whose producer
/// may use the other extent kind. Same-kind requests pass through verbatim;
/// a structured request on a piece-producing input asks for the whole single
/// piece, and a piece request on a structured input maps to the matching
/// z-axis slab of the producer's whole extent.
pub(crate) fn translate_request(
    requested: &Extent,
    input_kind: ExtentKind,
    input_bag: &InformationBag,
) -> Option<Extent> {
    match (requested, input_kind) {
        (Extent::Structured(e), ExtentKind::Structured) => Some(Extent::Structured(*e)),
        (Extent::Pieces(p), ExtentKind::Pieces) => Some(Extent::Pieces(*p)),
        (Extent::Structured(_), ExtentKind::Pieces) => Some(Extent::Pieces(PieceExtent::whole())),
        (Extent::Pieces(p), ExtentKind::Structured) => {
            let whole = input_bag.whole_extent()?;
            let whole = *whole.as_structured()?;
            Some(Extent::Structured(whole.piece_slab(
                p.piece,
                p.num_pieces,
                p.ghost_level,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::StructuredExtent;

    #[test]
    fn same_kind_requests_pass_through() {
        let bag = InformationBag::new();
        let requested = Extent::Structured(StructuredExtent::line(3, 7));
        assert_eq!(
            translate_request(&requested, ExtentKind::Structured, &bag),
            Some(requested)
        );
    }

    #[test]
    fn structured_request_on_piece_input_asks_for_everything() {
        let bag = InformationBag::new();
        let requested = Extent::Structured(StructuredExtent::line(3, 7));
        assert_eq!(
            translate_request(&requested, ExtentKind::Pieces, &bag),
            Some(Extent::Pieces(PieceExtent::whole()))
        );
    }

    #[test]
    fn piece_request_on_structured_input_maps_to_a_slab() {
        let mut bag = InformationBag::new();
        bag.set_whole_extent(StructuredExtent::new(0, 9, 0, 9, 0, 9));
        let requested = Extent::Pieces(PieceExtent::new(0, 2, 0));
        assert_eq!(
            translate_request(&requested, ExtentKind::Structured, &bag),
            Some(Extent::Structured(StructuredExtent::new(0, 9, 0, 9, 0, 4)))
        );
        // Without a known whole extent the translation is impossible.
        assert_eq!(
            translate_request(&requested, ExtentKind::Structured, &InformationBag::new()),
            None
        );
    }
}
