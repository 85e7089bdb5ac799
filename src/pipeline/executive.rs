//! Per-node executive state and the recursive request driver.

use std::sync::Arc;

use log::{debug, error};

use crate::data::DataObject;
use crate::error::PipelineError;
use crate::extent::{Extent, PieceExtent};
use crate::graph::{Graph, NodeId};
use crate::info::{InformationBag, Key};
use crate::node::{Algorithm, Request, RequestKind};
use crate::pipeline::cache::{CacheStats, OutputCache, RequestKey};
use crate::util::timing::ScopedTimer;

/// Pipeline state owned on behalf of one node.
///
/// Validity is tracked with monotonic ticks rather than an explicit state
/// enum: information is current while `info_time >= pipeline_time`, data
/// while `data_time >= pipeline_time` and the held extent still covers the
/// request.
pub(crate) struct Executive {
    /// Tick of the last modification to the node itself (parameters, wiring).
    pub modified_time: u64,
    /// Max of `modified_time` over this node and everything upstream,
    /// refreshed by the information pass.
    pub pipeline_time: u64,
    /// Tick up to which whole-domain metadata is current.
    pub info_time: u64,
    /// Tick up to which output data is current.
    pub data_time: u64,
    /// The node asked to be executed again before its result is complete.
    pub continue_executing: bool,
    pub in_information: bool,
    pub in_propagate: bool,
    pub in_data: bool,
    /// Information bags per (input port, connection slot).
    pub in_info: Vec<Vec<InformationBag>>,
    /// Information bags per output port; the produced data object lives in
    /// the bag under `Key::DataObject`.
    pub out_info: Vec<InformationBag>,
    pub cache: Option<OutputCache>,
}

impl Executive {
    fn new(num_inputs: usize, num_outputs: usize, modified_time: u64) -> Self {
        Executive {
            modified_time,
            pipeline_time: 0,
            info_time: 0,
            data_time: 0,
            continue_executing: false,
            in_information: false,
            in_propagate: false,
            in_data: false,
            in_info: vec![Vec::new(); num_inputs],
            out_info: vec![InformationBag::new(); num_outputs],
            cache: None,
        }
    }
}

/// The pipeline controller: owns the graph, one executive per node, and the
/// monotonic tick counter every timestamp is drawn from.
///
/// Scheduling is single-threaded and recursive; the recursion depth of an
/// `update` equals the longest upstream path from the updated node, so very
/// deep machine-generated graphs bound stack usage accordingly.
#[derive(Default)]
pub struct Pipeline {
    pub(crate) graph: Graph,
    execs: std::collections::HashMap<NodeId, Executive>,
    tick: u64,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Adds a node and creates its executive. The node starts with no ports
    /// wired and no valid information.
    pub fn add_node<A: Algorithm + 'static>(&mut self, algorithm: A) -> NodeId {
        let num_inputs = algorithm.input_ports().len();
        let num_outputs = algorithm.output_ports().len();
        let id = self.graph.add_node(algorithm);
        self.tick += 1;
        self.execs
            .insert(id, Executive::new(num_inputs, num_outputs, self.tick));
        id
    }

    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: usize,
        to_node: NodeId,
        to_port: usize,
    ) -> Result<(), PipelineError> {
        self.graph.connect(from_node, from_port, to_node, to_port)?;
        self.touch(to_node)
    }

    pub fn disconnect_input(
        &mut self,
        to_node: NodeId,
        to_port: usize,
    ) -> Result<usize, PipelineError> {
        let removed = self.graph.disconnect_input(to_node, to_port);
        if removed > 0 {
            let exec = self.exec_mut(to_node)?;
            if let Some(slots) = exec.in_info.get_mut(to_port) {
                slots.clear();
            }
            self.touch(to_node)?;
        }
        Ok(removed)
    }

    /// Marks a node modified, forcing its information and data to be
    /// renegotiated on the next update.
    pub fn touch(&mut self, node: NodeId) -> Result<(), PipelineError> {
        self.tick += 1;
        let tick = self.tick;
        self.exec_mut(node)?.modified_time = tick;
        Ok(())
    }

    /// Read-only access to a node's algorithm as its concrete type.
    pub fn algorithm<A: Algorithm + 'static>(&self, node: NodeId) -> Option<&A> {
        self.graph.algorithm(node).ok()?.as_any().downcast_ref()
    }

    /// Mutates a node's algorithm and marks the node modified.
    pub fn modify<A: Algorithm + 'static, R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut A) -> R,
    ) -> Result<R, PipelineError> {
        let algorithm = self.graph.algorithm_mut(node)?;
        let concrete = algorithm.as_any_mut().downcast_mut::<A>().ok_or_else(|| {
            PipelineError::execution(format!(
                "node {node} is not a {}",
                std::any::type_name::<A>()
            ))
        })?;
        let result = f(concrete);
        self.touch(node)?;
        Ok(result)
    }

    /// Sets the update request on an output port. The extent kind must match
    /// the port's declared kind.
    pub fn set_update_extent(
        &mut self,
        node: NodeId,
        port: usize,
        extent: impl Into<Extent>,
    ) -> Result<(), PipelineError> {
        let extent = extent.into();
        let spec_kind = self
            .graph
            .output_specs(node)?
            .get(port)
            .ok_or(PipelineError::PortOutOfRange {
                node,
                direction: "output",
                port,
            })?
            .kind;
        if extent.kind() != spec_kind {
            return Err(PipelineError::invalid_extent(format!(
                "port {port} on node {node} carries {} extents, request is {}",
                spec_kind.name(),
                extent.kind().name()
            )));
        }
        let out = &mut self.exec_mut(node)?.out_info[port];
        out.set_update_extent(extent);
        out.set_update_initialized(true);
        Ok(())
    }

    /// Piece-triple form of [`set_update_extent`](Self::set_update_extent).
    pub fn set_update_pieces(
        &mut self,
        node: NodeId,
        port: usize,
        piece: i32,
        num_pieces: i32,
        ghost_level: i32,
    ) -> Result<(), PipelineError> {
        self.set_update_extent(node, port, PieceExtent::new(piece, num_pieces, ghost_level))
    }

    /// Brings output port 0 of `node` up to date. See
    /// [`update_port`](Self::update_port).
    pub fn update(&mut self, node: NodeId) -> Result<(), PipelineError> {
        self.update_port(node, 0)
    }

    /// Brings one output port up to date: negotiates information upstream,
    /// propagates the update extent, then executes stale producers
    /// leaf-first. Returns the first failure and leaves already-valid
    /// downstream data untouched.
    pub fn update_port(&mut self, node: NodeId, port: usize) -> Result<(), PipelineError> {
        if self.graph.output_specs(node)?.get(port).is_none() {
            return Err(PipelineError::PortOutOfRange {
                node,
                direction: "output",
                port,
            });
        }
        let _timer = ScopedTimer::debug_lazy(|| format!("update of node {node} port {port}"));
        self.update_information(node)?;
        self.propagate_update_extent(node, port)?;
        self.update_data(node, port)?;
        // A multi-pass node is re-invoked from the same port until it stops
        // asking to continue.
        while self.exec(node)?.continue_executing {
            self.update_data(node, port)?;
        }
        Ok(())
    }

    /// The produced data object on an output port, if any execution has
    /// completed. Consumers get shared read-only access.
    pub fn output_data(&self, node: NodeId, port: usize) -> Option<Arc<dyn DataObject>> {
        self.exec(node)
            .ok()?
            .out_info
            .get(port)?
            .data_object()
            .cloned()
    }

    /// The information bag on an output port.
    pub fn output_information(&self, node: NodeId, port: usize) -> Option<&InformationBag> {
        self.exec(node).ok()?.out_info.get(port)
    }

    /// Installs or resizes the bounded output cache for a node. Resizing
    /// drops all currently cached entries; size 0 removes the cache.
    pub fn set_cache_size(&mut self, node: NodeId, size: usize) -> Result<(), PipelineError> {
        let exec = self.exec_mut(node)?;
        if size == 0 {
            exec.cache = None;
        } else {
            match exec.cache.as_mut() {
                Some(cache) => cache.set_capacity(size),
                None => exec.cache = Some(OutputCache::new(size)),
            }
        }
        Ok(())
    }

    pub fn cache_size(&self, node: NodeId) -> usize {
        self.exec(node)
            .ok()
            .and_then(|e| e.cache.as_ref())
            .map(|c| c.capacity())
            .unwrap_or(0)
    }

    pub fn cache_stats(&self, node: NodeId) -> Option<CacheStats> {
        Some(self.exec(node).ok()?.cache.as_ref()?.stats())
    }

    // ---- request passes ----------------------------------------------------

    /// REQUEST_DATA_OBJECT + REQUEST_INFORMATION, upstream-first. Skipped
    /// entirely while nothing upstream has been modified.
    pub(crate) fn update_information(&mut self, node: NodeId) -> Result<(), PipelineError> {
        {
            let exec = self.exec_mut(node)?;
            if exec.in_information {
                error!("re-entrant REQUEST_INFORMATION on node {node}");
                return Err(PipelineError::ReentrantPropagation {
                    node,
                    pass: "REQUEST_INFORMATION",
                });
            }
            exec.in_information = true;
        }
        let result = self.update_information_inner(node);
        if let Ok(exec) = self.exec_mut(node) {
            exec.in_information = false;
        }
        result
    }

    fn update_information_inner(&mut self, node: NodeId) -> Result<(), PipelineError> {
        let num_inputs = self.graph.input_specs(node)?.len();
        let mut upstream_time = 0;
        for port in 0..num_inputs {
            for (producer, _) in self.graph.upstream_of(node, port) {
                self.update_information(producer)?;
                upstream_time = upstream_time.max(self.exec(producer)?.pipeline_time);
            }
        }

        {
            let exec = self.exec_mut(node)?;
            exec.pipeline_time = exec.modified_time.max(upstream_time);
            if exec.info_time >= exec.pipeline_time {
                return Ok(());
            }
        }

        debug!("REQUEST_INFORMATION on node {node}");
        self.forward_upstream(
            node,
            &[
                Key::WholeExtent,
                Key::MaxPieces,
                Key::SpatialMetadata,
                Key::DataObject,
            ],
        )?;
        self.run_request(node, RequestKind::DataObject, 0)?;
        self.run_request(node, RequestKind::Information, 0)?;
        self.apply_information_defaults(node)?;

        let exec = self.exec_mut(node)?;
        exec.info_time = exec.pipeline_time;
        Ok(())
    }

    /// REQUEST_DATA, post-order: every stale producer executes before the
    /// node itself. Consults the output cache once the request is resolved.
    pub(crate) fn update_data(&mut self, node: NodeId, port: usize) -> Result<(), PipelineError> {
        if !self.need_to_execute_data(node, port)? {
            return Ok(());
        }
        {
            let exec = self.exec_mut(node)?;
            if exec.in_data {
                error!("re-entrant REQUEST_DATA on node {node}");
                return Err(PipelineError::ReentrantPropagation {
                    node,
                    pass: "REQUEST_DATA",
                });
            }
            exec.in_data = true;
        }
        let result = self.update_data_inner(node, port);
        if let Ok(exec) = self.exec_mut(node) {
            exec.in_data = false;
        }
        result
    }

    fn update_data_inner(&mut self, node: NodeId, port: usize) -> Result<(), PipelineError> {
        let pipeline_time = self.exec(node)?.pipeline_time;

        // Cache consult. The request extent has been resolved (narrowed and
        // validated) by the propagation pass; a hit bypasses both this node's
        // execution and the whole upstream subtree.
        let request_extent = self
            .exec(node)?
            .out_info
            .get(port)
            .and_then(|o| o.update_extent());
        if let Some(extent) = request_extent {
            let key = RequestKey::new(port, extent);
            let exec = self.exec_mut(node)?;
            if let Some(cache) = exec.cache.as_mut() {
                if let Some(data) = cache.lookup(&key, pipeline_time) {
                    debug!("cache hit on node {node} for {extent:?}");
                    exec.out_info[port].set_data_object(data);
                    exec.data_time = pipeline_time;
                    exec.continue_executing = false;
                    return Ok(());
                }
            }
        }

        // Execute stale producers first.
        let num_inputs = self.graph.input_specs(node)?.len();
        for input_port in 0..num_inputs {
            let upstream = self.graph.upstream_of(node, input_port);
            if upstream.is_empty() && self.graph.input_specs(node)?[input_port].required {
                error!("node {node} input port {input_port} has no connection");
                return Err(PipelineError::MissingConnection {
                    node,
                    port: input_port,
                });
            }
            for (producer, producer_port) in upstream {
                self.update_data(producer, producer_port)?;
            }
        }

        self.forward_upstream(
            node,
            &[
                Key::DataObject,
                Key::WholeExtent,
                Key::MaxPieces,
                Key::SpatialMetadata,
            ],
        )?;

        self.tick += 1;
        let now = self.tick;
        let (mut inputs, mut outputs) = {
            let exec = self.exec(node)?;
            (exec.in_info.clone(), exec.out_info.clone())
        };
        let mut request = Request::new(RequestKind::Data, port);
        {
            let algorithm = self.graph.algorithm_mut(node)?;
            let name = algorithm.type_name();
            let _timer = ScopedTimer::debug_lazy(|| format!("{name} REQUEST_DATA"));
            algorithm
                .process_request(&mut request, &mut inputs, &mut outputs)
                .map_err(|e| {
                    error!("node {node} ({name}) failed REQUEST_DATA: {e}");
                    e
                })?;
        }

        // Stamp freshly produced objects. An output the node merely passed
        // through keeps its producer's stamp (the arc is shared).
        for bag in outputs.iter_mut() {
            if let Some(mut data) = bag.take_data_object() {
                if let Some(owned) = Arc::get_mut(&mut data) {
                    owned.information_mut().produced_at = now;
                }
                bag.set_data_object(data);
            }
        }

        // A completed structured execution must realize at least the
        // requested extent.
        if !request.continue_executing {
            if let Some(out) = outputs.get(port) {
                if let (Some(Extent::Structured(requested)), Some(data)) =
                    (out.update_extent(), out.data_object())
                {
                    if let Extent::Structured(realized) = data.information().realized {
                        if !realized.contains(&requested) {
                            error!(
                                "node {node} realized {realized:?} but {requested:?} was requested"
                            );
                            return Err(PipelineError::execution(format!(
                                "node {node} produced less than the requested extent"
                            )));
                        }
                    }
                }
            }
        }

        let exec = self.exec_mut(node)?;
        exec.in_info = inputs;
        exec.out_info = outputs;
        exec.data_time = pipeline_time;
        exec.continue_executing = request.continue_executing;

        if !request.continue_executing {
            if let Some(extent) = exec.out_info.get(port).and_then(|o| o.update_extent()) {
                if let (Some(cache), Some(data)) = (
                    exec.cache.as_mut(),
                    exec.out_info.get(port).and_then(|o| o.data_object()).cloned(),
                ) {
                    cache.insert(RequestKey::new(port, extent), data, now);
                }
            }
        }
        Ok(())
    }

    /// Runs one request kind through the node with transient bag copies,
    /// committing them only on success.
    pub(crate) fn run_request(
        &mut self,
        node: NodeId,
        kind: RequestKind,
        port: usize,
    ) -> Result<bool, PipelineError> {
        let (mut inputs, mut outputs) = {
            let exec = self.exec(node)?;
            (exec.in_info.clone(), exec.out_info.clone())
        };
        let mut request = Request::new(kind, port);
        self.graph
            .algorithm_mut(node)?
            .process_request(&mut request, &mut inputs, &mut outputs)?;
        let exec = self.exec_mut(node)?;
        exec.in_info = inputs;
        exec.out_info = outputs;
        Ok(request.continue_executing)
    }

    /// Copies the listed keys from each upstream output bag into the matching
    /// input connection bag, resizing connection slots to the current wiring.
    fn forward_upstream(&mut self, node: NodeId, keys: &[Key]) -> Result<(), PipelineError> {
        let num_inputs = self.graph.input_specs(node)?.len();
        for port in 0..num_inputs {
            let upstream = self.graph.upstream_of(node, port);
            let mut sources = Vec::with_capacity(upstream.len());
            for (producer, producer_port) in &upstream {
                let bag = self
                    .exec(*producer)?
                    .out_info
                    .get(*producer_port)
                    .cloned()
                    .unwrap_or_default();
                sources.push(bag);
            }
            let exec = self.exec_mut(node)?;
            let slots = &mut exec.in_info[port];
            slots.resize_with(sources.len(), InformationBag::new);
            for (slot, source) in sources.iter().enumerate() {
                for &key in keys {
                    slots[slot].copy_entry(source, key);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn exec(&self, node: NodeId) -> Result<&Executive, PipelineError> {
        self.execs
            .get(&node)
            .ok_or(PipelineError::NodeNotFound(node))
    }

    pub(crate) fn exec_mut(&mut self, node: NodeId) -> Result<&mut Executive, PipelineError> {
        self.execs
            .get_mut(&node)
            .ok_or(PipelineError::NodeNotFound(node))
    }
}
