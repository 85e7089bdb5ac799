//! The data-flow graph: node arena plus edge list.
//!
//! The graph owns every node and every edge exclusively. Edges are purely
//! navigational; neither endpoint holds a reference to the other. Wiring is
//! explicit: the graph builder instantiates nodes and connects them directly,
//! with no process-wide registry.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::PipelineError;
use crate::node::{Algorithm, InputPortSpec, OutputPortSpec};

/// Identifies a node for the lifetime of the graph.
pub type NodeId = Uuid;

/// A (producer port, consumer port) relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from_node: NodeId,
    pub from_port: usize,
    pub to_node: NodeId,
    pub to_port: usize,
}

pub(crate) struct NodeEntry {
    pub algorithm: Box<dyn Algorithm>,
    /// Port specs are immutable after construction; cached here so lookups
    /// do not re-allocate through the trait object.
    pub inputs: Vec<InputPortSpec>,
    pub outputs: Vec<OutputPortSpec>,
}

/// Node arena and edge list.
#[derive(Default)]
pub struct Graph {
    nodes: HashMap<NodeId, NodeEntry>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node<A: Algorithm + 'static>(&mut self, algorithm: A) -> NodeId {
        let id = Uuid::new_v4();
        let inputs = algorithm.input_ports();
        let outputs = algorithm.output_ports();
        self.nodes.insert(
            id,
            NodeEntry {
                algorithm: Box::new(algorithm),
                inputs,
                outputs,
            },
        );
        id
    }

    /// Wires an output port into an input port, validating both endpoints,
    /// the extent kinds, and the required data type. A single-connection
    /// input that is already wired must be disconnected first.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: usize,
        to_node: NodeId,
        to_port: usize,
    ) -> Result<(), PipelineError> {
        let from = self.entry(from_node)?;
        let Some(out_spec) = from.outputs.get(from_port) else {
            return Err(PipelineError::PortOutOfRange {
                node: from_node,
                direction: "output",
                port: from_port,
            });
        };
        let out_spec = out_spec.clone();

        let to = self.entry(to_node)?;
        let Some(in_spec) = to.inputs.get(to_port) else {
            return Err(PipelineError::PortOutOfRange {
                node: to_node,
                direction: "input",
                port: to_port,
            });
        };

        if in_spec.kind != out_spec.kind {
            return Err(PipelineError::ExtentKindMismatch {
                produced: out_spec.kind.name(),
                consumed: in_spec.kind.name(),
            });
        }
        if let Some(required) = in_spec.data_type {
            if required != out_spec.data_type {
                return Err(PipelineError::DataTypeMismatch {
                    produced: out_spec.data_type,
                    required,
                });
            }
        }
        if !in_spec.multiple && !self.upstream_of(to_node, to_port).is_empty() {
            return Err(PipelineError::SlotOccupied {
                node: to_node,
                port: to_port,
            });
        }

        self.edges.push(Edge {
            from_node,
            from_port,
            to_node,
            to_port,
        });
        Ok(())
    }

    /// Removes every edge into the given input port, returning how many were
    /// removed.
    pub fn disconnect_input(&mut self, to_node: NodeId, to_port: usize) -> usize {
        let before = self.edges.len();
        self.edges
            .retain(|e| !(e.to_node == to_node && e.to_port == to_port));
        before - self.edges.len()
    }

    /// Upstream producers feeding an input port, in connection slot order.
    pub fn upstream_of(&self, node: NodeId, input_port: usize) -> Vec<(NodeId, usize)> {
        self.edges
            .iter()
            .filter(|e| e.to_node == node && e.to_port == input_port)
            .map(|e| (e.from_node, e.from_port))
            .collect()
    }

    /// Consumers fed by an output port.
    pub fn downstream_of(&self, node: NodeId, output_port: usize) -> Vec<(NodeId, usize)> {
        self.edges
            .iter()
            .filter(|e| e.from_node == node && e.from_port == output_port)
            .map(|e| (e.to_node, e.to_port))
            .collect()
    }

    pub fn input_specs(&self, node: NodeId) -> Result<&[InputPortSpec], PipelineError> {
        Ok(&self.entry(node)?.inputs)
    }

    pub fn output_specs(&self, node: NodeId) -> Result<&[OutputPortSpec], PipelineError> {
        Ok(&self.entry(node)?.outputs)
    }

    pub fn algorithm(&self, node: NodeId) -> Result<&dyn Algorithm, PipelineError> {
        Ok(self.entry(node)?.algorithm.as_ref())
    }

    pub fn algorithm_mut(&mut self, node: NodeId) -> Result<&mut dyn Algorithm, PipelineError> {
        Ok(self
            .nodes
            .get_mut(&node)
            .ok_or(PipelineError::NodeNotFound(node))?
            .algorithm
            .as_mut())
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn entry(&self, node: NodeId) -> Result<&NodeEntry, PipelineError> {
        self.nodes.get(&node).ok_or(PipelineError::NodeNotFound(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{FunctionSource, PassThrough, PieceSource};
    use crate::extent::StructuredExtent;

    #[test]
    fn connect_validates_endpoints() {
        let mut graph = Graph::new();
        let src = graph.add_node(FunctionSource::new(StructuredExtent::line(0, 9)));
        let sink = graph.add_node(PassThrough::new());

        assert!(matches!(
            graph.connect(src, 1, sink, 0),
            Err(PipelineError::PortOutOfRange { .. })
        ));
        assert!(matches!(
            graph.connect(src, 0, sink, 3),
            Err(PipelineError::PortOutOfRange { .. })
        ));
        graph.connect(src, 0, sink, 0).unwrap();
        assert_eq!(graph.upstream_of(sink, 0), vec![(src, 0)]);
        assert_eq!(graph.downstream_of(src, 0), vec![(sink, 0)]);
    }

    #[test]
    fn single_connection_slots_reject_double_wiring() {
        let mut graph = Graph::new();
        let a = graph.add_node(FunctionSource::new(StructuredExtent::line(0, 9)));
        let b = graph.add_node(FunctionSource::new(StructuredExtent::line(0, 9)));
        let sink = graph.add_node(PassThrough::new());

        graph.connect(a, 0, sink, 0).unwrap();
        assert!(matches!(
            graph.connect(b, 0, sink, 0),
            Err(PipelineError::SlotOccupied { .. })
        ));
        assert_eq!(graph.disconnect_input(sink, 0), 1);
        graph.connect(b, 0, sink, 0).unwrap();
    }

    #[test]
    fn extent_kinds_must_agree_across_an_edge() {
        let mut graph = Graph::new();
        let pieces = graph.add_node(PieceSource::new(4));
        let sink = graph.add_node(PassThrough::new());
        assert!(matches!(
            graph.connect(pieces, 0, sink, 0),
            Err(PipelineError::ExtentKindMismatch { .. })
        ));
    }
}
