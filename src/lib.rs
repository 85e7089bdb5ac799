//! Demand-driven streaming execution pipeline.
//!
//! A data-flow graph of processing nodes ([`Algorithm`]s) connected by typed
//! ports. Nothing computes until a consumer calls [`Pipeline::update`] for a
//! specific sub-region ([`Extent`]) of a node's output; metadata is then
//! negotiated upstream, the minimal necessary region is pulled from each
//! producer, and stale nodes execute leaf-first. A node that already holds a
//! superset of the requested region does not run again, and a bounded
//! per-node cache serves repeated requests (interactive scrubbing) without
//! recomputation.
//!
//! ```no_run
//! use pullgraph::algorithms::{DilateFilter, FunctionSource};
//! use pullgraph::{Pipeline, StructuredExtent};
//!
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.add_node(FunctionSource::new(StructuredExtent::line(0, 99)));
//! let dilate = pipeline.add_node(DilateFilter::new(5));
//! pipeline.connect(source, 0, dilate, 0)?;
//!
//! pipeline.set_update_extent(dilate, 0, StructuredExtent::line(10, 20))?;
//! pipeline.update(dilate)?;
//! let data = pipeline.output_data(dilate, 0).unwrap();
//! # Ok::<(), pullgraph::PipelineError>(())
//! ```

pub mod algorithms;
pub mod data;
pub mod error;
pub mod extent;
pub mod graph;
pub mod info;
pub mod node;
pub mod pipeline;
pub mod util;

pub use data::{DataInformation, DataObject};
pub use error::PipelineError;
pub use extent::{Extent, ExtentKind, PieceExtent, StructuredExtent};
pub use graph::{Edge, Graph, NodeId};
pub use info::{InformationBag, Key, Value};
pub use node::{Algorithm, InputPortSpec, OutputPortSpec, Request, RequestKind};
pub use pipeline::{CacheStats, Pipeline};
