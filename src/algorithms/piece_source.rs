//! An unstructured source producing one piece of a partitioned collection.

use std::any::Any;
use std::sync::Arc;

use crate::data::{PieceSet, PIECE_SET};
use crate::error::PipelineError;
use crate::extent::{Extent, ExtentKind};
use crate::info::InformationBag;
use crate::node::{Algorithm, InputPortSpec, OutputPortSpec, Request};

/// Produces the requested `(piece, num_pieces, ghost_level)` with
/// `values_per_piece` samples, each carrying the piece index.
pub struct PieceSource {
    max_pieces: i64,
    values_per_piece: usize,
    executions: u64,
}

impl PieceSource {
    pub fn new(max_pieces: i64) -> Self {
        PieceSource {
            max_pieces,
            values_per_piece: 8,
            executions: 0,
        }
    }

    pub fn executions(&self) -> u64 {
        self.executions
    }
}

impl Algorithm for PieceSource {
    fn type_name(&self) -> &'static str {
        "PieceSource"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        Vec::new()
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("out", ExtentKind::Pieces, PIECE_SET)]
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
        outputs[0].set_max_pieces(self.max_pieces);
        Ok(())
    }

    fn request_data(
        &mut self,
        _request: &mut Request,
        _inputs: &mut [Vec<InformationBag>],
        outputs: &mut [InformationBag],
    ) -> Result<(), PipelineError> {
        let Some(Extent::Pieces(piece)) = outputs[0].update_extent() else {
            return Err(PipelineError::execution(
                "PieceSource needs a piece request",
            ));
        };
        let values = vec![piece.piece as f64; self.values_per_piece];
        outputs[0].set_data_object(Arc::new(PieceSet::new(piece, values)));
        self.executions += 1;
        Ok(())
    }
}
