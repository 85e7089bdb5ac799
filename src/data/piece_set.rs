//! An unstructured payload: one piece of a partitioned collection.

use std::any::Any;

use crate::data::{DataInformation, DataObject};
use crate::extent::PieceExtent;

pub const PIECE_SET: &str = "piece_set";

#[derive(Debug, Clone)]
pub struct PieceSet {
    info: DataInformation,
    piece: PieceExtent,
    values: Vec<f64>,
}

impl PieceSet {
    pub fn new(piece: PieceExtent, values: Vec<f64>) -> Self {
        PieceSet {
            info: DataInformation::new(piece),
            piece,
            values,
        }
    }

    pub fn piece(&self) -> &PieceExtent {
        &self.piece
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl DataObject for PieceSet {
    fn type_tag(&self) -> &'static str {
        PIECE_SET
    }

    fn information(&self) -> &DataInformation {
        &self.info
    }

    fn information_mut(&mut self) -> &mut DataInformation {
        &mut self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
